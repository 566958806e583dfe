//! Seller application states and the listing-eligibility gate.
//!
//! ```text
//! draft --submit--> submitted --approve--> approved
//!                   submitted --reject---> rejected
//!                   submitted --request_info--> needs_more_info --submit--> submitted
//! ```

use chrono::{DateTime, Duration, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::schema::{seller_applications, users};
use crate::types::auth::{AuthUser, UserRole};

/// How long a freshly filed application counts towards eligibility regardless of status.
pub const RECENT_APPLICATION_GRACE_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    NeedsMoreInfo,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::NeedsMoreInfo => "needs_more_info",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Whether the applicant may still edit fields and documents.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::NeedsMoreInfo)
    }

    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (Submitted, NeedsMoreInfo)
                | (NeedsMoreInfo, Submitted)
        )
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "needs_more_info" => Ok(Self::NeedsMoreInfo),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("unknown application status: {s}")),
        }
    }
}

/// Seller category picked on the application form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleChoice {
    VendedorParticular,
    AgenteInmobiliario,
    EmpresaConstructora,
}

impl RoleChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VendedorParticular => "vendedor_particular",
            Self::AgenteInmobiliario => "agente_inmobiliario",
            Self::EmpresaConstructora => "empresa_constructora",
        }
    }

    /// Account role granted on submission.
    pub fn granted_role(&self) -> UserRole {
        match self {
            Self::VendedorParticular => UserRole::Vendedor,
            Self::AgenteInmobiliario => UserRole::Agente,
            Self::EmpresaConstructora => UserRole::EmpresaConstructora,
        }
    }

    pub fn requires_company(&self) -> bool {
        matches!(self, Self::EmpresaConstructora)
    }
}

impl std::str::FromStr for RoleChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vendedor_particular" => Ok(Self::VendedorParticular),
            "agente_inmobiliario" => Ok(Self::AgenteInmobiliario),
            "empresa_constructora" => Ok(Self::EmpresaConstructora),
            _ => Err(format!("unknown role choice: {s}")),
        }
    }
}

/// Role after submitting with `choice`. Only buyers are promoted; sellers
/// and admins keep what they have.
pub fn promoted_role(current: UserRole, choice: RoleChoice) -> Option<UserRole> {
    (current == UserRole::Comprador).then(|| choice.granted_role())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityReason {
    Admin,
    Approved,
    Submitted,
    RecentApplication,
    NoApplication,
    ApplicationPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub reason: EligibilityReason,
}

/// The slice of an application row the gate looks at.
#[derive(Debug, Clone, Copy)]
pub struct ApplicationSnapshot {
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

pub fn evaluate_eligibility(
    role: UserRole,
    applications: &[ApplicationSnapshot],
    now: DateTime<Utc>,
) -> Eligibility {
    let verdict = |eligible, reason| Eligibility { eligible, reason };

    if role == UserRole::Admin {
        return verdict(true, EligibilityReason::Admin);
    }
    if applications.iter().any(|a| a.status == ApplicationStatus::Approved) {
        return verdict(true, EligibilityReason::Approved);
    }
    if applications.iter().any(|a| a.status == ApplicationStatus::Submitted) {
        return verdict(true, EligibilityReason::Submitted);
    }

    let grace = Duration::minutes(RECENT_APPLICATION_GRACE_MINUTES);
    let recent = applications.iter().any(|a| {
        !matches!(a.status, ApplicationStatus::Draft | ApplicationStatus::Rejected)
            && now.signed_duration_since(a.created_at) <= grace
    });
    if recent {
        return verdict(true, EligibilityReason::RecentApplication);
    }

    if applications.is_empty() {
        verdict(false, EligibilityReason::NoApplication)
    } else {
        verdict(false, EligibilityReason::ApplicationPending)
    }
}

/// Loads the caller's applications and runs [`evaluate_eligibility`].
pub fn check_listing_eligibility(
    conn: &mut PgConnection,
    user_id: Uuid,
    role: UserRole,
) -> AppResult<Eligibility> {
    let rows: Vec<(String, DateTime<Utc>)> = seller_applications::table
        .filter(seller_applications::user_id.eq(user_id))
        .select((seller_applications::status, seller_applications::created_at))
        .load(conn)?;

    let snapshots: Vec<ApplicationSnapshot> = rows
        .into_iter()
        .filter_map(|(status, created_at)| {
            status
                .parse()
                .ok()
                .map(|status| ApplicationSnapshot { status, created_at })
        })
        .collect();

    Ok(evaluate_eligibility(role, &snapshots, Utc::now()))
}

fn resolve_role(claimed: UserRole, stored: Option<&str>) -> UserRole {
    if claimed == UserRole::Admin {
        return UserRole::Admin;
    }
    stored.and_then(|r| r.parse().ok()).unwrap_or(claimed)
}

/// The caller's role as stored, which can be ahead of the token after a promotion.
/// An admin claim always wins.
pub fn effective_role(conn: &mut PgConnection, user: &AuthUser) -> AppResult<UserRole> {
    if user.is_admin() {
        return Ok(UserRole::Admin);
    }
    let stored: Option<String> = users::table
        .find(user.id)
        .select(users::role)
        .first(conn)
        .optional()?;
    Ok(resolve_role(user.role, stored.as_deref()))
}

/// The listing gate for `user`, evaluated against the stored role. Both the
/// eligibility endpoint and listing creation answer through this.
pub fn eligibility_for(conn: &mut PgConnection, user: &AuthUser) -> AppResult<(UserRole, Eligibility)> {
    let role = effective_role(conn, user)?;
    let eligibility = check_listing_eligibility(conn, user.id, role)?;
    Ok((role, eligibility))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn stored_role_overrides_stale_token() {
        assert_eq!(resolve_role(UserRole::Comprador, Some("vendedor")), UserRole::Vendedor);
        assert_eq!(resolve_role(UserRole::Comprador, None), UserRole::Comprador);
        assert_eq!(resolve_role(UserRole::Agente, Some("not-a-role")), UserRole::Agente);
        assert_eq!(resolve_role(UserRole::Admin, Some("comprador")), UserRole::Admin);
    }

    const ALL: [ApplicationStatus; 5] = [Draft, Submitted, NeedsMoreInfo, Approved, Rejected];

    fn snap(status: ApplicationStatus, minutes_ago: i64, now: DateTime<Utc>) -> ApplicationSnapshot {
        ApplicationSnapshot {
            status,
            created_at: now - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn only_graph_edges_are_allowed() {
        let allowed = [
            (Draft, Submitted),
            (Submitted, Approved),
            (Submitted, Rejected),
            (Submitted, NeedsMoreInfo),
            (NeedsMoreInfo, Submitted),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for to in ALL {
            assert!(!Approved.can_transition_to(to));
            assert!(!Rejected.can_transition_to(to));
        }
    }

    #[test]
    fn status_strings_round_trip() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<ApplicationStatus>().unwrap(), status);
        }
    }

    #[test]
    fn vendedor_particular_promotes_buyer_to_vendedor() {
        let choice: RoleChoice = "vendedor_particular".parse().unwrap();
        assert_eq!(promoted_role(UserRole::Comprador, choice), Some(UserRole::Vendedor));
    }

    #[test]
    fn existing_sellers_and_admins_are_not_promoted() {
        assert_eq!(promoted_role(UserRole::Agente, RoleChoice::EmpresaConstructora), None);
        assert_eq!(promoted_role(UserRole::Admin, RoleChoice::VendedorParticular), None);
    }

    #[test]
    fn approved_or_submitted_is_eligible() {
        let now = Utc::now();
        let e = evaluate_eligibility(UserRole::Comprador, &[snap(Approved, 60 * 24 * 90, now)], now);
        assert_eq!(e, Eligibility { eligible: true, reason: EligibilityReason::Approved });

        let e = evaluate_eligibility(UserRole::Comprador, &[snap(Rejected, 500, now), snap(Submitted, 300, now)], now);
        assert_eq!(e.reason, EligibilityReason::Submitted);
    }

    #[test]
    fn recent_non_draft_application_is_eligible_within_grace() {
        let now = Utc::now();
        let e = evaluate_eligibility(UserRole::Comprador, &[snap(NeedsMoreInfo, 3, now)], now);
        assert_eq!(e.reason, EligibilityReason::RecentApplication);

        let e = evaluate_eligibility(UserRole::Comprador, &[snap(NeedsMoreInfo, 11, now)], now);
        assert_eq!(e, Eligibility { eligible: false, reason: EligibilityReason::ApplicationPending });
    }

    #[test]
    fn drafts_and_rejections_never_count() {
        let now = Utc::now();
        let e = evaluate_eligibility(UserRole::Comprador, &[snap(Draft, 1, now), snap(Rejected, 2, now)], now);
        assert!(!e.eligible);
    }

    #[test]
    fn no_application_redirects_to_form() {
        let e = evaluate_eligibility(UserRole::Vendedor, &[], Utc::now());
        assert_eq!(e.reason, EligibilityReason::NoApplication);
        assert!(!e.eligible);
    }

    #[test]
    fn admins_bypass_the_gate() {
        assert!(evaluate_eligibility(UserRole::Admin, &[], Utc::now()).eligible);
    }
}
