//! Report lifecycle.
//!
//! ```text
//! pending ──> reviewing ──> resolved
//!    │            │
//!    └────────────┴──────> dismissed
//! ```
//!
//! `resolved` and `dismissed` are terminal: every later update is rejected, which makes
//! terminality idempotent from the caller's point of view.

use serde::{Deserialize, Serialize};

use vendra_shared::errors::{AppError, AppResult, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewing,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewing => "reviewing",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Resolved | ReportStatus::Dismissed)
    }

    pub fn can_transition_to(&self, to: ReportStatus) -> bool {
        matches!(
            (self, to),
            (ReportStatus::Pending, ReportStatus::Reviewing)
                | (ReportStatus::Pending, ReportStatus::Dismissed)
                | (ReportStatus::Reviewing, ReportStatus::Resolved)
                | (ReportStatus::Reviewing, ReportStatus::Dismissed)
        )
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "reviewing" => Ok(ReportStatus::Reviewing),
            "resolved" => Ok(ReportStatus::Resolved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            _ => Err(format!("unknown report status: {s}")),
        }
    }
}

/// What an admin update does to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Same status requested: only the notes change.
    NotesOnly,
    Transition(ReportStatus),
}

fn already_reviewed(status: ReportStatus) -> AppError {
    AppError::with_details(
        ErrorCode::ReportAlreadyReviewed,
        format!("report is already {status}"),
        serde_json::json!({ "status": status.as_str() }),
    )
}

pub fn plan_update(from: ReportStatus, to: ReportStatus) -> AppResult<UpdatePlan> {
    if from.is_terminal() {
        return Err(already_reviewed(from));
    }
    if from == to {
        return Ok(UpdatePlan::NotesOnly);
    }
    if from.can_transition_to(to) {
        return Ok(UpdatePlan::Transition(to));
    }
    Err(AppError::with_details(
        ErrorCode::InvalidReportTransition,
        format!("cannot move report from {from} to {to}"),
        serde_json::json!({ "from": from.as_str(), "to": to.as_str() }),
    ))
}

/// "Assign to me": pending reports move to reviewing, reviewing ones change owner.
pub fn plan_assign(from: ReportStatus) -> AppResult<ReportStatus> {
    match from {
        ReportStatus::Pending | ReportStatus::Reviewing => Ok(ReportStatus::Reviewing),
        terminal => Err(already_reviewed(terminal)),
    }
}

pub fn conflict() -> AppError {
    AppError::new(
        ErrorCode::ReportConflict,
        "report was changed by someone else, reload and try again",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ReportStatus; 4] = [
        ReportStatus::Pending,
        ReportStatus::Reviewing,
        ReportStatus::Resolved,
        ReportStatus::Dismissed,
    ];

    #[test]
    fn status_round_trips_through_str() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), status);
        }
        assert!("closed".parse::<ReportStatus>().is_err());
    }

    #[test]
    fn only_graph_edges_are_allowed() {
        use ReportStatus::*;
        let allowed = [(Pending, Reviewing), (Pending, Dismissed), (Reviewing, Resolved), (Reviewing, Dismissed)];
        for from in ALL {
            for to in ALL {
                assert_eq!(from.can_transition_to(to), allowed.contains(&(from, to)), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn terminal_reports_never_move_again() {
        for from in [ReportStatus::Resolved, ReportStatus::Dismissed] {
            for to in ALL {
                let err = plan_update(from, to).unwrap_err();
                assert_eq!(err.code(), ErrorCode::ReportAlreadyReviewed);
            }
            assert_eq!(plan_assign(from).unwrap_err().code(), ErrorCode::ReportAlreadyReviewed);
        }
    }

    #[test]
    fn dismiss_then_resolve_is_rejected() {
        assert_eq!(
            plan_update(ReportStatus::Pending, ReportStatus::Dismissed).unwrap(),
            UpdatePlan::Transition(ReportStatus::Dismissed)
        );
        let err = plan_update(ReportStatus::Dismissed, ReportStatus::Resolved).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ReportAlreadyReviewed);
        assert_eq!(err.code().status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[test]
    fn pending_cannot_skip_to_resolved() {
        let err = plan_update(ReportStatus::Pending, ReportStatus::Resolved).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidReportTransition);
    }

    #[test]
    fn same_status_only_touches_notes() {
        assert_eq!(plan_update(ReportStatus::Pending, ReportStatus::Pending).unwrap(), UpdatePlan::NotesOnly);
        assert_eq!(plan_update(ReportStatus::Reviewing, ReportStatus::Reviewing).unwrap(), UpdatePlan::NotesOnly);
    }

    #[test]
    fn assign_moves_pending_to_reviewing() {
        assert_eq!(plan_assign(ReportStatus::Pending).unwrap(), ReportStatus::Reviewing);
        assert_eq!(plan_assign(ReportStatus::Reviewing).unwrap(), ReportStatus::Reviewing);
    }
}
