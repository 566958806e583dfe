//! Who may create and change listings.

use diesel::pg::PgConnection;
use uuid::Uuid;

use vendra_shared::domain::seller;
use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::types::auth::{AuthUser, UserRole};

pub fn require_listing_eligibility(conn: &mut PgConnection, user: &AuthUser) -> AppResult<UserRole> {
    let (role, eligibility) = seller::eligibility_for(conn, user)?;
    if !eligibility.eligible {
        return Err(AppError::with_details(
            ErrorCode::SellerApplicationRequired,
            "complete your seller application before publishing",
            serde_json::json!({ "reason": eligibility.reason }),
        ));
    }
    Ok(role)
}

pub fn require_project_role(role: UserRole) -> AppResult<()> {
    match role {
        UserRole::EmpresaConstructora | UserRole::Admin => Ok(()),
        _ => Err(AppError::new(
            ErrorCode::ProjectRoleRequired,
            "only construction companies can publish projects",
        )),
    }
}

pub fn ensure_owner(owner_id: Uuid, user: &AuthUser) -> AppResult<()> {
    if owner_id == user.id {
        return Ok(());
    }
    Err(AppError::new(ErrorCode::NotListingOwner, "you do not own this listing"))
}

pub fn ensure_owner_or_admin(owner_id: Uuid, user: &AuthUser) -> AppResult<()> {
    if user.is_admin() {
        return Ok(());
    }
    ensure_owner(owner_id, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: UserRole) -> AuthUser {
        AuthUser { id: Uuid::now_v7(), role, email: None, name: None }
    }

    #[test]
    fn projects_need_constructora_or_admin() {
        assert!(require_project_role(UserRole::EmpresaConstructora).is_ok());
        assert!(require_project_role(UserRole::Admin).is_ok());
        let err = require_project_role(UserRole::Agente).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProjectRoleRequired);
    }

    #[test]
    fn admins_may_remove_any_listing_but_not_edit_it() {
        let admin = caller(UserRole::Admin);
        let owner = Uuid::now_v7();
        assert!(ensure_owner_or_admin(owner, &admin).is_ok());
        assert_eq!(ensure_owner(owner, &admin).unwrap_err().code(), ErrorCode::NotListingOwner);
    }

    #[test]
    fn owners_pass_both_checks() {
        let me = caller(UserRole::Vendedor);
        assert!(ensure_owner(me.id, &me).is_ok());
        assert!(ensure_owner_or_admin(me.id, &me).is_ok());
    }
}
