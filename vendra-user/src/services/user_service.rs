use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::schema::users;
use vendra_shared::types::auth::AuthUser;

use crate::models::{NewUser, User};
use crate::services::deletion_service;

/// Returns the caller's row, creating it from token claims on first sign-in.
/// Later sign-ins do not overwrite profile edits. Accounts removed by an approved
/// deletion are not brought back by a token that is still valid.
pub fn upsert_from_claims(conn: &mut PgConnection, user: &AuthUser) -> AppResult<User> {
    if let Some(existing) = users::table
        .find(user.id)
        .select(User::as_select())
        .first(conn)
        .optional()?
    {
        return Ok(existing);
    }

    if deletion_service::account_was_deleted(conn, user.id)? {
        return Err(AppError::new(ErrorCode::AccountDeleted, "this account has been deleted"));
    }

    let inserted = diesel::insert_into(users::table)
        .values(&NewUser {
            id: user.id,
            name: user.name.as_deref(),
            email: user.email.as_deref(),
            role: user.role.as_str(),
        })
        .on_conflict(users::id)
        .do_nothing()
        .execute(conn)?;

    if inserted > 0 {
        tracing::info!(user_id = %user.id, role = %user.role, "user row created from token claims");
    }

    find_user(conn, user.id)
}

pub fn find_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<User> {
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))
}
