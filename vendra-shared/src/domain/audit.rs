use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::schema::admin_actions;

#[derive(Debug, Queryable, Selectable, Serialize, Clone)]
#[diesel(table_name = admin_actions)]
pub struct AdminAction {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub action: String,
    pub target_user_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = admin_actions)]
struct NewAdminAction<'a> {
    id: Uuid,
    admin_id: Uuid,
    action: &'a str,
    target_user_id: Option<Uuid>,
    details: Option<serde_json::Value>,
}

/// Appends an entry to the admin audit log. Call inside the mutation's transaction.
pub fn record_admin_action(
    conn: &mut PgConnection,
    admin_id: Uuid,
    action: &str,
    target_user_id: Option<Uuid>,
    details: serde_json::Value,
) -> AppResult<()> {
    diesel::insert_into(admin_actions::table)
        .values(&NewAdminAction {
            id: Uuid::now_v7(),
            admin_id,
            action,
            target_user_id,
            details: Some(details),
        })
        .execute(conn)?;

    tracing::info!(admin_id = %admin_id, action = %action, target = ?target_user_id, "admin action recorded");
    Ok(())
}
