//! Account removal: grace period scheduling and the approval cascade.

use chrono::{DateTime, Duration, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::schema::{
    conversations, deletion_requests, favorites, messages, projects, properties, push_subscriptions,
    reviews, seller_applications, user_blocks, users,
};

use crate::models::{DeletionRequest, NewDeletionRequest};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_REJECTED: &str = "rejected";
pub const STATUS_COMPLETED: &str = "completed";

pub fn scheduled_completion(now: DateTime<Utc>, grace_days: i64) -> DateTime<Utc> {
    now + Duration::days(grace_days)
}

pub fn ensure_pending(status: &str) -> AppResult<()> {
    if status == STATUS_PENDING {
        return Ok(());
    }
    Err(AppError::with_details(
        ErrorCode::DeletionRequestNotPending,
        format!("deletion request is already {status}"),
        serde_json::json!({ "status": status }),
    ))
}

/// Schedules removal of `user_id` after the grace period. A pending request is
/// returned unchanged; the flag tells whether a new one was created.
pub fn schedule_deletion(
    conn: &mut PgConnection,
    user_id: Uuid,
    reason: Option<&str>,
    grace_days: i64,
    now: DateTime<Utc>,
) -> AppResult<(DeletionRequest, bool)> {
    conn.transaction::<_, AppError, _>(|conn| {
        let existing = deletion_requests::table
            .filter(deletion_requests::user_id.eq(user_id))
            .filter(deletion_requests::status.eq(STATUS_PENDING))
            .select(DeletionRequest::as_select())
            .for_update()
            .first(conn)
            .optional()?;
        if let Some(existing) = existing {
            return Ok((existing, false));
        }

        let completes_at = scheduled_completion(now, grace_days);

        diesel::update(users::table.find(user_id))
            .set((users::deletion_scheduled_at.eq(completes_at), users::updated_at.eq(now)))
            .execute(conn)?;

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let request = diesel::insert_into(deletion_requests::table)
            .values(&NewDeletionRequest {
                user_id,
                reason,
                status: STATUS_PENDING,
                scheduled_completion_at: completes_at,
            })
            .returning(DeletionRequest::as_returning())
            .get_result(conn)?;

        Ok((request, true))
    })
}

/// Clears the schedule and withdraws pending requests. Idempotent: returns
/// whether anything was pending.
pub fn cancel_pending(conn: &mut PgConnection, user_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
    conn.transaction::<_, AppError, _>(|conn| {
        diesel::update(users::table.find(user_id))
            .set((users::deletion_scheduled_at.eq(None::<DateTime<Utc>>), users::updated_at.eq(now)))
            .execute(conn)?;

        let rows = diesel::update(
            deletion_requests::table
                .filter(deletion_requests::user_id.eq(user_id))
                .filter(deletion_requests::status.eq(STATUS_PENDING)),
        )
        .set((
            deletion_requests::status.eq(STATUS_REJECTED),
            deletion_requests::reviewed_by.eq(user_id),
            deletion_requests::reviewed_at.eq(now),
        ))
        .execute(conn)?;

        Ok(rows > 0)
    })
}

/// True once an approved deletion removed this account.
pub fn account_was_deleted(conn: &mut PgConnection, user_id: Uuid) -> AppResult<bool> {
    Ok(diesel::select(diesel::dsl::exists(
        deletion_requests::table
            .filter(deletion_requests::user_id.eq(user_id))
            .filter(deletion_requests::status.eq(STATUS_COMPLETED)),
    ))
    .get_result(conn)?)
}

/// Stored objects that belonged to the removed account. Collected inside the
/// cascade and cleaned up after commit.
#[derive(Debug, Default, Serialize)]
pub struct OrphanedObjects {
    pub property_images: Vec<String>,
    pub project_images: Vec<String>,
    pub project_plans: Vec<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub kyc_keys: Vec<String>,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct CascadeCounts {
    pub properties: usize,
    pub projects: usize,
    pub messages: usize,
    pub conversations: usize,
    pub seller_applications: usize,
    pub push_subscriptions: usize,
    pub reviews: usize,
    pub favorites: usize,
    pub user_blocks: usize,
    pub users: usize,
}

/// Deletes everything owned by `user_id`, dependents first, then the user row.
/// Must run inside the caller's transaction.
pub fn cascade_delete_user(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> AppResult<(CascadeCounts, OrphanedObjects)> {
    let mut orphans = OrphanedObjects::default();

    let property_images: Vec<Vec<String>> = properties::table
        .filter(properties::owner_id.eq(user_id))
        .select(properties::images)
        .load(conn)?;
    orphans.property_images = property_images.into_iter().flatten().collect();

    let project_media: Vec<(Vec<String>, Vec<String>)> = projects::table
        .filter(projects::owner_id.eq(user_id))
        .select((projects::images, projects::plans))
        .load(conn)?;
    for (images, plans) in project_media {
        orphans.project_images.extend(images);
        orphans.project_plans.extend(plans);
    }

    let (avatar_url, banner_url): (Option<String>, Option<String>) = users::table
        .find(user_id)
        .select((users::avatar_url, users::banner_url))
        .first(conn)
        .optional()?
        .unwrap_or((None, None));
    orphans.avatar_url = avatar_url;
    orphans.banner_url = banner_url;

    let kyc: Vec<(Option<String>, Option<String>, Option<String>)> = seller_applications::table
        .filter(seller_applications::user_id.eq(user_id))
        .select((
            seller_applications::kyc_front_key,
            seller_applications::kyc_back_key,
            seller_applications::kyc_selfie_key,
        ))
        .load(conn)?;
    orphans.kyc_keys = kyc
        .into_iter()
        .flat_map(|(a, b, c)| [a, b, c])
        .flatten()
        .collect();

    let mut counts = CascadeCounts::default();

    // Favorites on the user's properties go with the properties (ON DELETE CASCADE).
    counts.favorites = diesel::delete(favorites::table.filter(favorites::user_id.eq(user_id)))
        .execute(conn)?;
    counts.properties = diesel::delete(properties::table.filter(properties::owner_id.eq(user_id)))
        .execute(conn)?;
    counts.projects = diesel::delete(projects::table.filter(projects::owner_id.eq(user_id)))
        .execute(conn)?;
    counts.messages = diesel::delete(
        messages::table.filter(messages::sender_id.eq(user_id).or(messages::recipient_id.eq(user_id))),
    )
    .execute(conn)?;
    counts.conversations = diesel::delete(
        conversations::table
            .filter(conversations::user_low.eq(user_id).or(conversations::user_high.eq(user_id))),
    )
    .execute(conn)?;
    counts.seller_applications = diesel::delete(
        seller_applications::table.filter(seller_applications::user_id.eq(user_id)),
    )
    .execute(conn)?;
    counts.push_subscriptions = diesel::delete(
        push_subscriptions::table.filter(push_subscriptions::user_id.eq(user_id)),
    )
    .execute(conn)?;
    counts.reviews = diesel::delete(
        reviews::table.filter(reviews::reviewer_id.eq(user_id).or(reviews::reviewed_user_id.eq(user_id))),
    )
    .execute(conn)?;
    counts.user_blocks = diesel::delete(
        user_blocks::table.filter(user_blocks::blocker_id.eq(user_id).or(user_blocks::blocked_id.eq(user_id))),
    )
    .execute(conn)?;
    counts.users = diesel::delete(users::table.find(user_id)).execute(conn)?;

    tracing::info!(user_id = %user_id, counts = ?counts, "account cascade deleted");

    Ok((counts, orphans))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use vendra_shared::domain::thread::normalize_pair;
    use vendra_shared::types::auth::{AuthUser, UserRole};

    use crate::services::user_service;

    #[test]
    fn completion_is_thirty_days_out() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let due = scheduled_completion(now, 30);
        assert_eq!(due, Utc.with_ymd_and_hms(2026, 2, 14, 12, 0, 0).unwrap());
    }

    #[test]
    fn only_pending_requests_can_be_decided() {
        assert!(ensure_pending(STATUS_PENDING).is_ok());
        let err = ensure_pending(STATUS_COMPLETED).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DeletionRequestNotPending);
        assert_eq!(ensure_pending(STATUS_REJECTED).unwrap_err().code(), ErrorCode::DeletionRequestNotPending);
    }

    // The tests below need a migrated Postgres at VENDRA_TEST_DATABASE_URL and are
    // skipped without one. Everything runs inside a transaction that is never committed.

    fn test_conn() -> Option<PgConnection> {
        let url = std::env::var("VENDRA_TEST_DATABASE_URL").ok()?;
        let mut conn = PgConnection::establish(&url).expect("test database reachable");
        conn.begin_test_transaction().expect("test transaction");
        Some(conn)
    }

    fn insert_user(conn: &mut PgConnection) -> Uuid {
        let id = Uuid::now_v7();
        diesel::insert_into(users::table)
            .values((users::id.eq(id), users::role.eq("comprador")))
            .execute(conn)
            .unwrap();
        id
    }

    fn insert_property(conn: &mut PgConnection, owner: Uuid, images: Vec<String>) -> Uuid {
        diesel::insert_into(properties::table)
            .values((
                properties::owner_id.eq(owner),
                properties::title.eq("Casa en Surco"),
                properties::description.eq("Casa de dos pisos con jardín y cochera."),
                properties::price.eq(180_000i64),
                properties::operation.eq("venta"),
                properties::property_type.eq("casa"),
                properties::address.eq("Calle Las Flores 456"),
                properties::city.eq("Lima"),
                properties::images.eq(images),
            ))
            .returning(properties::id)
            .get_result(conn)
            .unwrap()
    }

    fn scheduled_at(conn: &mut PgConnection, user_id: Uuid) -> Option<DateTime<Utc>> {
        users::table
            .find(user_id)
            .select(users::deletion_scheduled_at)
            .first(conn)
            .unwrap()
    }

    #[test]
    fn cancel_is_idempotent() {
        let Some(mut conn) = test_conn() else { return };
        let user = insert_user(&mut conn);
        let now = Utc::now();

        assert!(!cancel_pending(&mut conn, user, now).unwrap());

        let (request, created) = schedule_deletion(&mut conn, user, Some("  me mudo  "), 30, now).unwrap();
        assert!(created);
        assert_eq!(request.reason.as_deref(), Some("me mudo"));
        assert_eq!(scheduled_at(&mut conn, user).map(|t| t.timestamp()), Some(request.scheduled_completion_at.timestamp()));

        let (again, created) = schedule_deletion(&mut conn, user, None, 30, now).unwrap();
        assert!(!created);
        assert_eq!(again.id, request.id);

        assert!(cancel_pending(&mut conn, user, now).unwrap());
        assert!(!cancel_pending(&mut conn, user, now).unwrap());
        assert_eq!(scheduled_at(&mut conn, user), None);

        let status: String = deletion_requests::table
            .find(request.id)
            .select(deletion_requests::status)
            .first(&mut conn)
            .unwrap();
        assert_eq!(status, STATUS_REJECTED);
    }

    #[test]
    fn cascade_removes_every_row_of_the_user() {
        let Some(mut conn) = test_conn() else { return };
        let gone = insert_user(&mut conn);
        let other = insert_user(&mut conn);

        let own_property = insert_property(&mut conn, gone, vec!["http://localhost:9000/property-images/x/1.jpg".into()]);
        let other_property = insert_property(&mut conn, other, vec![]);
        diesel::insert_into(projects::table)
            .values((
                projects::owner_id.eq(gone),
                projects::title.eq("Residencial Los Olivos"),
                projects::description.eq("Cuarenta departamentos con áreas comunes."),
                projects::address.eq("Av. Universitaria 1200"),
                projects::city.eq("Lima"),
                projects::plans.eq(vec!["http://localhost:9000/project-plans/x/p.pdf".to_string()]),
            ))
            .execute(&mut conn)
            .unwrap();
        diesel::insert_into(favorites::table)
            .values(&vec![
                (favorites::user_id.eq(gone), favorites::property_id.eq(other_property)),
                (favorites::user_id.eq(other), favorites::property_id.eq(own_property)),
            ])
            .execute(&mut conn)
            .unwrap();

        let (low, high) = normalize_pair(gone, other);
        let conversation: Uuid = diesel::insert_into(conversations::table)
            .values((conversations::user_low.eq(low), conversations::user_high.eq(high)))
            .returning(conversations::id)
            .get_result(&mut conn)
            .unwrap();
        diesel::insert_into(messages::table)
            .values(&vec![
                (
                    messages::conversation_id.eq(conversation),
                    messages::sender_id.eq(gone),
                    messages::recipient_id.eq(other),
                    messages::content.eq("hola"),
                ),
                (
                    messages::conversation_id.eq(conversation),
                    messages::sender_id.eq(other),
                    messages::recipient_id.eq(gone),
                    messages::content.eq("buenas"),
                ),
            ])
            .execute(&mut conn)
            .unwrap();
        diesel::insert_into(user_blocks::table)
            .values(&vec![
                (user_blocks::blocker_id.eq(gone), user_blocks::blocked_id.eq(other)),
                (user_blocks::blocker_id.eq(other), user_blocks::blocked_id.eq(gone)),
            ])
            .execute(&mut conn)
            .unwrap();
        diesel::insert_into(reviews::table)
            .values(&vec![
                (reviews::reviewer_id.eq(gone), reviews::reviewed_user_id.eq(other), reviews::rating.eq(5i16)),
                (reviews::reviewer_id.eq(other), reviews::reviewed_user_id.eq(gone), reviews::rating.eq(2i16)),
            ])
            .execute(&mut conn)
            .unwrap();
        diesel::insert_into(push_subscriptions::table)
            .values((
                push_subscriptions::user_id.eq(gone),
                push_subscriptions::endpoint.eq(format!("https://push.example.com/{gone}")),
                push_subscriptions::p256dh.eq("key"),
                push_subscriptions::auth.eq("auth"),
            ))
            .execute(&mut conn)
            .unwrap();
        diesel::insert_into(seller_applications::table)
            .values((
                seller_applications::user_id.eq(gone),
                seller_applications::role_choice.eq("vendedor_particular"),
                seller_applications::kyc_front_key.eq(format!("{gone}/front.jpg")),
            ))
            .execute(&mut conn)
            .unwrap();

        let (counts, orphans) = cascade_delete_user(&mut conn, gone).unwrap();

        assert_eq!(
            counts,
            CascadeCounts {
                properties: 1,
                projects: 1,
                messages: 2,
                conversations: 1,
                seller_applications: 1,
                push_subscriptions: 1,
                reviews: 2,
                favorites: 1,
                user_blocks: 2,
                users: 1,
            }
        );
        assert_eq!(orphans.property_images.len(), 1);
        assert_eq!(orphans.project_plans.len(), 1);
        assert_eq!(orphans.kyc_keys, vec![format!("{gone}/front.jpg")]);

        let left: i64 = properties::table.filter(properties::owner_id.eq(gone)).count().get_result(&mut conn).unwrap();
        assert_eq!(left, 0);
        let left: i64 = messages::table
            .filter(messages::sender_id.eq(gone).or(messages::recipient_id.eq(gone)))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(left, 0);
        let left: i64 = favorites::table.filter(favorites::property_id.eq(own_property)).count().get_result(&mut conn).unwrap();
        assert_eq!(left, 0);
        let left: i64 = users::table.find(gone).count().get_result(&mut conn).unwrap();
        assert_eq!(left, 0);

        let survivor: i64 = properties::table.find(other_property).count().get_result(&mut conn).unwrap();
        assert_eq!(survivor, 1);
    }

    #[test]
    fn deleted_account_is_not_recreated_from_claims() {
        let Some(mut conn) = test_conn() else { return };
        let user = insert_user(&mut conn);
        let (request, _) = schedule_deletion(&mut conn, user, None, 30, Utc::now()).unwrap();

        cascade_delete_user(&mut conn, user).unwrap();
        diesel::update(deletion_requests::table.find(request.id))
            .set(deletion_requests::status.eq(STATUS_COMPLETED))
            .execute(&mut conn)
            .unwrap();
        assert!(account_was_deleted(&mut conn, user).unwrap());

        let claims = AuthUser { id: user, role: UserRole::Comprador, email: None, name: None };
        let err = user_service::upsert_from_claims(&mut conn, &claims).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AccountDeleted);

        let fresh = AuthUser { id: Uuid::now_v7(), role: UserRole::Comprador, email: None, name: None };
        assert_eq!(user_service::upsert_from_claims(&mut conn, &fresh).unwrap().id, fresh.id);
    }
}
