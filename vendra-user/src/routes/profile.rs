use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use vendra_shared::clients::storage::{image_extension, object_key, Bucket};
use vendra_shared::errors::{AppError, AppResult};
use vendra_shared::schema::{reviews, users};
use vendra_shared::types::auth::AuthUser;
use vendra_shared::types::ApiResponse;

use crate::models::{PublicProfile, RatingSummary, UpdateUser, User};
use crate::routes::upload::read_single_file;
use crate::services::user_service;
use crate::AppState;

// --- GET /me ---

pub async fn get_me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut conn = state.db.get()?;
    let me = user_service::upsert_from_claims(&mut conn, &user)?;
    Ok(Json(ApiResponse::ok(me)))
}

// --- PATCH /me ---

pub async fn update_me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateUser>,
) -> AppResult<Json<ApiResponse<User>>> {
    payload.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get()?;
    let me = user_service::upsert_from_claims(&mut conn, &user)?;

    if payload.name.is_none() && payload.bio.is_none() && payload.phone.is_none() {
        return Ok(Json(ApiResponse::ok(me)));
    }

    let updated = diesel::update(users::table.find(me.id))
        .set((&payload, users::updated_at.eq(Utc::now())))
        .returning(User::as_returning())
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- POST /me/avatar, /me/banner ---

#[derive(Debug, Serialize)]
pub struct ImageUploadResponse {
    pub url: String,
}

pub async fn upload_avatar(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ImageUploadResponse>>> {
    replace_profile_image(user, state, multipart, Bucket::Avatars).await
}

pub async fn upload_banner(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ImageUploadResponse>>> {
    replace_profile_image(user, state, multipart, Bucket::Banners).await
}

async fn replace_profile_image(
    user: AuthUser,
    state: Arc<AppState>,
    mut multipart: Multipart,
    bucket: Bucket,
) -> AppResult<Json<ApiResponse<ImageUploadResponse>>> {
    let file = read_single_file(&mut multipart, image_extension).await?;

    let previous = {
        let mut conn = state.db.get()?;
        let me = user_service::upsert_from_claims(&mut conn, &user)?;
        match bucket {
            Bucket::Banners => me.banner_url,
            _ => me.avatar_url,
        }
    };

    let key = object_key(user.id, file.extension);
    let url = state.storage.upload(bucket, &key, file.bytes, &file.content_type).await?;

    let mut conn = state.db.get()?;
    let now = Utc::now();
    let written = match bucket {
        Bucket::Banners => diesel::update(users::table.find(user.id))
            .set((users::banner_url.eq(&url), users::updated_at.eq(now)))
            .execute(&mut conn),
        _ => diesel::update(users::table.find(user.id))
            .set((users::avatar_url.eq(&url), users::updated_at.eq(now)))
            .execute(&mut conn),
    };

    if let Err(e) = written {
        state.storage.delete_urls_best_effort(bucket, user.id, &[url]).await;
        return Err(e.into());
    }

    if let Some(old) = previous {
        state.storage.delete_urls_best_effort(bucket, user.id, &[old]).await;
    }

    tracing::info!(user_id = %user.id, bucket = bucket.as_str(), url = %url, "profile image replaced");

    Ok(Json(ApiResponse::ok(ImageUploadResponse { url })))
}

// --- GET /users/:id ---

pub async fn get_public_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PublicProfile>>> {
    let mut conn = state.db.get()?;

    let user = user_service::find_user(&mut conn, user_id)?;

    let ratings: Vec<i16> = reviews::table
        .filter(reviews::reviewed_user_id.eq(user_id))
        .select(reviews::rating)
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(PublicProfile {
        id: user.id,
        name: user.name,
        role: user.role,
        avatar_url: user.avatar_url,
        banner_url: user.banner_url,
        bio: user.bio,
        created_at: user.created_at,
        rating: RatingSummary::from_ratings(&ratings),
    })))
}
