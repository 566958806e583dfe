use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::schema::reviews;
use vendra_shared::types::auth::AuthUser;
use vendra_shared::types::pagination::{Paginated, PaginationParams};
use vendra_shared::types::ApiResponse;

use crate::models::{NewReview, Review};
use crate::services::user_service;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

/// POST /users/:id/reviews
pub async fn create_review(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(reviewed_id): Path<Uuid>,
    Json(req): Json<CreateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    if reviewed_id == user.id {
        return Err(AppError::new(ErrorCode::CannotReviewSelf, "you cannot review yourself"));
    }

    let mut conn = state.db.get()?;
    user_service::find_user(&mut conn, reviewed_id)?;

    let comment = req.comment.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let review = diesel::insert_into(reviews::table)
        .values(&NewReview {
            reviewer_id: user.id,
            reviewed_user_id: reviewed_id,
            rating: req.rating,
            comment,
        })
        .returning(Review::as_returning())
        .get_result(&mut conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                AppError::new(ErrorCode::DuplicateReview, "you already reviewed this user")
            }
            other => AppError::Database(other),
        })?;

    tracing::info!(reviewer = %user.id, reviewed = %reviewed_id, rating = review.rating, "review created");

    Ok(Json(ApiResponse::ok(review)))
}

/// GET /users/:id/reviews
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(reviewed_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Review>>>> {
    let mut conn = state.db.get()?;

    let total: i64 = reviews::table
        .filter(reviews::reviewed_user_id.eq(reviewed_id))
        .count()
        .get_result(&mut conn)?;

    let items = reviews::table
        .filter(reviews::reviewed_user_id.eq(reviewed_id))
        .order(reviews::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .select(Review::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_must_be_one_to_five() {
        let ok = CreateReviewRequest { rating: 5, comment: None };
        assert!(ok.validate().is_ok());
        let zero = CreateReviewRequest { rating: 0, comment: None };
        assert!(zero.validate().is_err());
        let six = CreateReviewRequest { rating: 6, comment: Some("great".into()) };
        assert!(six.validate().is_err());
    }
}
