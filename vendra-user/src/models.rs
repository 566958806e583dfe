use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use vendra_shared::schema::{deletion_requests, push_subscriptions, reviews, seller_applications, users};

// --- User ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub deletion_scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub id: Uuid,
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub role: &'a str,
}

#[derive(Debug, AsChangeset, Deserialize, Validate, Default)]
#[diesel(table_name = users)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    #[validate(length(min = 6, max = 30))]
    pub phone: Option<String>,
}

/// Fields anyone may see on a profile page.
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: Option<String>,
    pub role: String,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub rating: RatingSummary,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i64,
}

impl RatingSummary {
    pub fn from_ratings(ratings: &[i16]) -> Self {
        if ratings.is_empty() {
            return Self { average: None, count: 0 };
        }
        let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        let average = sum as f64 / ratings.len() as f64;
        Self {
            average: Some((average * 10.0).round() / 10.0),
            count: ratings.len() as i64,
        }
    }
}

// --- Seller application ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = seller_applications)]
pub struct SellerApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_choice: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub company_name: Option<String>,
    pub kyc_front_key: Option<String>,
    pub kyc_back_key: Option<String>,
    pub kyc_selfie_key: Option<String>,
    pub terms_accepted: bool,
    pub confirm_truth: bool,
    pub status: String,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = seller_applications)]
pub struct NewSellerApplication {
    pub user_id: Uuid,
    pub role_choice: String,
}

/// Partial form save. `None` leaves the stored value untouched.
#[derive(Debug, Clone, AsChangeset, Deserialize, Validate, Default)]
#[diesel(table_name = seller_applications)]
pub struct ApplicationDraft {
    #[validate(length(min = 1, max = 30))]
    pub role_choice: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub full_name: Option<String>,
    #[validate(length(min = 6, max = 30))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub document_type: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub document_number: Option<String>,
    #[validate(length(min = 1, max = 160))]
    pub company_name: Option<String>,
    pub terms_accepted: Option<bool>,
    pub confirm_truth: Option<bool>,
}

impl ApplicationDraft {
    pub fn is_empty(&self) -> bool {
        self.role_choice.is_none()
            && self.full_name.is_none()
            && self.phone.is_none()
            && self.document_type.is_none()
            && self.document_number.is_none()
            && self.company_name.is_none()
            && self.terms_accepted.is_none()
            && self.confirm_truth.is_none()
    }
}

/// Admin-facing view with short-lived links to the private KYC scans.
#[derive(Debug, Serialize)]
pub struct ApplicationReview {
    #[serde(flatten)]
    pub application: SellerApplication,
    pub applicant_email: Option<String>,
    pub kyc_front_url: Option<String>,
    pub kyc_back_url: Option<String>,
    pub kyc_selfie_url: Option<String>,
}

// --- Deletion request ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = deletion_requests)]
pub struct DeletionRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reason: Option<String>,
    pub status: String,
    pub scheduled_completion_at: DateTime<Utc>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = deletion_requests)]
pub struct NewDeletionRequest<'a> {
    pub user_id: Uuid,
    pub reason: Option<&'a str>,
    pub status: &'a str,
    pub scheduled_completion_at: DateTime<Utc>,
}

// --- Review ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = reviews)]
pub struct Review {
    pub id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewed_user_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reviews)]
pub struct NewReview<'a> {
    pub reviewer_id: Uuid,
    pub reviewed_user_id: Uuid,
    pub rating: i16,
    pub comment: Option<&'a str>,
}

// --- Push subscription ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = push_subscriptions)]
pub struct PushSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub p256dh: String,
    #[serde(skip_serializing)]
    pub auth: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = push_subscriptions)]
pub struct NewPushSubscription<'a> {
    pub user_id: Uuid,
    pub endpoint: &'a str,
    pub p256dh: &'a str,
    pub auth: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_summary_rounds_to_one_decimal() {
        assert_eq!(
            RatingSummary::from_ratings(&[5, 4, 4]),
            RatingSummary { average: Some(4.3), count: 3 }
        );
    }

    #[test]
    fn no_reviews_has_no_average() {
        assert_eq!(RatingSummary::from_ratings(&[]), RatingSummary { average: None, count: 0 });
    }

    #[test]
    fn empty_draft_is_detected() {
        assert!(ApplicationDraft::default().is_empty());
        let draft = ApplicationDraft { full_name: Some("Ana".into()), ..Default::default() };
        assert!(!draft.is_empty());
    }

    #[test]
    fn draft_lengths_are_validated() {
        let draft = ApplicationDraft { full_name: Some(String::new()), ..Default::default() };
        assert!(draft.validate().is_err());
        let draft = ApplicationDraft { document_number: Some("12345678".into()), ..Default::default() };
        assert!(draft.validate().is_ok());
    }
}
