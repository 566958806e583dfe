use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all domain events.
///
/// Routing key format: `vendra.{domain}.{entity}.{action}`
/// Example: `vendra.user.account.deleted`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // User events
    pub const USER_APPLICATION_SUBMITTED: &str = "vendra.user.application.submitted";
    pub const USER_APPLICATION_REVIEWED: &str = "vendra.user.application.reviewed";
    pub const USER_ACCOUNT_DELETION_SCHEDULED: &str = "vendra.user.account.deletion_scheduled";
    pub const USER_ACCOUNT_DELETED: &str = "vendra.user.account.deleted";

    // Listing events
    pub const LISTINGS_PROPERTY_CREATED: &str = "vendra.listings.property.created";
    pub const LISTINGS_PROJECT_CREATED: &str = "vendra.listings.project.created";

    // Messaging events
    pub const MESSAGING_MESSAGE_SENT: &str = "vendra.messaging.message.sent";
    pub const MESSAGING_CASE_STATUS_CHANGED: &str = "vendra.messaging.case.status_changed";

    // Moderation events
    pub const MODERATION_REPORT_CREATED: &str = "vendra.moderation.report.created";
    pub const MODERATION_REPORT_UPDATED: &str = "vendra.moderation.report.updated";
}

/// Common event data payloads
pub mod payloads {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ApplicationSubmitted {
        pub application_id: Uuid,
        pub user_id: Uuid,
        pub role_choice: String,
        pub role_promoted: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ApplicationReviewed {
        pub application_id: Uuid,
        pub user_id: Uuid,
        pub status: String,
        pub reviewed_by: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AccountDeletionScheduled {
        pub request_id: Uuid,
        pub user_id: Uuid,
        pub scheduled_completion_at: DateTime<Utc>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AccountDeleted {
        pub user_id: Uuid,
        pub request_id: Uuid,
        pub approved_by: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ListingCreated {
        pub listing_id: Uuid,
        pub owner_id: Uuid,
        pub title: String,
        pub city: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MessageSent {
        pub message_id: Uuid,
        pub conversation_id: Uuid,
        pub sender_id: Uuid,
        pub recipient_id: Uuid,
        pub content_preview: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CaseStatusChanged {
        pub conversation_id: Uuid,
        pub case_status: String,
        pub changed_by: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ReportCreated {
        pub report_id: Uuid,
        pub reporter_id: Uuid,
        pub reported_user_id: Uuid,
        pub reason: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ReportUpdated {
        pub report_id: Uuid,
        pub status: String,
        pub admin_id: Uuid,
    }
}

/// Cuts message bodies down for event payloads and inbox previews.
pub fn content_preview(content: &str, max_chars: usize) -> String {
    let mut chars = content.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{preview}…")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(content_preview("hola", 10), "hola");
        assert_eq!(content_preview("¿Sigue disponible?", 5), "¿Sigu…");
    }

    #[test]
    fn event_carries_user() {
        let user = Uuid::now_v7();
        let event = Event::new("vendra-user", routing_keys::USER_ACCOUNT_DELETED, ()).with_user(user);
        assert_eq!(event.user_id, Some(user));
        assert_eq!(event.event_type, "vendra.user.account.deleted");
    }
}
