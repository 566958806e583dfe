use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::schema::{conversations, messages, user_blocks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(CaseStatus::Open),
            "closed" => Ok(CaseStatus::Closed),
            _ => Err(format!("unknown case status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    UserToUser,
    UserToAdmin,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::UserToUser => "user_to_user",
            ConversationType::UserToAdmin => "user_to_admin",
        }
    }

    /// Any thread with an admin on one side is a support thread.
    pub fn for_participants(a_is_admin: bool, b_is_admin: bool) -> Self {
        if a_is_admin || b_is_admin {
            ConversationType::UserToAdmin
        } else {
            ConversationType::UserToUser
        }
    }
}

// --- Conversation ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = conversations)]
pub struct Conversation {
    pub id: Uuid,
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub conversation_type: String,
    pub case_status: String,
    pub closed_by: Option<Uuid>,
    pub closed_at: Option<DateTime<Utc>>,
    pub escalated_report_id: Option<Uuid>,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn participants(&self) -> [Uuid; 2] {
        [self.user_low, self.user_high]
    }

    pub fn includes(&self, user_id: Uuid) -> bool {
        self.user_low == user_id || self.user_high == user_id
    }

    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.user_low == user_id { self.user_high } else { self.user_low }
    }

    pub fn case(&self) -> AppResult<CaseStatus> {
        self.case_status
            .parse()
            .map_err(|e: String| AppError::internal(format!("corrupt conversation row: {e}")))
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = conversations)]
pub struct NewConversation<'a> {
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub conversation_type: &'a str,
}

// --- Message ---

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage<'a> {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    pub after_seq: Option<i64>,
}

/// Inbox row for `GET /conversations`.
#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub other_user_id: Uuid,
    pub conversation_type: String,
    pub case_status: String,
    pub last_message_at: DateTime<Utc>,
    pub last_message_preview: Option<String>,
    pub last_sender_id: Option<Uuid>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub total_unread: i64,
}

#[derive(Debug, Serialize)]
pub struct ReadReceipt {
    pub reader_id: Uuid,
    pub updated: usize,
    pub read_at: DateTime<Utc>,
}

// --- Blocks ---

#[derive(Debug, Queryable, Selectable, Serialize, Clone)]
#[diesel(table_name = user_blocks)]
pub struct UserBlock {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_blocks)]
pub struct NewUserBlock {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BlockedUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub blocked_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct InternalBlockRequest {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
}

pub fn not_found() -> AppError {
    AppError::new(ErrorCode::ConversationNotFound, "conversation not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(low: Uuid, high: Uuid) -> Conversation {
        let now = Utc::now();
        Conversation {
            id: Uuid::now_v7(),
            user_low: low,
            user_high: high,
            conversation_type: "user_to_user".into(),
            case_status: "open".into(),
            closed_by: None,
            closed_at: None,
            escalated_report_id: None,
            last_message_at: now,
            created_at: now,
        }
    }

    #[test]
    fn other_participant_is_the_opposite_side() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let conv = conversation(a, b);
        assert_eq!(conv.other_participant(a), b);
        assert_eq!(conv.other_participant(b), a);
        assert!(conv.includes(a));
        assert!(!conv.includes(Uuid::nil()));
    }

    #[test]
    fn admin_on_either_side_makes_a_support_thread() {
        assert_eq!(ConversationType::for_participants(false, false), ConversationType::UserToUser);
        assert_eq!(ConversationType::for_participants(true, false), ConversationType::UserToAdmin);
        assert_eq!(ConversationType::for_participants(false, true), ConversationType::UserToAdmin);
    }

    #[test]
    fn corrupt_case_status_is_internal() {
        let mut conv = conversation(Uuid::nil(), Uuid::now_v7());
        assert_eq!(conv.case().unwrap(), CaseStatus::Open);
        conv.case_status = "archived".into();
        assert_eq!(conv.case().unwrap_err().code(), ErrorCode::InternalError);
    }
}
