use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use vendra_shared::domain::thread::{normalize_pair, Message};
use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::schema::{conversations, messages, users};
use vendra_shared::types::auth::UserRole;

use crate::models::{CaseStatus, Conversation, ConversationType, NewConversation, NewMessage};
use crate::services::blocks::{self, BlockStatus};

pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Trims a message body and checks its length.
pub fn normalize_content(raw: &str) -> AppResult<String> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::Validation("message content cannot be empty".into()));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "message content exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(content.to_string())
}

/// Whether a new message may be appended to the thread.
pub fn send_gate(block: BlockStatus, case: Option<CaseStatus>) -> AppResult<()> {
    if block.any_block {
        return Err(AppError::with_details(
            ErrorCode::Blocked,
            "messaging is blocked between these users",
            serde_json::json!({
                "i_blocked_them": block.i_blocked_them,
                "they_blocked_me": block.they_blocked_me,
            }),
        ));
    }
    if case == Some(CaseStatus::Closed) {
        return Err(AppError::new(ErrorCode::CaseClosed, "this conversation has been closed"));
    }
    Ok(())
}

pub fn find_conversation(conn: &mut PgConnection, id: Uuid) -> AppResult<Conversation> {
    conversations::table
        .find(id)
        .select(Conversation::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(crate::models::not_found)
}

/// Conversation for the unordered pair, locked for the rest of the transaction.
fn locked_between(conn: &mut PgConnection, a: Uuid, b: Uuid) -> AppResult<Option<Conversation>> {
    let (low, high) = normalize_pair(a, b);
    Ok(conversations::table
        .filter(conversations::user_low.eq(low))
        .filter(conversations::user_high.eq(high))
        .for_update()
        .select(Conversation::as_select())
        .first(conn)
        .optional()?)
}

fn is_admin(conn: &mut PgConnection, user_id: Uuid) -> AppResult<bool> {
    let role: Option<String> = users::table
        .find(user_id)
        .select(users::role)
        .first(conn)
        .optional()?;
    Ok(role.as_deref() == Some(UserRole::Admin.as_str()))
}

/// Appends a message to the thread between `sender` and `recipient`, creating the
/// conversation on first contact. Runs in one transaction with the pair row locked.
pub fn append_message(
    conn: &mut PgConnection,
    sender: Uuid,
    sender_is_admin: bool,
    recipient: Uuid,
    content: &str,
) -> AppResult<(Conversation, Message)> {
    if sender == recipient {
        return Err(AppError::new(ErrorCode::CannotMessageSelf, "cannot message yourself"));
    }

    conn.transaction::<_, AppError, _>(|conn| {
        let status = blocks::block_status(conn, sender, recipient)?;
        let existing = locked_between(conn, sender, recipient)?;
        let case = existing.as_ref().map(Conversation::case).transpose()?;
        send_gate(status, case)?;

        let conversation = match existing {
            Some(c) => c,
            None => {
                let kind = ConversationType::for_participants(sender_is_admin, is_admin(conn, recipient)?);
                let (low, high) = normalize_pair(sender, recipient);
                diesel::insert_into(conversations::table)
                    .values(&NewConversation {
                        user_low: low,
                        user_high: high,
                        conversation_type: kind.as_str(),
                    })
                    .on_conflict((conversations::user_low, conversations::user_high))
                    .do_nothing()
                    .execute(conn)?;
                locked_between(conn, sender, recipient)?
                    .ok_or_else(|| AppError::internal("conversation vanished after insert"))?
            }
        };

        let message = diesel::insert_into(messages::table)
            .values(&NewMessage {
                conversation_id: conversation.id,
                sender_id: sender,
                recipient_id: recipient,
                content,
            })
            .returning(Message::as_returning())
            .get_result(conn)?;

        let conversation = diesel::update(conversations::table.find(conversation.id))
            .set(conversations::last_message_at.eq(message.created_at))
            .returning(Conversation::as_returning())
            .get_result(conn)?;

        Ok((conversation, message))
    })
}

/// Most recent message of a conversation.
pub fn last_message(conn: &mut PgConnection, conversation_id: Uuid) -> AppResult<Option<Message>> {
    Ok(messages::table
        .filter(messages::conversation_id.eq(conversation_id))
        .order(messages::seq.desc())
        .select(Message::as_select())
        .first(conn)
        .optional()?)
}

pub fn unread_in(conn: &mut PgConnection, conversation_id: Uuid, reader: Uuid) -> AppResult<i64> {
    Ok(messages::table
        .filter(messages::conversation_id.eq(conversation_id))
        .filter(messages::recipient_id.eq(reader))
        .filter(messages::read_at.is_null())
        .count()
        .get_result(conn)?)
}

/// Marks everything `sender` sent to `reader` as read.
pub fn mark_read(conn: &mut PgConnection, reader: Uuid, sender: Uuid) -> AppResult<usize> {
    Ok(diesel::update(
        messages::table
            .filter(messages::recipient_id.eq(reader))
            .filter(messages::sender_id.eq(sender))
            .filter(messages::read_at.is_null()),
    )
    .set(messages::read_at.eq(chrono::Utc::now()))
    .execute(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed() {
        assert_eq!(normalize_content("  ¿Sigue disponible?\n").unwrap(), "¿Sigue disponible?");
    }

    #[test]
    fn blank_content_is_rejected() {
        assert_eq!(normalize_content(" \n\t ").unwrap_err().code(), ErrorCode::ValidationError);
    }

    #[test]
    fn length_is_counted_in_chars() {
        assert!(normalize_content(&"ñ".repeat(MAX_MESSAGE_CHARS)).is_ok());
        assert!(normalize_content(&"a".repeat(MAX_MESSAGE_CHARS + 1)).is_err());
    }

    #[test]
    fn any_block_rejects_sending() {
        let err = send_gate(BlockStatus::new(false, true), Some(CaseStatus::Open)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Blocked);
        let err = send_gate(BlockStatus::new(true, false), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Blocked);
    }

    #[test]
    fn closed_case_rejects_sending() {
        let err = send_gate(BlockStatus::default(), Some(CaseStatus::Closed)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CaseClosed);
    }

    #[test]
    fn open_or_new_thread_accepts() {
        assert!(send_gate(BlockStatus::default(), None).is_ok());
        assert!(send_gate(BlockStatus::default(), Some(CaseStatus::Open)).is_ok());
    }
}
