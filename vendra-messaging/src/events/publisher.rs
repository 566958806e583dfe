use uuid::Uuid;

use vendra_shared::clients::rabbitmq::RabbitMQClient;
use vendra_shared::domain::thread::Message;
use vendra_shared::types::event::{content_preview, payloads, routing_keys, Event};

use crate::models::Conversation;

const SOURCE: &str = "vendra-messaging";
const PREVIEW_CHARS: usize = 120;

pub async fn publish_message_sent(rabbitmq: &RabbitMQClient, message: &Message) {
    let event = Event::new(
        SOURCE,
        routing_keys::MESSAGING_MESSAGE_SENT,
        payloads::MessageSent {
            message_id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            content_preview: content_preview(&message.content, PREVIEW_CHARS),
        },
    )
    .with_user(message.sender_id);

    rabbitmq.publish_or_log(&event).await;
}

pub async fn publish_case_status_changed(rabbitmq: &RabbitMQClient, conversation: &Conversation, admin_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::MESSAGING_CASE_STATUS_CHANGED,
        payloads::CaseStatusChanged {
            conversation_id: conversation.id,
            case_status: conversation.case_status.clone(),
            changed_by: admin_id,
        },
    )
    .with_user(admin_id);

    rabbitmq.publish_or_log(&event).await;
}
