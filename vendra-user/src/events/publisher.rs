use chrono::{DateTime, Utc};
use uuid::Uuid;

use vendra_shared::clients::rabbitmq::RabbitMQClient;
use vendra_shared::types::event::{payloads, routing_keys, Event};

const SOURCE: &str = "vendra-user";

pub async fn publish_application_submitted(
    rabbitmq: &RabbitMQClient,
    application_id: Uuid,
    user_id: Uuid,
    role_choice: &str,
    role_promoted: bool,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_APPLICATION_SUBMITTED,
        payloads::ApplicationSubmitted {
            application_id,
            user_id,
            role_choice: role_choice.to_string(),
            role_promoted,
        },
    )
    .with_user(user_id);

    rabbitmq.publish_or_log(&event).await;
}

pub async fn publish_application_reviewed(
    rabbitmq: &RabbitMQClient,
    application_id: Uuid,
    user_id: Uuid,
    status: &str,
    reviewed_by: Uuid,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_APPLICATION_REVIEWED,
        payloads::ApplicationReviewed {
            application_id,
            user_id,
            status: status.to_string(),
            reviewed_by,
        },
    )
    .with_user(user_id);

    rabbitmq.publish_or_log(&event).await;
}

pub async fn publish_deletion_scheduled(
    rabbitmq: &RabbitMQClient,
    request_id: Uuid,
    user_id: Uuid,
    scheduled_completion_at: DateTime<Utc>,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_ACCOUNT_DELETION_SCHEDULED,
        payloads::AccountDeletionScheduled {
            request_id,
            user_id,
            scheduled_completion_at,
        },
    )
    .with_user(user_id);

    rabbitmq.publish_or_log(&event).await;
}

pub async fn publish_account_deleted(rabbitmq: &RabbitMQClient, user_id: Uuid, request_id: Uuid, approved_by: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_ACCOUNT_DELETED,
        payloads::AccountDeleted {
            user_id,
            request_id,
            approved_by,
        },
    )
    .with_user(user_id);

    rabbitmq.publish_or_log(&event).await;
}
