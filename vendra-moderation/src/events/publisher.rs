use uuid::Uuid;

use vendra_shared::clients::rabbitmq::RabbitMQClient;
use vendra_shared::types::event::{payloads, routing_keys, Event};

use crate::models::Report;

const SOURCE: &str = "vendra-moderation";

pub async fn publish_report_created(rabbitmq: &RabbitMQClient, report: &Report) {
    let event = Event::new(
        SOURCE,
        routing_keys::MODERATION_REPORT_CREATED,
        payloads::ReportCreated {
            report_id: report.id,
            reporter_id: report.reporter_id,
            reported_user_id: report.reported_user_id,
            reason: report.reason.clone(),
        },
    )
    .with_user(report.reporter_id);

    rabbitmq.publish_or_log(&event).await;
}

pub async fn publish_report_updated(rabbitmq: &RabbitMQClient, report: &Report, admin_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::MODERATION_REPORT_UPDATED,
        payloads::ReportUpdated {
            report_id: report.id,
            status: report.status.clone(),
            admin_id,
        },
    )
    .with_user(admin_id);

    rabbitmq.publish_or_log(&event).await;
}
