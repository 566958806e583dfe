use vendra_shared::clients::rabbitmq::RabbitMQClient;
use vendra_shared::types::event::{payloads, routing_keys, Event};

use crate::models::{Project, Property};

const SOURCE: &str = "vendra-listings";

pub async fn publish_property_created(rabbitmq: &RabbitMQClient, property: &Property) {
    let event = Event::new(
        SOURCE,
        routing_keys::LISTINGS_PROPERTY_CREATED,
        payloads::ListingCreated {
            listing_id: property.id,
            owner_id: property.owner_id,
            title: property.title.clone(),
            city: property.city.clone(),
        },
    )
    .with_user(property.owner_id);

    rabbitmq.publish_or_log(&event).await;
}

pub async fn publish_project_created(rabbitmq: &RabbitMQClient, project: &Project) {
    let event = Event::new(
        SOURCE,
        routing_keys::LISTINGS_PROJECT_CREATED,
        payloads::ListingCreated {
            listing_id: project.id,
            owner_id: project.owner_id,
            title: project.title.clone(),
            city: project.city.clone(),
        },
    )
    .with_user(project.owner_id);

    rabbitmq.publish_or_log(&event).await;
}
