use std::sync::Arc;

use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;

use vendra_shared::types::event::{payloads, routing_keys, Event};

use crate::socket::{self, handlers::presence_key};
use crate::AppState;

/// Drops the live sockets of accounts removed by an admin-approved deletion.
pub async fn listen_account_deleted(state: Arc<AppState>) -> anyhow::Result<()> {
    let mut consumer = state
        .rabbitmq
        .subscribe(
            "vendra-messaging.user.account.deleted",
            &[routing_keys::USER_ACCOUNT_DELETED],
        )
        .await?;

    tracing::info!("listening for user.account.deleted events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match serde_json::from_slice::<Event<payloads::AccountDeleted>>(&delivery.data) {
                    Ok(event) => {
                        let user_id = event.data.user_id;
                        tracing::info!(user_id = %user_id, "received account.deleted event");

                        socket::disconnect_user(&state.io, user_id);
                        let _ = state.redis.del(&presence_key(user_id)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to deserialize account.deleted event");
                    }
                }
                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "consumer error");
            }
        }
    }

    Ok(())
}
