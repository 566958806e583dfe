pub mod handlers;

use serde::Serialize;
use socketioxide::SocketIo;
use uuid::Uuid;

pub fn user_room(user_id: Uuid) -> String {
    format!("user:{user_id}")
}

/// Pushes an event to every socket of `user_id`. Delivery is best-effort; clients
/// reconcile through the `seq` cursor.
pub fn emit_to_user<T: Serialize>(io: &SocketIo, user_id: Uuid, event: &'static str, payload: &T) {
    if let Err(e) = io.to(user_room(user_id)).emit(event, payload) {
        tracing::warn!(error = %e, user_id = %user_id, event = %event, "socket emit failed");
    }
}

/// Drops every live socket of `user_id`.
pub fn disconnect_user(io: &SocketIo, user_id: Uuid) {
    if let Err(errors) = io.within(user_room(user_id)).disconnect() {
        tracing::warn!(errors = ?errors, user_id = %user_id, "failed to disconnect user sockets");
    }
}
