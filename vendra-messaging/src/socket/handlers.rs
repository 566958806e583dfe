use std::sync::Arc;

use serde::Serialize;
use socketioxide::extract::SocketRef;
use uuid::Uuid;

use vendra_shared::middleware::{jwt_secret, validate_jwt};

use crate::socket::user_room;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

fn get_user_id(socket: &SocketRef) -> Option<Uuid> {
    socket.extensions.get::<Uuid>()
}

pub fn presence_key(user_id: Uuid) -> String {
    format!("online:{user_id}")
}

pub async fn on_connect_with_state(socket: SocketRef, state: Arc<AppState>) {
    let user_id = match authenticate_socket(&socket) {
        Ok(id) => id,
        Err(msg) => {
            tracing::warn!(error = %msg, "messaging socket auth failed");
            let _ = socket.emit(
                "error",
                &ErrorPayload {
                    code: "AUTH_FAILED".into(),
                    message: msg,
                },
            );
            socket.disconnect().ok();
            return;
        }
    };

    socket.extensions.insert(user_id);
    socket.join(user_room(user_id)).ok();

    tracing::info!(user_id = %user_id, sid = %socket.id, "messaging socket connected");

    refresh_presence(&state, user_id).await;

    let _ = socket.emit("connected", &serde_json::json!({ "user_id": user_id }));

    socket.on("heartbeat", {
        let state = state.clone();
        move |socket: SocketRef| {
            let state = state.clone();
            async move {
                if let Some(user_id) = get_user_id(&socket) {
                    refresh_presence(&state, user_id).await;
                }
            }
        }
    });

    socket.on_disconnect({
        let state = state.clone();
        move |socket: SocketRef| {
            let state = state.clone();
            async move {
                on_disconnect_with_state(socket, state).await;
            }
        }
    });
}

async fn refresh_presence(state: &AppState, user_id: Uuid) {
    if let Err(e) = state
        .redis
        .set(&presence_key(user_id), "1", state.config.presence_ttl_secs)
        .await
    {
        tracing::warn!(error = %e, user_id = %user_id, "failed to refresh presence");
    }
}

async fn on_disconnect_with_state(socket: SocketRef, state: Arc<AppState>) {
    let user_id = match get_user_id(&socket) {
        Some(id) => id,
        None => return,
    };

    tracing::info!(user_id = %user_id, sid = %socket.id, "messaging socket disconnected");

    // Other tabs of the same user keep the key alive.
    let still_connected = state
        .io
        .within(user_room(user_id))
        .sockets()
        .map(|sockets| sockets.iter().any(|s| s.id != socket.id))
        .unwrap_or(false);

    if !still_connected {
        let _ = state.redis.del(&presence_key(user_id)).await;
    }
}

/// Reads the `token` parameter of the handshake query string.
pub fn token_from_query(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let mut split = pair.splitn(2, '=');
        let key = split.next()?;
        let value = split.next()?;
        (key == "token" && !value.is_empty()).then(|| value.to_string())
    })
}

fn authenticate_socket(socket: &SocketRef) -> Result<Uuid, String> {
    let query = socket.req_parts().uri.query().unwrap_or_default();
    let token = token_from_query(query).ok_or_else(|| "missing token query parameter".to_string())?;

    let claims = validate_jwt(&token, &jwt_secret()).map_err(|e| e.to_string())?;
    if claims.is_expired() {
        return Err("token has expired".into());
    }

    Ok(claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_found_among_other_params() {
        assert_eq!(token_from_query("EIO=4&transport=websocket&token=abc.def").as_deref(), Some("abc.def"));
        assert_eq!(token_from_query("token=xyz").as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_empty_token_is_none() {
        assert_eq!(token_from_query("EIO=4&transport=polling"), None);
        assert_eq!(token_from_query("token="), None);
        assert_eq!(token_from_query(""), None);
    }

    #[test]
    fn presence_key_layout() {
        assert_eq!(presence_key(Uuid::nil()), "online:00000000-0000-0000-0000-000000000000");
    }
}
