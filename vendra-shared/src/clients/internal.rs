use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, ErrorCode};
use crate::middleware::INTERNAL_TOKEN_HEADER;

/// HTTP client for the `/internal/*` routes of sibling services.
#[derive(Clone)]
pub struct InternalClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl InternalClient {
    pub fn new(client: Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// POSTs JSON and unwraps the `data` field of the success envelope.
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client
            .post(&url)
            .header(INTERNAL_TOKEN_HEADER, &self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::new(ErrorCode::ServiceUnavailable, format!("internal call to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let (upstream_code, message) = match response.json::<ErrorEnvelope>().await {
                Ok(e) => (e.error.code, e.error.message),
                Err(_) => (String::new(), status.to_string()),
            };
            tracing::warn!(url = %url, status = %status, upstream_code = %upstream_code, "internal call rejected");
            return Err(AppError::with_details(
                ErrorCode::ServiceUnavailable,
                format!("internal call failed: {message}"),
                serde_json::json!({ "upstream_status": status.as_u16(), "upstream_code": upstream_code }),
            ));
        }

        let envelope = response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| AppError::internal(format!("invalid internal response: {e}")))?;
        Ok(envelope.data)
    }
}
