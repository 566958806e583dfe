use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

/// Transactional mail through the Resend API. A client built without an API key
/// logs and skips every send, which is what local development runs with.
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: Option<String>,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

impl EmailClient {
    pub fn new(client: Client, api_key: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            client,
            api_key: (!api_key.is_empty()).then(|| api_key.to_string()),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!(to = %to, subject = %subject, "email disabled, skipping send");
            return Ok(());
        };

        let request = ResendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: html.to_string(),
        };

        let response = self.client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("email send failed: {e}"))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("email API error: {body}"));
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }

    pub async fn send_application_decision(
        &self,
        to: &str,
        status: &str,
        notes: Option<&str>,
    ) -> Result<(), String> {
        let (subject, headline) = application_copy(status);
        let notes_block = notes
            .filter(|n| !n.trim().is_empty())
            .map(|n| format!("<p style=\"background:#f4f4f5;padding:12px;border-radius:6px;\">{}</p>", escape_html(n)))
            .unwrap_or_default();
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #0f766e;">Vendra</h2>
            <p>{headline}</p>
            {notes_block}
            </div>"#
        );

        self.send_email(to, subject, &html).await
    }

    pub async fn send_deletion_scheduled(&self, to: &str, completes_at: DateTime<Utc>) -> Result<(), String> {
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #0f766e;">Vendra</h2>
            <p>Recibimos tu solicitud de eliminación de cuenta. Se completará a partir del {}.</p>
            <p>Puedes cancelarla desde tus preferencias antes de esa fecha.</p>
            </div>"#,
            completes_at.format("%d/%m/%Y")
        );

        self.send_email(to, "Vendra - Eliminación de cuenta programada", &html).await
    }
}

fn application_copy(status: &str) -> (&'static str, &'static str) {
    match status {
        "approved" => (
            "Vendra - Solicitud de vendedor aprobada",
            "Tu solicitud de vendedor fue aprobada. Ya puedes publicar propiedades.",
        ),
        "rejected" => (
            "Vendra - Solicitud de vendedor rechazada",
            "Tu solicitud de vendedor fue rechazada.",
        ),
        _ => (
            "Vendra - Necesitamos más información",
            "Revisamos tu solicitud de vendedor y necesitamos más información para continuar.",
        ),
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_notes_are_escaped() {
        assert_eq!(escape_html("<b>\"x\" & y</b>"), "&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;");
    }

    #[test]
    fn request_info_falls_back_to_generic_copy() {
        assert!(application_copy("needs_more_info").0.contains("información"));
        assert!(application_copy("approved").1.contains("aprobada"));
    }

    #[tokio::test]
    async fn disabled_client_skips_send() {
        let client = EmailClient::new(Client::new(), "", "no-reply@vendra.com", "Vendra");
        assert!(client.send_email("ana@example.com", "s", "<p>x</p>").await.is_ok());
    }
}
