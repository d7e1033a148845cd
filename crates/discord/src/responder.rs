use async_trait::async_trait;
use herald_core::{DeliveryTarget, ResponseEnvelope};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("callback request failed: {0}")]
    Transport(String),
    #[error("callback rejected with status {status}")]
    Rejected { status: u16 },
}

/// Delivers the final response envelope for one interaction.
///
/// The callback token authorizes exactly one visible response; callers must
/// invoke this once per interaction. Delivery failure is surfaced, never
/// retried here: the token expires on a platform-imposed clock and blind
/// retries past expiry only produce noise.
#[async_trait]
pub trait ResponseDelivery: Send + Sync {
    async fn deliver(
        &self,
        target: &DeliveryTarget,
        envelope: &ResponseEnvelope,
    ) -> Result<(), DeliveryError>;
}

/// HTTP delivery against the platform's per-interaction webhook endpoint.
pub struct WebhookResponder {
    client: reqwest::Client,
    api_base: String,
}

impl WebhookResponder {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_owned();
        Self { client, api_base }
    }

    fn callback_url(&self, target: &DeliveryTarget) -> String {
        format!(
            "{}/webhooks/{}/{}",
            self.api_base,
            target.application_id,
            target.expose_token()
        )
    }
}

#[async_trait]
impl ResponseDelivery for WebhookResponder {
    async fn deliver(
        &self,
        target: &DeliveryTarget,
        envelope: &ResponseEnvelope,
    ) -> Result<(), DeliveryError> {
        // Error envelopes render as plain content so the user always sees
        // the message-edit, not a bare failure.
        let body = serde_json::json!({ "content": envelope.user_visible_text() });

        debug!(
            event_name = "responder.callback.sending",
            correlation_id = %target.interaction_id,
            application_id = %target.application_id,
            is_error = envelope.is_error(),
            "sending follow-up response"
        );

        let response = self
            .client
            .patch(self.callback_url(target))
            .json(&body)
            .send()
            .await
            // The request URL embeds the interaction token; strip it before
            // the error can reach a log line.
            .map_err(|error| DeliveryError::Transport(error.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected { status: status.as_u16() });
        }

        info!(
            event_name = "responder.callback.delivered",
            correlation_id = %target.interaction_id,
            status = status.as_u16(),
            "follow-up response delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use herald_core::DeliveryTarget;

    use super::WebhookResponder;

    #[test]
    fn callback_url_is_keyed_by_application_and_token() {
        let responder =
            WebhookResponder::new(reqwest::Client::new(), "https://discord.com/api/v10/");
        let target = DeliveryTarget {
            interaction_id: "9001".to_string(),
            application_id: "1234567890".to_string(),
            token: "tok-abc".to_string().into(),
        };

        assert_eq!(
            responder.callback_url(&target),
            "https://discord.com/api/v10/webhooks/1234567890/tok-abc"
        );
    }
}
