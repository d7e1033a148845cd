//! Stage one of the two-stage dispatch split: the webhook endpoint that
//! verifies, decodes, and acknowledges interactions within the platform's
//! three-second window. Handler execution never happens here; accepted
//! commands are queued for the worker and answered with a deferred
//! acknowledgment.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use herald_core::{IngressError, InteractionKind};
use herald_discord::dispatch::UNSUPPORTED_MESSAGE;
use herald_discord::interaction::decode;
use herald_discord::verify::{
    AuthenticationError, SignatureHeaders, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

use crate::worker::WorkItem;

/// Wire value for an immediate pong callback.
const CALLBACK_TYPE_PONG: u8 = 1;
/// Wire value for a deferred channel-message callback.
const CALLBACK_TYPE_DEFERRED: u8 = 5;

#[derive(Clone)]
pub struct WebhookState {
    verifier: Arc<SignatureVerifier>,
    work_queue: mpsc::Sender<WorkItem>,
}

impl WebhookState {
    pub fn new(verifier: Arc<SignatureVerifier>, work_queue: mpsc::Sender<WorkItem>) -> Self {
        Self { verifier, work_queue }
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/interactions", post(interactions)).with_state(state)
}

/// The synchronous acknowledgment sent inside the platform's response window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionAck {
    /// Liveness ping answered in place, no dispatch involved.
    Pong,
    /// Command accepted and queued; the real response follows out of band.
    Deferred,
    /// Verified but not something this service dispatches.
    Unsupported,
}

impl IntoResponse for InteractionAck {
    fn into_response(self) -> Response {
        let body = match self {
            Self::Pong => json!({ "type": CALLBACK_TYPE_PONG }),
            Self::Deferred => json!({
                "type": CALLBACK_TYPE_DEFERRED,
                "data": { "content": "processing..." }
            }),
            Self::Unsupported => json!({ "errorMessage": UNSUPPORTED_MESSAGE }),
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

pub async fn interactions(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match accept_interaction(&state, &headers, &body).await {
        Ok(ack) => ack.into_response(),
        Err(error) => {
            warn!(
                event_name = "ingress.interaction.rejected",
                status = error.status_code(),
                error = %error,
                "interaction request rejected"
            );
            let status = StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({ "errorMessage": error.user_message() }))).into_response()
        }
    }
}

/// Verification runs against the raw body bytes before anything is parsed;
/// a request that fails the signature check touches neither the decoder nor
/// the registry.
async fn accept_interaction(
    state: &WebhookState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<InteractionAck, IngressError> {
    let signature_values = header_values(headers, SIGNATURE_HEADER)?;
    let timestamp_values = header_values(headers, TIMESTAMP_HEADER)?;
    let signature = SignatureHeaders::from_values(&signature_values, &timestamp_values)?;

    if !state.verifier.verify(&signature.signature, &signature.timestamp, body) {
        return Err(AuthenticationError::BadSignature.into());
    }

    let interaction = decode(body)?;
    match interaction.kind {
        InteractionKind::Ping => {
            info!(event_name = "ingress.interaction.ping", "answering liveness ping");
            Ok(InteractionAck::Pong)
        }
        InteractionKind::Command => {
            let item = WorkItem::new(interaction);
            let correlation_id = item.correlation_id.clone();
            let command = item.interaction.command_name.clone();
            state.work_queue.try_send(item).map_err(|error| {
                IngressError::Unavailable(match error {
                    TrySendError::Full(_) => "dispatch queue is full".to_string(),
                    TrySendError::Closed(_) => "dispatch worker is not running".to_string(),
                })
            })?;
            info!(
                event_name = "ingress.interaction.accepted",
                correlation_id = %correlation_id,
                command = command.as_deref().unwrap_or("none"),
                "command queued for out-of-band dispatch"
            );
            Ok(InteractionAck::Deferred)
        }
        InteractionKind::Other => {
            info!(
                event_name = "ingress.interaction.unsupported",
                "verified interaction type is not dispatched"
            );
            Ok(InteractionAck::Unsupported)
        }
    }
}

fn header_values<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<Vec<&'a str>, AuthenticationError> {
    headers
        .get_all(name)
        .iter()
        .map(|value| value.to_str().map_err(|_| AuthenticationError::NonUtf8Header(name)))
        .collect()
}
