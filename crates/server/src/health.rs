use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::worker::WorkItem;

// A weak handle: health must observe the queue without holding it open, or
// shutdown could never drain the worker.
#[derive(Clone)]
pub struct HealthState {
    work_queue: mpsc::WeakSender<WorkItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub dispatch: HealthCheck,
    pub checked_at: String,
}

pub fn router(work_queue: mpsc::WeakSender<WorkItem>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { work_queue })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    work_queue: mpsc::WeakSender<WorkItem>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(work_queue)).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let dispatch = dispatch_check(&state.work_queue);
    let ready = dispatch.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "herald-server runtime initialized".to_string(),
        },
        dispatch,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn dispatch_check(queue: &mpsc::WeakSender<WorkItem>) -> HealthCheck {
    let Some(queue) = queue.upgrade() else {
        return HealthCheck {
            status: "degraded",
            detail: "dispatch queue is shut down".to_string(),
        };
    };
    if queue.is_closed() {
        return HealthCheck {
            status: "degraded",
            detail: "dispatch worker is not running".to_string(),
        };
    }
    HealthCheck {
        status: "ready",
        detail: format!("queue slots free: {}/{}", queue.capacity(), queue.max_capacity()),
    }
}
