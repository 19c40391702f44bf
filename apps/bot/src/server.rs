//! Webhook receiver and static chart hosting.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::AppContext;
use crate::command;
use crate::line::{WebhookBody, signature};

/// Body of every callback response. The HTTP status is always 200.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Status {
    pub status: &'static str,
}

impl Status {
    const OK: Status = Status { status: "ok" };
    const INVALID_SIGNATURE: Status = Status {
        status: "invalid signature",
    };
    const INVALID_BODY: Status = Status {
        status: "invalid body",
    };
}

pub fn router(ctx: Arc<AppContext>) -> Router {
    let charts = ServeDir::new(ctx.charts.dir());

    Router::new()
        .route("/health", get(health))
        .route("/callback", post(callback))
        .nest_service("/static", charts)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Status> {
    Json(Status::OK)
}

async fn callback(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Status> {
    let sig = headers
        .get(signature::HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !signature::verify(&ctx.config.channel_secret, &body, sig) {
        warn!(bytes = body.len(), "webhook signature mismatch");
        return Json(Status::INVALID_SIGNATURE);
    }

    let payload: WebhookBody = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "webhook body not understood");
            return Json(Status::INVALID_BODY);
        }
    };

    info!(events = payload.events.len(), "webhook received");

    for event in payload.events {
        if let Err(e) = command::dispatch(&ctx, event).await {
            error!(error = ?e, "event handling failed");
        }
    }

    Json(Status::OK)
}
