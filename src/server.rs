//! # Notification Server
//!
//! An `axum` server that accepts event payloads over HTTP and answers with
//! the JSON outcome of the notification pipeline.
//!
//! - `POST /` and `POST /notify`: run one invocation
//! - `GET /healthz`: liveness
//! - `GET /metrics`: Prometheus exposition, only when metrics are enabled

use crate::core::NotifyOutcome;
use crate::error::NotifyError;
use crate::pipeline::NotificationPipeline;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, trace};

/// Shared state for the notification routes.
#[derive(Clone)]
pub struct ServerState {
    pub pipeline: Arc<NotificationPipeline>,
    pub prom_handle: Option<PrometheusHandle>,
}

/// The HTTP rendering of one invocation's result.
#[derive(Debug)]
pub struct NotifyResponse(pub Result<NotifyOutcome, NotifyError>);

impl IntoResponse for NotifyResponse {
    fn into_response(self) -> Response {
        match self.0 {
            Ok(NotifyOutcome::NoRecipients) => (
                StatusCode::OK,
                Json(json!({ "message": "No users to notify." })),
            )
                .into_response(),
            Ok(NotifyOutcome::Delivered(data)) => {
                (StatusCode::OK, Json(json!({ "data": data }))).into_response()
            }
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response(),
        }
    }
}

/// POST /notify
///
/// The pipeline runs on its own task so a panic becomes an `Unexpected`
/// error response instead of a dropped connection. A body that cannot be
/// read (e.g. over the size limit) is answered as a malformed payload.
async fn notify(
    State(state): State<ServerState>,
    body: Result<Bytes, BytesRejection>,
) -> NotifyResponse {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = NotifyError::MalformedPayload(rejection.body_text());
            error!(kind = err.kind(), "Rejected inbound body: {}", err);
            return NotifyResponse(Err(err));
        }
    };
    let pipeline = state.pipeline.clone();
    let result = match tokio::spawn(async move { pipeline.run(&body).await }).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Notification task failed");
            Err(NotifyError::Unexpected(e.to_string()))
        }
    };
    NotifyResponse(result)
}

/// GET /metrics
async fn render_metrics(State(state): State<ServerState>) -> Response {
    match &state.prom_handle {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Build the notification routes.
pub fn router(state: ServerState) -> Router {
    let mut router = Router::new()
        .route("/", post(notify))
        .route("/notify", post(notify))
        .route("/healthz", get(|| async { "ok" }));
    if state.prom_handle.is_some() {
        router = router.route("/metrics", get(render_metrics));
    }
    router.with_state(state)
}

/// Serves the notification routes on an already-bound listener.
pub struct NotificationServer {
    listener: TcpListener,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
}

impl NotificationServer {
    pub fn new(listener: TcpListener, state: ServerState, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            router: router(state),
            shutdown_rx,
        }
    }

    /// Returns a future that serves requests until a shutdown signal is received.
    /// In-flight invocations are allowed to finish.
    pub fn run(self) -> impl Future<Output = ()> {
        let Self {
            listener,
            router,
            mut shutdown_rx,
        } = self;
        async move {
            let shutdown = async move {
                let _ = shutdown_rx.changed().await;
                trace!("Notification server received shutdown signal.");
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Notification server error: {}", e);
            }
            trace!("Notification server task finished.");
        }
    }
}
