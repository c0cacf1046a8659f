// [libs/core/sdk/src/webhook.rs]
/*!
 * APARATO: SERVIDOR WEBHOOK (V1.1 - DETECCION DE VIDA)
 * CLASIFICACIÓN: SUPERFICIE DE ENTRADA (ESTRATO L5)
 * RESPONSABILIDAD: UNICO TRAFICO ENTRANTE QUE EL NODO ACEPTA
 *
 * Cada handler es de vida corta — `/webhook` solo agrega a la
 * bitacora entrante y deja que `BrokerClient::receive` dispare el eco
 * de confirmacion. `/healthz` reporta "failed" si la tarea principal
 * de analisis murio sin auto-marcarse terminada.
 */

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use flame_broker_client::BrokerClient;
use flame_domain_models::{Message, RunState};
use flame_storage_client::StorageClient;
use flame_telemetry::Logger;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::token::remaining_seconds;

/// Fixed local port the webhook server binds to (spec.md §4.1).
pub const WEBHOOK_PORT: u16 = 8000;

pub struct WebhookState {
    pub broker: Option<Arc<BrokerClient>>,
    pub storage_client: Option<Arc<StorageClient>>,
    pub logger: Arc<Logger>,
    pub finished: Arc<AtomicBool>,
    pub analysis_alive: Arc<AtomicBool>,
    pub token: RwLock<String>,
}

impl WebhookState {
    /// Inbound deliveries set the finished flag directly on
    /// `analysis_finished`; everything else asks the logger for its
    /// run status, which the facade is the sole writer of. A main
    /// analysis task that ends — panics or returns early — without
    /// ever setting `finished` clears `analysis_alive` via
    /// `AnalysisLivenessGuard`'s `Drop`, which this reports as `failed`
    /// (spec.md §7) rather than leaving the endpoint stuck on whatever
    /// status the logger last recorded.
    fn status_label(&self) -> &'static str {
        if self.broker.is_none() {
            return "stuck";
        }
        if self.finished.load(Ordering::SeqCst) {
            return "finished";
        }
        if !self.analysis_alive.load(Ordering::SeqCst) {
            return "failed";
        }
        match self.logger.run_status() {
            RunState::Stuck => "stuck",
            RunState::Failed => "failed",
            RunState::Finished => "finished",
            RunState::Starting | RunState::Running => "running",
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    progress: u8,
    token_remaining_seconds: i64,
}

async fn healthz(State(state): State<Arc<WebhookState>>) -> impl IntoResponse {
    let token_remaining_seconds = remaining_seconds(&state.token.read().unwrap()).unwrap_or(0);
    Json(HealthResponse { status: state.status_label(), progress: state.logger.progress().value(), token_remaining_seconds })
}

async fn webhook(State(state): State<Arc<WebhookState>>, Json(message): Json<Message>) -> impl IntoResponse {
    let Some(broker) = state.broker.as_ref() else {
        return StatusCode::SERVICE_UNAVAILABLE;
    };

    let category = message.meta.category.clone();
    info!(sender = %message.meta.sender, category, "received webhook delivery");
    if let Err(err) = broker.receive(message).await {
        error!(error = %err, "failed to record inbound webhook delivery");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    if category == "analysis_finished" {
        state.finished.store(true, Ordering::SeqCst);
    }
    StatusCode::OK
}

#[derive(Deserialize)]
struct TokenRefreshBody {
    token: Option<String>,
}

/// Updates the platform token in every client holding one (spec.md
/// §4.1). The data client carries only the data-source token, which
/// this endpoint never touches.
async fn token_refresh(State(state): State<Arc<WebhookState>>, Json(body): Json<TokenRefreshBody>) -> impl IntoResponse {
    let Some(token) = body.token.filter(|t| !t.is_empty()) else {
        return StatusCode::BAD_REQUEST;
    };

    if let Some(broker) = state.broker.as_ref() {
        broker.refresh_token(token.clone());
    }
    if let Some(storage) = state.storage_client.as_ref() {
        storage.refresh_token(token.clone());
    }
    *state.token.write().unwrap() = token;
    StatusCode::OK
}

pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/webhook", post(webhook))
        .route("/token_refresh", post(token_refresh))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the webhook server on `0.0.0.0:{WEBHOOK_PORT}` and runs it
/// to completion (it never returns under normal operation).
pub async fn serve(state: Arc<WebhookState>) {
    let addr = SocketAddr::new("0.0.0.0".parse::<IpAddr>().unwrap(), WEBHOOK_PORT);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, "failed to bind the webhook port");
            return;
        }
    };
    info!(%addr, "webhook server listening");
    if let Err(err) = axum::serve(listener, router(state)).await {
        error!(error = %err, "webhook server terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use flame_domain_models::MessageMeta;
    use serde_json::Map;
    use tower::ServiceExt;

    fn state_without_broker() -> Arc<WebhookState> {
        Arc::new(WebhookState {
            broker: None,
            storage_client: None,
            logger: Arc::new(Logger::new()),
            finished: Arc::new(AtomicBool::new(false)),
            analysis_alive: Arc::new(AtomicBool::new(true)),
            token: RwLock::new("tok".into()),
        })
    }

    fn state_with_broker() -> Arc<WebhookState> {
        let broker = Arc::new(BrokerClient::new("http://broker.invalid", "analysis-1", "tok"));
        broker.set_self_node_id("node-a".into());
        Arc::new(WebhookState {
            broker: Some(broker),
            storage_client: None,
            logger: Arc::new(Logger::new()),
            finished: Arc::new(AtomicBool::new(false)),
            analysis_alive: Arc::new(AtomicBool::new(true)),
            token: RwLock::new("tok".into()),
        })
    }

    #[tokio::test]
    async fn healthz_reports_stuck_when_no_broker_is_attached() {
        let app = router(state_without_broker());
        let response = app.oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "stuck");
    }

    #[tokio::test]
    async fn webhook_finishes_the_node_on_analysis_finished() {
        let state = state_with_broker();
        let finished = state.finished.clone();
        let app = router(state);

        let meta = MessageMeta::new_outgoing("aggregator", 1, "analysis_finished", "r1");
        let message = Message::new(meta, Map::new());
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&message).unwrap()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn healthz_reports_failed_once_the_analysis_task_dies_without_finishing() {
        let state = state_with_broker();
        state.analysis_alive.store(false, Ordering::SeqCst);
        let app = router(state);
        let response = app.oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap()).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "failed");
    }

    #[tokio::test]
    async fn token_refresh_rejects_a_body_with_no_token() {
        let app = router(state_with_broker());
        let request = Request::builder()
            .method("POST")
            .uri("/token_refresh")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
