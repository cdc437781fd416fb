//! HTTP relay transport: outbound POST of envelopes, inbound `/submit` endpoint.
//!
//! ```text
//! POST /submit   body: Envelope   → 200 {"status":"delivered"}
//!                                   401 bad signature
//!                                   404 envelope addressed to someone else
//!                                   503 agent inbox closed
//! GET  /         → {"address": "..."}
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use reqwest::Client;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Envelope, Relay, RelayError};
use crate::config::Config;
use crate::error::AppError;
use crate::identity::Identity;
use crate::runtime::{Component, ComponentFuture};

// ── Outbound ──────────────────────────────────────────────────────────────────

/// Upper bound on endpoints learned from inbound envelopes.
const MAX_LEARNED_ENDPOINTS: usize = 256;

#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: Client,
    /// Configured address -> `/submit` URL. Never overridden by learning.
    book: Arc<HashMap<String, String>>,
    /// Endpoints advertised by verified senders, at most [`MAX_LEARNED_ENDPOINTS`].
    learned: Arc<RwLock<HashMap<String, String>>>,
}

impl HttpRelay {
    pub fn new(timeout_seconds: u64, endpoints: HashMap<String, String>) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| RelayError::Delivery {
                target: "-".into(),
                detail: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, book: Arc::new(endpoints), learned: Arc::default() })
    }

    /// Address book = `[relay.endpoints]` plus the locally configured agents,
    /// whose addresses are derived from their seeds.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let mut endpoints = config.relay.endpoints.clone();
        for agent in [&config.agents.creator.agent, &config.agents.client.agent, &config.agents.vocab.agent] {
            let identity = Identity::from_seed(&agent.seed)?;
            endpoints
                .entry(identity.address().to_string())
                .or_insert_with(|| agent.endpoint.clone());
        }
        Self::new(config.relay.timeout_seconds, endpoints).map_err(|e| AppError::Relay(e.to_string()))
    }

    pub fn endpoint_for(&self, address: &str) -> Option<String> {
        if let Some(endpoint) = self.book.get(address) {
            return Some(endpoint.clone());
        }
        self.learned.read().unwrap_or_else(|p| p.into_inner()).get(address).cloned()
    }

    /// Remember `endpoint` for a verified `address`. Configured addresses
    /// keep their configured endpoint; new addresses are ignored once the
    /// learned book is full.
    pub fn learn(&self, address: &str, endpoint: &str) {
        if self.book.contains_key(address) {
            return;
        }
        let mut learned = self.learned.write().unwrap_or_else(|p| p.into_inner());
        match learned.get(address) {
            Some(known) if known == endpoint => {}
            None if learned.len() >= MAX_LEARNED_ENDPOINTS => {
                warn!(%address, limit = MAX_LEARNED_ENDPOINTS, "learned endpoint book is full; not remembering peer");
            }
            _ => {
                debug!(%address, %endpoint, "learned peer endpoint");
                learned.insert(address.to_string(), endpoint.to_string());
            }
        }
    }

    pub async fn deliver(&self, envelope: Envelope) -> Result<(), RelayError> {
        let target = envelope.target.clone();
        let endpoint = self
            .endpoint_for(&target)
            .ok_or_else(|| RelayError::UnknownTarget(target.clone()))?;

        debug!(%target, %endpoint, schema = %envelope.schema, "http delivery");

        let response = self.client.post(&endpoint).json(&envelope).send().await.map_err(|e| {
            if e.is_timeout() {
                RelayError::Timeout(target.clone())
            } else {
                RelayError::Delivery { target: target.clone(), detail: e.to_string() }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read error body>".to_string());
        Err(RelayError::Rejected { target, status: status.as_u16(), detail })
    }
}

// ── Inbound ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct InboundState {
    address: Arc<str>,
    inbox: mpsc::Sender<Envelope>,
    relay: Relay,
}

/// Router accepting envelopes for `address` and pushing them into `inbox`.
pub fn build_inbound_router(address: &str, inbox: mpsc::Sender<Envelope>, relay: Relay) -> Router {
    let state = InboundState { address: Arc::from(address), inbox, relay };
    Router::new()
        .route("/", get(index))
        .route("/submit", post(submit))
        .with_state(state)
}

async fn index(State(state): State<InboundState>) -> Response {
    Json(json!({ "address": &*state.address })).into_response()
}

async fn submit(State(state): State<InboundState>, Json(envelope): Json<Envelope>) -> Response {
    if envelope.target != *state.address {
        warn!(target = %envelope.target, "envelope addressed to another agent");
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown_target", "message": format!("not {}", envelope.target) })),
        )
            .into_response();
    }

    if let Err(e) = envelope.verify() {
        warn!(sender = %envelope.sender, error = %e, "rejecting envelope");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "bad_signature", "message": e.to_string() })),
        )
            .into_response();
    }

    if let Some(endpoint) = &envelope.sender_endpoint {
        state.relay.learn(&envelope.sender, endpoint);
    }

    match state.inbox.send(envelope).await {
        Ok(()) => Json(json!({ "status": "delivered" })).into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "inbox_closed", "message": "agent is shutting down" })),
        )
            .into_response(),
    }
}

/// Component serving the inbound router on `bind`.
pub struct InboundEndpoint {
    id: String,
    bind: String,
    router: Router,
}

impl InboundEndpoint {
    pub fn new(
        id: impl Into<String>,
        bind: impl Into<String>,
        address: &str,
        inbox: mpsc::Sender<Envelope>,
        relay: Relay,
    ) -> Self {
        Self {
            id: id.into(),
            bind: bind.into(),
            router: build_inbound_router(address, inbox, relay),
        }
    }
}

impl Component for InboundEndpoint {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(async move {
            let listener = TcpListener::bind(&self.bind)
                .await
                .map_err(|e| AppError::Relay(format!("bind failed on {}: {e}", self.bind)))?;

            info!(id = %self.id, bind = %self.bind, "relay endpoint listening");

            axum::serve(listener, self.router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .map_err(|e| AppError::Relay(format!("relay endpoint error: {e}")))?;

            info!(id = %self.id, "relay endpoint shut down");
            Ok(())
        })
    }
}
