//! HTTP API for the external web backend.
//!
//! ```text
//! GET  /           → {"message": "Vocabulary Generation API is running."}
//! POST /generate   body: {"word": "..."} → VocabOutput
//!                  500 {"detail": "Failed to generate vocabulary data."}
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::AppError;
use crate::publishing::VocabGenerator;
use crate::runtime::{Component, ComponentFuture};

pub const ROOT_MESSAGE: &str = "Vocabulary Generation API is running.";
pub const GENERATE_FAILED_DETAIL: &str = "Failed to generate vocabulary data.";

#[derive(Debug, Deserialize)]
pub struct WordInput {
    pub word: String,
}

pub fn build_router(generator: VocabGenerator) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/generate", post(generate))
        .with_state(Arc::new(generator))
}

async fn root() -> Response {
    Json(json!({ "message": ROOT_MESSAGE })).into_response()
}

async fn generate(State(generator): State<Arc<VocabGenerator>>, Json(input): Json<WordInput>) -> Response {
    info!(word = %input.word, "/generate request");
    match generator.generate(&input.word).await {
        Some(record) => {
            info!(word = %input.word, "/generate succeeded");
            Json(record).into_response()
        }
        None => {
            error!(word = %input.word, "/generate failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": GENERATE_FAILED_DETAIL }))).into_response()
        }
    }
}

/// Component serving [`build_router`] on `bind`.
pub struct ApiServer {
    bind: String,
    router: Router,
}

impl ApiServer {
    pub fn new(bind: impl Into<String>, generator: VocabGenerator) -> Self {
        Self { bind: bind.into(), router: build_router(generator) }
    }
}

impl Component for ApiServer {
    fn id(&self) -> &str {
        "api"
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(async move {
            let listener = TcpListener::bind(&self.bind)
                .await
                .map_err(|e| AppError::Api(format!("bind failed on {}: {e}", self.bind)))?;

            info!(bind = %self.bind, "api listening");

            axum::serve(listener, self.router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .map_err(|e| AppError::Api(format!("api server error: {e}")))?;

            info!("api shut down");
            Ok(())
        })
    }
}
