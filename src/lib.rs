//! NautiCAI Mission Triage Service
//!
//! Turns the anomaly log of a subsea inspection run into a risk level, an
//! operator summary and, when warranted, a WhatsApp alert.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     NAUTIC TRIAGE                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌─────────────────────────────────────────┐ │
//! │  │  API      │   │  TriageEngine                           │ │
//! │  │  (Axum)   ├──►│  classify → compose → enhance → dispatch│ │
//! │  └─────┬─────┘   └───────────────┬──────────────┬──────────┘ │
//! │        ▼                         ▼              ▼            │
//! │  ┌─────────────┐          ┌────────────┐  ┌────────────┐     │
//! │  │SessionStore │          │  Gemini    │  │  Twilio    │     │
//! │  └─────────────┘          └────────────┘  └────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod models;

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};

use logic::session::SessionStore;
use logic::triage::TriageEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TriageEngine>,
    pub sessions: SessionStore,
    pub config: Config,
    /// Cancelled on shutdown. Each triage runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let engine = TriageEngine::from_config(&config);
        Self::with_engine(config, engine)
    }

    /// State around an explicitly built engine (tests, fake providers)
    pub fn with_engine(config: Config, engine: TriageEngine) -> Self {
        Self {
            sessions: SessionStore::new(engine.partition().clone()),
            engine: Arc::new(engine),
            config,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/health", get(handlers::health::check))
        .route("/api/agent/mission-summary", post(handlers::agent::mission_summary));

    let session_routes = Router::new()
        .route("/api/sessions", post(handlers::sessions::create))
        .route(
            "/api/sessions/:id",
            get(handlers::sessions::get)
                .put(handlers::sessions::replace)
                .delete(handlers::sessions::delete),
        )
        .route("/api/sessions/:id/merge", post(handlers::sessions::merge))
        .route("/api/sessions/:id/records/:index", axum::routing::delete(handlers::sessions::remove_record))
        .route("/api/sessions/:id/reset", post(handlers::sessions::reset))
        .route("/api/sessions/:id/triage", post(handlers::sessions::triage));

    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .merge(api_routes)
        .merge(session_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(origins)
}
