//! axum routes for the passcode relay.
//!
//! - `GET /passcode` (and `GET /`) - next passcode as plain text, or
//!   `out of codes`.
//! - `POST /sms` - inbound SMS webhook. Always answered with an empty TwiML
//!   document, whatever happened to the message.
//! - `GET /health` - liveness probe.
//!
//! Store calls do blocking file I/O, so they run on the blocking thread pool.

use super::{
    Store,
    dispense::DispenseAdapter,
    ingest::{InboundMessage, IngestAdapter},
    origin::{OriginPolicy, TAB_URL_HEADER, request_origin},
};
use crate::server::{config::ServerConfig, error::ApiError};
use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, HeaderName, Method, header},
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Reply to every inbound webhook: acknowledge and send nothing back.
pub const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

/// Shared state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    ingest: Arc<IngestAdapter>,
    dispense: Arc<DispenseAdapter>,
}

impl AppState {
    /// Wires both adapters to the same store.
    pub fn new(store: Arc<Store>, config: &ServerConfig) -> Self {
        let ingest = IngestAdapter::new(
            Arc::clone(&store),
            config.ingest_marker.clone(),
            config.account_sid.clone(),
        );
        let dispense = DispenseAdapter::new(
            store,
            OriginPolicy::from_pattern(config.allowed_origin.clone()),
        );
        Self {
            ingest: Arc::new(ingest),
            dispense: Arc::new(dispense),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([HeaderName::from_static(TAB_URL_HEADER), header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(get_passcode))
        .route("/passcode", get(get_passcode))
        .route("/sms", post(post_sms))
        .route("/health", get(get_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_passcode(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<String, ApiError> {
    let origin = request_origin(&headers).map(str::to_owned);
    let dispense = Arc::clone(&state.dispense);
    tokio::task::spawn_blocking(move || dispense.dispense(origin.as_deref())).await?
}

async fn post_sms(
    State(state): State<AppState>,
    message: Result<Form<InboundMessage>, FormRejection>,
) -> impl IntoResponse {
    match message {
        Ok(Form(message)) => {
            let ingest = Arc::clone(&state.ingest);
            let outcome =
                tokio::task::spawn_blocking(move || ingest.ingest_message(&message)).await;
            if let Err(e) = outcome {
                tracing::error!("Ingest task failed: {e}");
            }
        }
        Err(rejection) => {
            tracing::warn!("Discarding unreadable webhook: {rejection}");
        }
    }
    ([(header::CONTENT_TYPE, "application/xml")], EMPTY_TWIML)
}

async fn get_health() -> &'static str {
    "ok"
}
