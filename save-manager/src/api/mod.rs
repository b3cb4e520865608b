//! HTTP control API.

pub mod command;
pub mod health;

use crate::commands::CommandDispatcher;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<CommandDispatcher>,

    /// Bearer token that grants command permissions, if any
    pub token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(dispatcher: Arc<CommandDispatcher>, token: Option<String>) -> Self {
        Self {
            dispatcher,
            token: token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/command", post(command::run_command))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
