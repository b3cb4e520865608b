//! Command endpoint.

use super::AppState;
use crate::commands::CommandSender;
use crate::utils::color::strip_color;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub handled: bool,

    /// Replies sent before the request returned
    pub messages: Vec<String>,
}

/// An HTTP client issuing a command. Replies that arrive after the response
/// (backup completion) only reach the log.
struct HttpSender {
    authorized: bool,
    messages: Mutex<Vec<String>>,
}

impl HttpSender {
    fn new(authorized: bool) -> Self {
        Self {
            authorized,
            messages: Mutex::new(Vec::new()),
        }
    }

    fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl CommandSender for HttpSender {
    fn name(&self) -> &str {
        "HTTP"
    }

    fn has_permission(&self, _permission: &str) -> bool {
        self.authorized
    }

    fn send_message(&self, message: &str) {
        let message = strip_color(message);
        tracing::info!("[HTTP] {}", message);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }
}

/// POST /command - Dispatch a command
pub async fn run_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CommandRequest>,
) -> (StatusCode, Json<CommandResponse>) {
    let authorized = is_authorized(&headers, state.token.as_deref());
    let sender = Arc::new(HttpSender::new(authorized));

    let handled = state
        .dispatcher
        .dispatch(sender.clone(), &req.command, &req.args);

    let status = if handled {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };

    (
        status,
        Json(CommandResponse {
            handled,
            messages: sender.messages(),
        }),
    )
}

/// Without a configured token nobody is authorized.
fn is_authorized(headers: &HeaderMap, token: Option<&str>) -> bool {
    let Some(token) = token else {
        return false;
    };

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|presented| tokens_match(presented.as_bytes(), token.as_bytes()))
}

/// Compare without exiting early on the first differing byte.
fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
