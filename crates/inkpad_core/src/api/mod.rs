//! Transport-neutral request/response boundary for governed handlers.
//!
//! # Responsibility
//! - Carry the pieces of an inbound call the AI flows need: headers, the
//!   authenticated principal and a JSON body.
//! - Define the async handler seam that governors and flow handlers share.
//!
//! # Invariants
//! - Header names are stored lower-cased.
//! - Error bodies always have the shape `{ "error": <message> }`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub mod handlers;

pub use handlers::{AssistantRoutes, ChatHandler, PingHandler, SummarizeHandler, TagsHandler};

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_UNAUTHORIZED: u16 = 401;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Inbound call as seen by a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiRequest {
    headers: BTreeMap<String, String>,
    /// Owner identity established by the external auth layer.
    pub principal: Option<String>,
    pub body: Value,
}

impl ApiRequest {
    pub fn new(body: Value) -> Self {
        Self {
            headers: BTreeMap::new(),
            principal: None,
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_principal(mut self, owner_id: impl Into<String>) -> Self {
        self.principal = Some(owner_id.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// HTTP-status-like outcome with a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// 200 with `payload` serialized; serialization failures become a 500.
    pub fn ok<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self::json(STATUS_OK, body),
            Err(err) => Self::error(STATUS_INTERNAL_ERROR, err.to_string()),
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "error": message.into() }))
    }

    /// Throttling outcome returned by the request governor.
    pub fn too_many_requests() -> Self {
        Self::error(STATUS_TOO_MANY_REQUESTS, "Too Many Requests")
    }

    /// Convenience accessor for `{ "error": ... }` bodies.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

/// Async request handler seam.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: ApiRequest) -> ApiResponse;
}
