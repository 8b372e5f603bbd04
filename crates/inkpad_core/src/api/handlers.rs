//! Flow handlers for the assistant endpoints and their governed routing.
//!
//! # Responsibility
//! - Enforce the authenticated principal and parse JSON bodies.
//! - Delegate to [`AssistantService`] and map its outcome to an [`ApiResponse`].
//!
//! # Invariants
//! - Note flows without a principal get 401 before any service work; the
//!   ping health check is open.
//! - Every route in [`AssistantRoutes`] sits behind a [`RequestGovernor`]
//!   sharing one limiter, with a distinct scope per route.

use crate::ai::completion::{CompletionProvider, Sleeper, TokioSleeper};
use crate::api::{
    ApiRequest, ApiResponse, RequestHandler, STATUS_BAD_REQUEST, STATUS_INTERNAL_ERROR,
    STATUS_UNAUTHORIZED,
};
use crate::governance::governor::RequestGovernor;
use crate::governance::rate_limiter::{Clock, RateLimiter, SystemClock};
use crate::model::note::NoteId;
use crate::service::assistant_service::{AssistantError, AssistantService};
use async_trait::async_trait;
use log::error;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteTarget {
    note_id: NoteId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    note_id: Option<NoteId>,
}

fn require_principal(request: &ApiRequest) -> Result<&str, ApiResponse> {
    request
        .principal
        .as_deref()
        .filter(|owner| !owner.trim().is_empty())
        .ok_or_else(|| ApiResponse::error(STATUS_UNAUTHORIZED, "Unauthorized"))
}

fn parse_body<T: DeserializeOwned>(request: &ApiRequest) -> Result<T, ApiResponse> {
    T::deserialize(&request.body)
        .map_err(|_| ApiResponse::error(STATUS_BAD_REQUEST, "Invalid request body"))
}

fn failure(route: &str, err: AssistantError) -> ApiResponse {
    let status = err.status_code();
    if status >= STATUS_INTERNAL_ERROR {
        error!(
            "event=route_failed module=api status=error route={} error={}",
            route, err
        );
    }
    ApiResponse::error(status, err.to_string())
}

/// `POST tags`: generate and link labels for a note.
pub struct TagsHandler<P, S = TokioSleeper> {
    service: Arc<AssistantService<P, S>>,
}

impl<P, S> TagsHandler<P, S> {
    pub fn new(service: Arc<AssistantService<P, S>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<P: CompletionProvider + 'static, S: Sleeper + 'static> RequestHandler for TagsHandler<P, S> {
    async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let owner_id = match require_principal(&request) {
            Ok(owner_id) => owner_id,
            Err(response) => return response,
        };
        let target: NoteTarget = match parse_body(&request) {
            Ok(target) => target,
            Err(response) => return response,
        };
        match self.service.generate_tags(owner_id, target.note_id).await {
            Ok(outcome) => ApiResponse::ok(&outcome),
            Err(err) => failure("tags", err),
        }
    }
}

/// `POST summarize`: summarize a note and store the summary.
pub struct SummarizeHandler<P, S = TokioSleeper> {
    service: Arc<AssistantService<P, S>>,
}

impl<P, S> SummarizeHandler<P, S> {
    pub fn new(service: Arc<AssistantService<P, S>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<P: CompletionProvider + 'static, S: Sleeper + 'static> RequestHandler
    for SummarizeHandler<P, S>
{
    async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let owner_id = match require_principal(&request) {
            Ok(owner_id) => owner_id,
            Err(response) => return response,
        };
        let target: NoteTarget = match parse_body(&request) {
            Ok(target) => target,
            Err(response) => return response,
        };
        match self.service.summarize(owner_id, target.note_id).await {
            Ok(outcome) => ApiResponse::ok(&outcome),
            Err(err) => failure("summarize", err),
        }
    }
}

/// `POST chat`: answer a message, optionally about one note.
pub struct ChatHandler<P, S = TokioSleeper> {
    service: Arc<AssistantService<P, S>>,
}

impl<P, S> ChatHandler<P, S> {
    pub fn new(service: Arc<AssistantService<P, S>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<P: CompletionProvider + 'static, S: Sleeper + 'static> RequestHandler for ChatHandler<P, S> {
    async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let owner_id = match require_principal(&request) {
            Ok(owner_id) => owner_id,
            Err(response) => return response,
        };
        let body: ChatBody = match parse_body(&request) {
            Ok(body) => body,
            Err(response) => return response,
        };
        match self.service.chat(owner_id, &body.message, body.note_id).await {
            Ok(outcome) => ApiResponse::ok(&outcome),
            Err(err) => failure("chat", err),
        }
    }
}

/// `GET ping`: provider health check. Needs no principal.
pub struct PingHandler<P, S = TokioSleeper> {
    service: Arc<AssistantService<P, S>>,
}

impl<P, S> PingHandler<P, S> {
    pub fn new(service: Arc<AssistantService<P, S>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<P: CompletionProvider + 'static, S: Sleeper + 'static> RequestHandler for PingHandler<P, S> {
    async fn handle(&self, _request: ApiRequest) -> ApiResponse {
        match self.service.ping().await {
            Ok(outcome) => ApiResponse::ok(&outcome),
            Err(err) => {
                error!(
                    "event=route_failed module=api status=error route=ping error={}",
                    err
                );
                ApiResponse::json(
                    STATUS_INTERNAL_ERROR,
                    json!({ "ok": false, "error": err.to_string() }),
                )
            }
        }
    }
}

/// The assistant endpoints, each wrapped in its own governor.
pub struct AssistantRoutes<P, S = TokioSleeper, C: Clock = SystemClock> {
    pub tags: RequestGovernor<TagsHandler<P, S>, C>,
    pub summarize: RequestGovernor<SummarizeHandler<P, S>, C>,
    pub chat: RequestGovernor<ChatHandler<P, S>, C>,
    pub ping: RequestGovernor<PingHandler<P, S>, C>,
}

impl<P: CompletionProvider, S: Sleeper, C: Clock> AssistantRoutes<P, S, C> {
    /// Builds all routes over one service and one shared limiter, taking
    /// policies from the service configuration.
    pub fn new(service: Arc<AssistantService<P, S>>, limiter: Arc<RateLimiter<C>>) -> Self {
        let config = service.config().clone();
        Self {
            tags: RequestGovernor::new(
                TagsHandler::new(Arc::clone(&service)),
                config.tags.policy,
                Arc::clone(&limiter),
            ),
            summarize: RequestGovernor::new(
                SummarizeHandler::new(Arc::clone(&service)),
                config.summarize.policy,
                Arc::clone(&limiter),
            ),
            chat: RequestGovernor::new(
                ChatHandler::new(Arc::clone(&service)),
                config.chat.policy,
                Arc::clone(&limiter),
            ),
            ping: RequestGovernor::new(PingHandler::new(service), config.ping, limiter),
        }
    }
}
