//! Admission gate in front of arbitrary request handlers.
//!
//! # Invariants
//! - A throttled call returns 429 and never reaches the wrapped handler.
//! - An admitted call returns the wrapped handler's outcome unchanged.
//! - Rate-limit keys are `<scope>:<client>` so scopes never share budgets.

use crate::api::{ApiRequest, ApiResponse, RequestHandler};
use crate::config::GovernancePolicy;
use crate::governance::rate_limiter::{Clock, RateLimiter, SystemClock};
use async_trait::async_trait;
use log::warn;
use std::sync::Arc;

/// Header consulted for the client address.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
/// Client identity used when no forwarded address is present.
pub const LOOPBACK_CLIENT: &str = "127.0.0.1";

/// Derives the client identity from the first forwarded-for entry.
pub fn client_identity(request: &ApiRequest) -> &str {
    request
        .header(FORWARDED_FOR_HEADER)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(LOOPBACK_CLIENT)
}

/// Composite bucket key for one scope and client.
pub fn admission_key(scope: &str, request: &ApiRequest) -> String {
    format!("{scope}:{}", client_identity(request))
}

/// Wraps a handler with per-client token-bucket admission.
pub struct RequestGovernor<H, C: Clock = SystemClock> {
    policy: GovernancePolicy,
    limiter: Arc<RateLimiter<C>>,
    inner: H,
}

impl<H, C: Clock> RequestGovernor<H, C> {
    pub fn new(inner: H, policy: GovernancePolicy, limiter: Arc<RateLimiter<C>>) -> Self {
        Self {
            policy,
            limiter,
            inner,
        }
    }

    pub fn policy(&self) -> &GovernancePolicy {
        &self.policy
    }
}

#[async_trait]
impl<H, C> RequestHandler for RequestGovernor<H, C>
where
    H: RequestHandler,
    C: Clock + 'static,
{
    async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let key = admission_key(&self.policy.scope, &request);
        if !self
            .limiter
            .admit(&key, self.policy.rate, self.policy.window_ms)
        {
            warn!(
                "event=rate_limited module=governance status=rejected scope={} rate={} window_ms={}",
                self.policy.scope, self.policy.rate, self.policy.window_ms
            );
            return ApiResponse::too_many_requests();
        }
        self.inner.handle(request).await
    }
}
