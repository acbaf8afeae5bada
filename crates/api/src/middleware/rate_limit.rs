//! Per-user rate limiting for the redemption endpoints.
//!
//! Slows down brute-force guessing of loyalty codes: each authenticated
//! user gets their own token bucket.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::AuthContext;
use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use serde_json::json;
use std::{
    num::NonZeroU32,
    sync::atomic::{AtomicU64, Ordering},
};
use uuid::Uuid;

use crate::app::AppState;

/// Stale buckets are swept once every this many checks.
const SWEEP_INTERVAL: u64 = 1024;

type UserRateLimiter<C> =
    RateLimiter<Uuid, DefaultKeyedStateStore<Uuid>, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Token buckets keyed by user id.
///
/// A bucket that has fully refilled is indistinguishable from a fresh one, so
/// the periodic sweep drops it and memory tracks recently active users only.
pub struct RateLimiterState<C: Clock = DefaultClock> {
    limiter: UserRateLimiter<C>,
    clock: C,
    rate_limit_per_minute: u32,
    checks: AtomicU64,
}

impl RateLimiterState {
    pub fn new(rate_limit_per_minute: u32) -> Self {
        Self::with_clock(rate_limit_per_minute, DefaultClock::default())
    }
}

impl<C: Clock + Clone> RateLimiterState<C> {
    pub fn with_clock(rate_limit_per_minute: u32, clock: C) -> Self {
        let per_minute = NonZeroU32::new(rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::new(
            Quota::per_minute(per_minute),
            DefaultKeyedStateStore::default(),
            clock.clone(),
        );
        Self {
            limiter,
            clock,
            rate_limit_per_minute,
            checks: AtomicU64::new(0),
        }
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// `Err` carries the Retry-After value in seconds (at least 1).
    pub fn check(&self, user_id: Uuid) -> Result<(), u64> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep();
        }

        self.limiter.check_key(&user_id).map_err(|not_until| {
            not_until
                .wait_time_from(self.clock.now())
                .as_secs()
                .max(1)
        })
    }

    /// Drops buckets of users who have not been limited recently.
    pub fn sweep(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn active_users(&self) -> usize {
        self.limiter.len()
    }
}

impl<C: Clock + Clone> std::fmt::Debug for RateLimiterState<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("active_users", &self.active_users())
            .finish()
    }
}

/// Applies the per-user limit. Must be layered inside `require_user_auth`.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (Some(limiter), Some(ctx)) = (
        state.rate_limiter.as_ref(),
        req.extensions().get::<AuthContext>().copied(),
    ) else {
        return next.run(req).await;
    };

    if let Err(retry_after) = limiter.check(ctx.user_id) {
        tracing::warn!(user_id = %ctx.user_id, retry_after, "Rate limit exceeded");
        return rate_limited_response(limiter.rate_limit_per_minute(), retry_after);
    }

    next.run(req).await
}

fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limited",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retry_after": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));

    response
}
