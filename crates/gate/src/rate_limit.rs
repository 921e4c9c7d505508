// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-client request admission over a trailing time window.
//!
//! Buckets live in one process-wide [`DashMap`] shared by every handler.
//! Concurrent checks for the same client serialize on that client's shard, but
//! the limit is treated as approximate: nothing outside the map is locked and
//! cleanup happens opportunistically on a random fraction of calls.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tracing::{debug, warn};

use marquee_session::clock::Clock;
use marquee_session::error::ErrorCode;

use crate::error::GateError;
use crate::state::GateState;

/// Window and budget for one limiter instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: usize,
    /// Chance in `[0, 1]` that a call also sweeps idle buckets.
    pub sweep_probability: f64,
}

impl RateLimitConfig {
    fn window_ms(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Fixed-window counter keyed by client identifier.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, VecDeque<u64>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, buckets: DashMap::new(), clock }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit or reject one request from `identifier`. Rejections are not recorded.
    pub fn check(&self, identifier: &str) -> bool {
        let now = self.clock.now_ms();
        let window_ms = self.config.window_ms();
        let admitted = {
            let mut bucket = self.buckets.entry(identifier.to_owned()).or_default();
            prune(&mut bucket, now, window_ms);
            if bucket.len() >= self.config.max_requests {
                false
            } else {
                bucket.push_back(now);
                true
            }
        };

        // The bucket guard above is released; sweeping takes every shard lock.
        if self.should_sweep() {
            self.sweep();
        }
        admitted
    }

    /// Time until `identifier` gets another slot, if it is currently full.
    pub fn retry_after(&self, identifier: &str) -> Option<Duration> {
        let now = self.clock.now_ms();
        let bucket = self.buckets.get(identifier)?;
        if bucket.len() < self.config.max_requests {
            return None;
        }
        let oldest = *bucket.front()?;
        let free_at = oldest.saturating_add(self.config.window_ms()).saturating_add(1);
        Some(Duration::from_millis(free_at.saturating_sub(now)))
    }

    /// Drop identifiers with no requests inside the window.
    pub fn sweep(&self) {
        let now = self.clock.now_ms();
        let window_ms = self.config.window_ms();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            prune(bucket, now, window_ms);
            !bucket.is_empty()
        });
        debug!(before, after = self.buckets.len(), "rate limit sweep");
    }

    /// Number of tracked identifiers.
    pub fn tracked(&self) -> usize {
        self.buckets.len()
    }

    fn should_sweep(&self) -> bool {
        let p = self.config.sweep_probability;
        p > 0.0 && rand::random::<f64>() < p
    }
}

/// Keep only timestamps inside `[now - window, now]`.
fn prune(bucket: &mut VecDeque<u64>, now: u64, window_ms: u64) {
    let floor = now.saturating_sub(window_ms);
    while bucket.front().is_some_and(|&t| t < floor) {
        bucket.pop_front();
    }
}

/// Who is asking: the first forwarded address, then the connection address.
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(addr) = forwarded {
        return addr.to_owned();
    }
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(addr) = real_ip {
        return addr.to_owned();
    }
    peer.map(|p| p.ip().to_string()).unwrap_or_else(|| "unknown".to_owned())
}

/// Axum middleware that meters API requests per client.
///
/// Paths under a strict prefix use the strict limiter, everything else the
/// lenient one.
pub async fn rate_limit_layer(state: State<Arc<GateState>>, req: Request, next: Next) -> Response {
    let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0);
    let client = client_identifier(req.headers(), peer);
    let limiter = state.limiter_for(req.uri().path());

    if limiter.check(&client) {
        return next.run(req).await;
    }

    warn!(client = %client, path = %req.uri().path(), "rate limit exceeded");
    let mut resp =
        GateError::new(ErrorCode::RateLimitExceeded, "too many requests, slow down").into_response();
    if let Some(after) = limiter.retry_after(&client) {
        let secs = after.as_millis().div_ceil(1000).max(1);
        if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
            resp.headers_mut().insert(RETRY_AFTER, value);
        }
    }
    resp
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
