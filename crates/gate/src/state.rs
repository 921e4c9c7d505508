// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use marquee_session::clock::Clock;
use marquee_session::provider::IdentityProvider;

use crate::auth::AuthGate;
use crate::config::GateConfig;
use crate::cors::CorsGuard;
use crate::guard::{matches_prefix, RequestGuard};
use crate::rate_limit::RateLimiter;

/// Shared gate state. Built once at startup and handed to every layer.
pub struct GateState {
    pub config: GateConfig,
    pub cors: CorsGuard,
    pub limiter: RateLimiter,
    /// Tighter budget for credential-handling endpoints.
    pub strict_limiter: RateLimiter,
    pub auth: AuthGate,
    pub guard: RequestGuard,
}

impl GateState {
    pub fn new(config: GateConfig, provider: Arc<dyn IdentityProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cors: CorsGuard::new(config.allowed_origins.iter().cloned()),
            limiter: RateLimiter::new(config.lenient_limit(), Arc::clone(&clock)),
            strict_limiter: RateLimiter::new(config.strict_limit(), Arc::clone(&clock)),
            auth: AuthGate::new(provider),
            guard: RequestGuard::new(config.guard_config(), clock),
            config,
        }
    }

    /// The limiter that meters `path`.
    pub fn limiter_for(&self, path: &str) -> &RateLimiter {
        if self.config.strict_prefixes.iter().any(|p| matches_prefix(path, p)) {
            &self.strict_limiter
        } else {
            &self.limiter
        }
    }
}
