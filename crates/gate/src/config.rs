// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use marquee_session::provider::ProviderConfig;

use crate::guard::GuardConfig;
use crate::rate_limit::RateLimitConfig;

/// Log output format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for the marquee gate.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "marquee-gate", version, about = "Session and request gate for the marquee API")]
pub struct GateConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "MARQUEE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8787, env = "MARQUEE_PORT")]
    pub port: u16,

    /// Identity provider API endpoint.
    #[arg(long, default_value = "https://cloud.appwrite.io/v1", env = "MARQUEE_PROVIDER_ENDPOINT")]
    pub provider_endpoint: String,

    /// Identity provider project identifier.
    #[arg(long, env = "MARQUEE_PROVIDER_PROJECT")]
    pub provider_project: String,

    /// Upper bound on any identity provider call, in milliseconds.
    #[arg(long, default_value_t = 5000, env = "MARQUEE_PROVIDER_TIMEOUT_MS")]
    pub provider_timeout_ms: u64,

    /// Browser origins allowed to call the API with credentials.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "http://localhost:3000",
        env = "MARQUEE_ALLOWED_ORIGINS"
    )]
    pub allowed_origins: Vec<String>,

    /// Page prefixes that require a live credential.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "/dashboard,/watchlist,/profile,/settings",
        env = "MARQUEE_PROTECTED_PREFIXES"
    )]
    pub protected_prefixes: Vec<String>,

    /// Sign-in and sign-up prefixes; signed-in users are bounced to the landing route.
    #[arg(long, value_delimiter = ',', default_value = "/sign-in,/sign-up", env = "MARQUEE_ENTRY_PREFIXES")]
    pub entry_prefixes: Vec<String>,

    /// Static asset prefixes served with immutable cache headers.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "/_next/static,/static,/assets",
        env = "MARQUEE_STATIC_PREFIXES"
    )]
    pub static_prefixes: Vec<String>,

    /// Where unauthenticated users are sent.
    #[arg(long, default_value = "/sign-in", env = "MARQUEE_SIGN_IN_ROUTE")]
    pub sign_in_route: String,

    /// Where signed-in users land when they hit an entry route.
    #[arg(long, default_value = "/dashboard", env = "MARQUEE_LANDING_ROUTE")]
    pub landing_route: String,

    /// Name of the credential cookie.
    #[arg(long, default_value = marquee_session::store::DEFAULT_COOKIE_NAME, env = "MARQUEE_COOKIE_NAME")]
    pub cookie_name: String,

    /// Window of the default rate limiter, in milliseconds.
    #[arg(long, default_value_t = 60_000, env = "MARQUEE_RATE_WINDOW_MS")]
    pub rate_window_ms: u64,

    /// Requests admitted per window by the default rate limiter.
    #[arg(long, default_value_t = 100, env = "MARQUEE_RATE_MAX")]
    pub rate_max: usize,

    /// Window of the strict rate limiter, in milliseconds.
    #[arg(long, default_value_t = 60_000, env = "MARQUEE_STRICT_RATE_WINDOW_MS")]
    pub strict_rate_window_ms: u64,

    /// Requests admitted per window by the strict rate limiter.
    #[arg(long, default_value_t = 10, env = "MARQUEE_STRICT_RATE_MAX")]
    pub strict_rate_max: usize,

    /// API prefixes metered by the strict limiter.
    #[arg(long, value_delimiter = ',', default_value = "/api/v1/auth", env = "MARQUEE_STRICT_PREFIXES")]
    pub strict_prefixes: Vec<String>,

    /// Chance per request of sweeping idle rate-limit buckets.
    #[arg(long, default_value_t = 0.01, env = "MARQUEE_RATE_SWEEP_PROBABILITY")]
    pub rate_sweep_probability: f64,

    /// Directory of pre-rendered pages served behind the route guard.
    #[arg(long, env = "MARQUEE_WEB_ROOT")]
    pub web_root: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "MARQUEE_LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl GateConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            endpoint: self.provider_endpoint.clone(),
            project_id: self.provider_project.clone(),
            timeout: self.provider_timeout(),
        }
    }

    pub fn lenient_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            window: Duration::from_millis(self.rate_window_ms),
            max_requests: self.rate_max,
            sweep_probability: self.rate_sweep_probability,
        }
    }

    pub fn strict_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            window: Duration::from_millis(self.strict_rate_window_ms),
            max_requests: self.strict_rate_max,
            sweep_probability: self.rate_sweep_probability,
        }
    }

    pub fn guard_config(&self) -> GuardConfig {
        GuardConfig {
            protected_prefixes: self.protected_prefixes.clone(),
            entry_prefixes: self.entry_prefixes.clone(),
            static_prefixes: self.static_prefixes.clone(),
            sign_in_route: self.sign_in_route.clone(),
            landing_route: self.landing_route.clone(),
            cookie_name: self.cookie_name.clone(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
