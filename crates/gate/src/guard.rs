// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Navigation guard for page requests.
//!
//! Reads only the raw credential cookie and makes an advisory, local expiry
//! decision. It keeps signed-out users off protected pages and signed-in users
//! off the sign-in pages; the API's auth layer remains the enforcement point.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, PRAGMA, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, info};

use marquee_session::clock::Clock;
use marquee_session::lifecycle;
use marquee_session::store::removal_cookie;

use crate::state::GateState;

pub const NO_STORE: &str = "no-store, no-cache, must-revalidate";
pub const IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Route tables for [`RequestGuard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub protected_prefixes: Vec<String>,
    /// Sign-in and sign-up pages.
    pub entry_prefixes: Vec<String>,
    pub static_prefixes: Vec<String>,
    pub sign_in_route: String,
    pub landing_route: String,
    pub cookie_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Leave whatever the page handler set.
    Default,
    NoStore,
    Immutable,
}

impl CachePolicy {
    pub fn apply(self, headers: &mut HeaderMap) {
        match self {
            Self::Default => {}
            Self::NoStore => {
                headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
                headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
            }
            Self::Immutable => {
                headers.insert(CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Redirect { location: String, clear_cookie: bool },
    Pass { cache: CachePolicy },
}

pub struct RequestGuard {
    config: GuardConfig,
    clock: Arc<dyn Clock>,
}

impl RequestGuard {
    pub fn new(config: GuardConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Decide what to do with a navigation to `path`.
    ///
    /// `query` is the raw query string; it is only consulted for a `redirect`
    /// target when a signed-in user lands on an entry page.
    pub fn decide(&self, path: &str, query: Option<&str>, credential: Option<&str>) -> GuardDecision {
        let credential = credential.filter(|c| !c.is_empty());
        let has_valid = credential.is_some() && !lifecycle::is_expired(credential, self.clock.now_ms());
        let protected = matches_any(path, &self.config.protected_prefixes);

        if protected && !has_valid {
            let stale = credential.is_some();
            let mut location =
                format!("{}?redirect={}", self.config.sign_in_route, urlencoding::encode(path));
            if stale {
                location.push_str("&session_expired=true");
            }
            return GuardDecision::Redirect { location, clear_cookie: stale };
        }

        if has_valid && matches_any(path, &self.config.entry_prefixes) {
            let location = query
                .and_then(redirect_target)
                .filter(|target| !matches_any(target_path(target), &self.config.entry_prefixes))
                .unwrap_or_else(|| self.config.landing_route.clone());
            return GuardDecision::Redirect { location, clear_cookie: false };
        }

        let cache = if protected {
            CachePolicy::NoStore
        } else if matches_any(path, &self.config.static_prefixes) {
            CachePolicy::Immutable
        } else {
            CachePolicy::Default
        };
        GuardDecision::Pass { cache }
    }
}

/// Segment-aware prefix match: `/watchlist` matches `/watchlist` and
/// `/watchlist/x`, not `/watchlists`.
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn matches_any(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| matches_prefix(path, p))
}

/// The decoded `redirect` query parameter, if it is a local path.
///
/// Browsers drop tabs and newlines while parsing a `Location`, so any control
/// or whitespace character could turn `/\t/host` into `//host`.
fn redirect_target(query: &str) -> Option<String> {
    let raw = query.split('&').find_map(|pair| pair.strip_prefix("redirect="))?;
    let decoded = urlencoding::decode(raw).ok()?;
    let local = decoded.starts_with('/')
        && !decoded.starts_with("//")
        && !decoded.contains('\\')
        && !decoded.chars().any(|c| c.is_control() || c.is_whitespace());
    local.then(|| decoded.into_owned())
}

fn target_path(target: &str) -> &str {
    target.split(['?', '#']).next().unwrap_or(target)
}

/// Axum middleware guarding page navigations.
pub async fn guard_layer(state: State<Arc<GateState>>, req: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let credential = jar.get(&state.guard.config().cookie_name).map(|c| c.value().to_owned());
    let path = req.uri().path().to_owned();

    let decision = state.guard.decide(&path, req.uri().query(), credential.as_deref());
    match decision {
        GuardDecision::Redirect { location, clear_cookie } => {
            if clear_cookie {
                info!(path = %path, "stale credential, redirecting to sign-in");
            } else {
                debug!(path = %path, location = %location, "guard redirect");
            }
            let mut resp = Redirect::temporary(&location).into_response();
            if clear_cookie {
                let removal = removal_cookie(&state.guard.config().cookie_name);
                if let Ok(value) = HeaderValue::from_str(&removal.to_string()) {
                    resp.headers_mut().append(SET_COOKIE, value);
                }
            }
            resp
        }
        GuardDecision::Pass { cache } => {
            let mut resp = next.run(req).await;
            cache.apply(resp.headers_mut());
            resp
        }
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
