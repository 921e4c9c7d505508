// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use marquee_session::error::ErrorCode;

use crate::error::GateError;
use crate::state::GateState;

pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// What goes into `Access-Control-Allow-Origin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowOrigin {
    /// No `Origin` header: not a browser cross-origin call.
    Any,
    /// An allow-listed origin, echoed back with credentials.
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsDecision {
    Allowed { allow_origin: AllowOrigin, preflight: bool },
    Rejected,
}

/// Origin allow-list. Matching is exact: no case folding, no trailing-slash
/// normalization.
#[derive(Debug, Clone, Default)]
pub struct CorsGuard {
    allowed: HashSet<String>,
}

impl CorsGuard {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { allowed: origins.into_iter().map(Into::into).collect() }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed.contains(origin)
    }

    pub fn apply(&self, origin: Option<&str>, method: &Method) -> CorsDecision {
        let allow_origin = match origin {
            None => AllowOrigin::Any,
            Some(o) if self.is_allowed(o) => AllowOrigin::Exact(o.to_owned()),
            Some(_) => return CorsDecision::Rejected,
        };
        CorsDecision::Allowed { allow_origin, preflight: method == Method::OPTIONS }
    }
}

/// Stamp the CORS headers for an allowed request onto `headers`.
pub fn write_headers(headers: &mut HeaderMap, allow_origin: &AllowOrigin) {
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    match allow_origin {
        AllowOrigin::Any => {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
        AllowOrigin::Exact(origin) => {
            // The origin came in as a header value, so it round-trips.
            if let Ok(value) = HeaderValue::from_str(origin) {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
    }
}

/// Axum middleware enforcing the origin allow-list.
///
/// Preflights are answered here and never reach the handler.
pub async fn cors_layer(state: State<Arc<GateState>>, req: Request, next: Next) -> Response {
    // A non-UTF-8 origin can never be on the list.
    let origin = req.headers().get(ORIGIN).map(|v| v.to_str().unwrap_or("\u{fffd}"));

    let decision = state.cors.apply(origin, req.method());
    match decision {
        CorsDecision::Rejected => {
            warn!(origin = origin.unwrap_or_default(), path = %req.uri().path(), "origin not allowed");
            GateError::new(ErrorCode::OriginNotAllowed, "origin not allowed").into_response()
        }
        CorsDecision::Allowed { allow_origin, preflight: true } => {
            let mut resp = StatusCode::OK.into_response();
            write_headers(resp.headers_mut(), &allow_origin);
            resp
        }
        CorsDecision::Allowed { allow_origin, preflight: false } => {
            let mut resp = next.run(req).await;
            write_headers(resp.headers_mut(), &allow_origin);
            resp
        }
    }
}

#[cfg(test)]
#[path = "cors_tests.rs"]
mod tests;
