// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport: the gated API plus guarded page serving.

pub mod http;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{any, get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::auth_layer;
use crate::cors::cors_layer;
use crate::guard::guard_layer;
use crate::rate_limit::rate_limit_layer;
use crate::state::GateState;

/// Build the full router: API routes behind the gate chain, everything else
/// behind the navigation guard.
pub fn build_router(state: Arc<GateState>) -> Router {
    let api = Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(http::health).fallback(http::method_not_allowed))
        .route("/api/v1/me", get(http::me).fallback(http::method_not_allowed))
        // Strict limiter applies by prefix
        .route("/api/v1/auth/verify", post(http::verify).fallback(http::method_not_allowed))
        .route("/api/{*rest}", any(http::api_not_found));

    gate_api(api, &state)
        .fallback_service(pages_router(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wrap API routes in the gate chain: CORS (outermost), then rate limiting,
/// then authentication.
///
/// Layers only cover routes already on `router`; add routes first.
pub fn gate_api<S>(router: Router<S>, state: &Arc<GateState>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(middleware::from_fn_with_state(Arc::clone(state), auth_layer))
        .layer(middleware::from_fn_with_state(Arc::clone(state), rate_limit_layer))
        .layer(middleware::from_fn_with_state(Arc::clone(state), cors_layer))
}

/// Pages: the web root (or a bare 404) behind the navigation guard.
fn pages_router(state: &Arc<GateState>) -> Router {
    let pages = match state.config.web_root {
        Some(ref root) => Router::new().fallback_service(ServeDir::new(root)),
        None => Router::new().fallback(http::page_not_found),
    };
    pages.layer(middleware::from_fn_with_state(Arc::clone(state), guard_layer))
}
