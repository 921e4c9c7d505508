// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the gated API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use marquee_session::error::ErrorCode;

use crate::auth::Principal;
use crate::error::GateError;
use crate::state::GateState;

// -- Response types -----------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub tracked_clients: usize,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub principal: Principal,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<GateState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "running".to_owned(),
        tracked_clients: s.limiter.tracked() + s.strict_limiter.tracked(),
    })
}

/// `GET /api/v1/me` — the authenticated caller.
pub async fn me(principal: Principal) -> impl IntoResponse {
    Json(principal)
}

/// `POST /api/v1/auth/verify` — confirm a credential is accepted by the provider.
pub async fn verify(principal: Principal) -> impl IntoResponse {
    Json(VerifyResponse { valid: true, principal })
}

/// Any unrouted path under `/api/`.
pub async fn api_not_found() -> GateError {
    GateError::new(ErrorCode::NotFound, "no such endpoint")
}

/// Method fallback for every API route.
pub async fn method_not_allowed() -> GateError {
    GateError::new(ErrorCode::MethodNotAllowed, "method not allowed")
}

/// Page fallback when no web root is configured.
pub async fn page_not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
