// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, warn};

use marquee_session::error::ErrorCode;
use marquee_session::provider::{IdentityProvider, ProviderIdentity};

use crate::error::GateError;
use crate::state::GateState;

/// API paths served without a credential.
pub const AUTH_EXEMPT_PATHS: &[&str] = &["/api/v1/health"];

/// The verified caller of one API request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub subject_id: String,
    pub email: String,
    pub display_name: String,
}

/// Server-side credential verification. The identity provider is the
/// authority; nothing here trusts the token's own claims.
#[derive(Clone)]
pub struct AuthGate {
    provider: Arc<dyn IdentityProvider>,
}

impl AuthGate {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Verify the raw `Authorization` header value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Principal, GateError> {
        let token = bearer_token(authorization).ok_or_else(|| {
            GateError::new(ErrorCode::MissingCredential, "missing bearer credential")
        })?;
        let identity = self.provider.resolve_principal(token).await?;
        principal_from(identity)
    }
}

/// Extract a non-empty token from `Bearer <token>`.
pub fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    authorization?.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

/// Build a principal from a provider answer, insisting on id and email.
pub fn principal_from(identity: ProviderIdentity) -> Result<Principal, GateError> {
    let subject_id = non_empty(identity.subject_id).ok_or_else(|| {
        GateError::new(ErrorCode::InvalidCredential, "provider returned no subject id")
    })?;
    let email = non_empty(identity.email)
        .ok_or_else(|| GateError::new(ErrorCode::InvalidCredential, "provider returned no email"))?;
    let display_name = non_empty(identity.name).unwrap_or_else(|| local_part(&email).to_owned());
    Ok(Principal { subject_id, email, display_name })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn local_part(email: &str) -> &str {
    email.split_once('@').map_or(email, |(local, _)| local)
}

/// Axum middleware that resolves the caller and stores a [`Principal`] in the
/// request extensions.
///
/// Exempt: [`AUTH_EXEMPT_PATHS`].
pub async fn auth_layer(state: State<Arc<GateState>>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if AUTH_EXEMPT_PATHS.contains(&path) {
        return next.run(req).await;
    }

    let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    match state.auth.authenticate(header).await {
        Ok(principal) => {
            debug!(subject = %principal.subject_id, path = %path, "authenticated");
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => {
            warn!(code = %e.code, path = %path, "authentication failed: {}", e.message);
            e.into_response()
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| GateError::new(ErrorCode::MissingCredential, "request was not authenticated"))
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
