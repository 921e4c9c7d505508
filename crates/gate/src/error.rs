// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

use marquee_session::error::{DecodeError, ErrorCode, ProviderError, RefreshError};

/// A request rejected by one of the gate stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateError {
    pub code: ErrorCode,
    pub message: String,
}

impl GateError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn to_error_body(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.code.as_str().to_owned(),
            message: self.message.clone(),
            status_code: self.code.http_status(),
        }
    }
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GateError {}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_error_body())).into_response()
    }
}

impl From<DecodeError> for GateError {
    fn from(e: DecodeError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

impl From<ProviderError> for GateError {
    fn from(e: ProviderError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

impl From<RefreshError> for GateError {
    fn from(e: RefreshError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

/// JSON body of every rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
