// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable error codes shared by the client session and the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MalformedCredential,
    MissingCredential,
    InvalidCredential,
    CannotRefreshExpired,
    RefreshFailed,
    OriginNotAllowed,
    RateLimitExceeded,
    MethodNotAllowed,
    NotFound,
    ProviderUnavailable,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MalformedCredential
            | Self::MissingCredential
            | Self::InvalidCredential
            | Self::CannotRefreshExpired
            | Self::RefreshFailed => 401,
            Self::OriginNotAllowed => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::RateLimitExceeded => 429,
            Self::ProviderUnavailable => 502,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedCredential => "MALFORMED_CREDENTIAL",
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::CannotRefreshExpired => "CANNOT_REFRESH_EXPIRED",
            Self::RefreshFailed => "REFRESH_FAILED",
            Self::OriginNotAllowed => "ORIGIN_NOT_ALLOWED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::NotFound => "NOT_FOUND",
            Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether a client should treat this as "signed out" rather than a glitch.
    pub fn is_unauthorized(&self) -> bool {
        self.http_status() == 401
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A credential could not be decoded locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Token does not have exactly three dot-separated segments.
    SegmentCount(usize),
    /// Middle segment is not valid base64url.
    Base64(String),
    /// Middle segment is not a flat JSON object.
    Payload(String),
}

impl DecodeError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::MalformedCredential
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SegmentCount(n) => write!(f, "malformed credential: expected 3 segments, got {n}"),
            Self::Base64(msg) => write!(f, "malformed credential: payload is not base64url: {msg}"),
            Self::Payload(msg) => write!(f, "malformed credential: payload is not an object: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Failure talking to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider refused the credential or session (401/403).
    Rejected(String),
    /// The call did not complete within the configured timeout.
    Timeout,
    /// Connection-level failure.
    Transport(String),
    /// Any other non-success status.
    Status(u16, String),
    /// The provider answered but the body could not be understood.
    Protocol(String),
}

impl ProviderError {
    /// Rejections mean the credential is bad; everything else is the provider's fault.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected(_) => ErrorCode::InvalidCredential,
            Self::Timeout | Self::Transport(_) | Self::Status(..) | Self::Protocol(_) => {
                ErrorCode::ProviderUnavailable
            }
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(msg) => write!(f, "provider rejected credential: {msg}"),
            Self::Timeout => f.write_str("provider request timed out"),
            Self::Transport(msg) => write!(f, "provider unreachable: {msg}"),
            Self::Status(status, body) => write!(f, "provider returned {status}: {body}"),
            Self::Protocol(msg) => write!(f, "unexpected provider response: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Outcome of a failed client-side refresh. Both variants force re-authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The held credential was already expired (or absent); the provider was not called.
    CannotRefreshExpired,
    /// The provider call failed or returned an unusable credential.
    RefreshFailed(String),
}

impl RefreshError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CannotRefreshExpired => ErrorCode::CannotRefreshExpired,
            Self::RefreshFailed(_) => ErrorCode::RefreshFailed,
        }
    }
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CannotRefreshExpired => f.write_str("cannot refresh an expired credential"),
            Self::RefreshFailed(msg) => write!(f, "refresh failed: {msg}"),
        }
    }
}

impl std::error::Error for RefreshError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
