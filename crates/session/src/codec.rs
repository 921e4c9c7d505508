// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory decoding of signed credentials.
//!
//! A credential is `header.payload.signature`. Only the payload is read and the
//! signature is never checked, so a successful decode proves nothing about
//! authenticity. Use it for local expiry hints only; the identity provider is
//! the authority.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// base64url that writes no padding and accepts input with or without it.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims read from a credential payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Claims {
    /// `sub`, or `userId` for providers that name it that way.
    pub subject_id: Option<String>,
    pub email: Option<String>,
    /// `exp` in unix seconds.
    pub exp: Option<u64>,
    pub issued_at: Option<u64>,
    pub session_id: Option<String>,
    /// Every other key in the payload, untouched.
    pub extra: Map<String, Value>,
}

/// Decode the payload of `token` without verifying its signature.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }

    let bytes =
        URL_SAFE_LENIENT.decode(segments[1]).map_err(|e| DecodeError::Base64(e.to_string()))?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|e| DecodeError::Payload(e.to_string()))?;
    let Value::Object(mut map) = value else {
        return Err(DecodeError::Payload("payload is not a JSON object".to_owned()));
    };

    let subject_id = take_string(&mut map, "sub").or_else(|| take_string(&mut map, "userId"));
    let email = take_string(&mut map, "email");
    let exp = take_seconds(&mut map, "exp");
    let issued_at = take_seconds(&mut map, "iat");
    let session_id = take_string(&mut map, "sessionId");

    Ok(Claims { subject_id, email, exp, issued_at, session_id, extra: map })
}

/// The `exp` claim, if present.
pub fn expires_at(claims: &Claims) -> Option<u64> {
    claims.exp
}

/// Decode and return only the expiry. Malformed tokens yield `None`.
pub fn peek_expiry(token: &str) -> Option<u64> {
    decode(token).ok().and_then(|c| expires_at(&c))
}

/// Build an unsigned `header.payload.signature` string around `payload`.
///
/// The signature segment is a fixed placeholder. Useful for fixtures and local
/// tooling; no provider will accept the result.
pub fn compose_unsigned(payload: &Value) -> String {
    let header = URL_SAFE_LENIENT.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_LENIENT.encode(payload.to_string());
    format!("{header}.{body}.unsigned")
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            map.insert(key.to_owned(), other);
            None
        }
        None => None,
    }
}

// Non-integer or negative values stay in `extra` and read as absent.
fn take_seconds(map: &mut Map<String, Value>, key: &str) -> Option<u64> {
    match map.get(key).and_then(Value::as_u64) {
        Some(secs) => {
            map.remove(key);
            Some(secs)
        }
        None => None,
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
