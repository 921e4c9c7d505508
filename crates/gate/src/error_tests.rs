// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    missing = { ErrorCode::MissingCredential, 401, "MISSING_CREDENTIAL" },
    invalid = { ErrorCode::InvalidCredential, 401, "INVALID_CREDENTIAL" },
    origin = { ErrorCode::OriginNotAllowed, 403, "ORIGIN_NOT_ALLOWED" },
    method = { ErrorCode::MethodNotAllowed, 405, "METHOD_NOT_ALLOWED" },
    throttled = { ErrorCode::RateLimitExceeded, 429, "RATE_LIMIT_EXCEEDED" },
    provider = { ErrorCode::ProviderUnavailable, 502, "PROVIDER_UNAVAILABLE" },
)]
fn body_carries_code_and_status(code: ErrorCode, status: u16, name: &str) {
    let err = GateError::new(code, "nope");
    assert_eq!(err.status().as_u16(), status);
    assert_eq!(
        err.to_error_body(),
        ErrorResponse { error: name.to_owned(), message: "nope".to_owned(), status_code: status }
    );
}

#[test]
fn body_uses_camel_case_status_field() -> anyhow::Result<()> {
    let body = GateError::new(ErrorCode::RateLimitExceeded, "slow down").to_error_body();
    let json = serde_json::to_value(&body)?;
    assert_eq!(json["statusCode"], 429);
    assert_eq!(json["error"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(json["message"], "slow down");
    Ok(())
}

#[test]
fn provider_errors_split_between_invalid_and_unavailable() {
    let rejected: GateError = ProviderError::Rejected("bad sig".to_owned()).into();
    assert_eq!(rejected.code, ErrorCode::InvalidCredential);

    let timeout: GateError = ProviderError::Timeout.into();
    assert_eq!(timeout.code, ErrorCode::ProviderUnavailable);
    assert_eq!(timeout.status(), StatusCode::BAD_GATEWAY);
}

#[test]
fn refresh_and_decode_errors_are_unauthorized() {
    let refresh: GateError = RefreshError::CannotRefreshExpired.into();
    assert!(refresh.code.is_unauthorized());
    let decode: GateError = DecodeError::SegmentCount(2).into();
    assert_eq!(decode.code, ErrorCode::MalformedCredential);
    assert!(decode.code.is_unauthorized());
}
