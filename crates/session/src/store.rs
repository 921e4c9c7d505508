// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-held credential storage.
//!
//! The credential lives in a `SameSite=Strict`, `Path=/` cookie whose max-age
//! is the credential's own remaining lifetime. The cookie is deliberately not
//! `HttpOnly`: client code reads it to attach `Authorization` headers and to
//! make local expiry decisions. That makes it readable by any script on the
//! origin, which is the accepted trust boundary for this design.

use std::sync::Arc;

use cookie::{Cookie, CookieJar, SameSite};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::codec;
use crate::error::DecodeError;

/// Default cookie name, matching what the identity provider's web SDK expects.
pub const DEFAULT_COOKIE_NAME: &str = "appwrite_jwt";

/// Storage for the current credential. Implementations never panic when no
/// storage medium is available; they behave as empty.
pub trait CredentialStore: Send + Sync {
    /// The stored credential, if any.
    fn get(&self) -> Option<String>;

    /// Store `token`, deriving the lifetime from its `exp` claim.
    ///
    /// `fallback_ttl_secs` is used only when the token carries no `exp`.
    /// Returns `false` when the token was refused (already expired, malformed,
    /// or without any usable lifetime); the previous value is left untouched.
    fn set(&self, token: &str, fallback_ttl_secs: u64) -> bool;

    /// Remove the stored credential. Idempotent.
    fn clear(&self);
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn get(&self) -> Option<String> {
        (**self).get()
    }

    fn set(&self, token: &str, fallback_ttl_secs: u64) -> bool {
        (**self).set(token, fallback_ttl_secs)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// Why a token was not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    Expired { exp: u64, now: u64 },
    Malformed(DecodeError),
    NoLifetime,
}

impl std::fmt::Display for Refusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired { exp, now } => write!(f, "credential expired at {exp} (now {now})"),
            Self::Malformed(e) => write!(f, "{e}"),
            Self::NoLifetime => f.write_str("credential has no exp and no fallback ttl"),
        }
    }
}

/// Compute the cookie max-age for `token` at `now_secs`.
pub fn cookie_max_age(token: &str, fallback_ttl_secs: u64, now_secs: u64) -> Result<u64, Refusal> {
    let claims = codec::decode(token).map_err(Refusal::Malformed)?;
    match codec::expires_at(&claims) {
        Some(exp) if exp > now_secs => Ok(exp - now_secs),
        Some(exp) => Err(Refusal::Expired { exp, now: now_secs }),
        None if fallback_ttl_secs > 0 => Ok(fallback_ttl_secs),
        None => Err(Refusal::NoLifetime),
    }
}

/// Cookie attributes for the stored credential.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    /// Set `Secure`. On for anything that is not local development.
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self { name: DEFAULT_COOKIE_NAME.to_owned(), secure: true }
    }
}

/// Build the credential cookie.
pub fn credential_cookie(
    name: &str,
    token: &str,
    max_age_secs: u64,
    secure: bool,
) -> Cookie<'static> {
    let max_age = time::Duration::seconds(i64::try_from(max_age_secs).unwrap_or(i64::MAX));
    Cookie::build((name.to_owned(), token.to_owned()))
        .http_only(false)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Build a cookie that deletes the credential cookie.
pub fn removal_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_owned(), ""))
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// Storage for processes with no cookie medium. Always empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedStore;

impl CredentialStore for DetachedStore {
    fn get(&self) -> Option<String> {
        None
    }

    fn set(&self, _token: &str, _fallback_ttl_secs: u64) -> bool {
        debug!("no credential storage in this context, dropping credential");
        false
    }

    fn clear(&self) {}
}

struct Held {
    jar: CookieJar,
    /// Absolute expiry of the cookie itself, in epoch millis.
    expires_at_ms: u64,
}

/// A cookie jar owned by this process, with browser-like max-age handling.
pub struct CookieStore {
    inner: Mutex<Held>,
    settings: CookieSettings,
    clock: Arc<dyn Clock>,
}

impl CookieStore {
    pub fn new(settings: CookieSettings, clock: Arc<dyn Clock>) -> Self {
        Self { inner: Mutex::new(Held { jar: CookieJar::new(), expires_at_ms: 0 }), settings, clock }
    }

    pub fn settings(&self) -> &CookieSettings {
        &self.settings
    }

    /// `name=value` for an outbound `Cookie` header.
    pub fn cookie_header(&self) -> Option<String> {
        self.get().map(|token| format!("{}={token}", self.settings.name))
    }

    /// Full `Set-Cookie` value for the held credential with its remaining max-age.
    pub fn set_cookie_header(&self) -> Option<String> {
        let token = self.get()?;
        let remaining_ms = self.inner.lock().expires_at_ms.saturating_sub(self.clock.now_ms());
        let cookie = credential_cookie(
            &self.settings.name,
            &token,
            remaining_ms.div_ceil(1000),
            self.settings.secure,
        );
        Some(cookie.to_string())
    }
}

impl CredentialStore for CookieStore {
    fn get(&self) -> Option<String> {
        let mut held = self.inner.lock();
        if held.jar.get(&self.settings.name).is_none() {
            return None;
        }
        if self.clock.now_ms() >= held.expires_at_ms {
            held.jar.remove(removal_cookie(&self.settings.name));
            return None;
        }
        held.jar.get(&self.settings.name).map(|c| c.value().to_owned())
    }

    fn set(&self, token: &str, fallback_ttl_secs: u64) -> bool {
        let now_ms = self.clock.now_ms();
        let max_age = match cookie_max_age(token, fallback_ttl_secs, now_ms / 1000) {
            Ok(secs) => secs,
            Err(refusal) => {
                warn!(cookie = %self.settings.name, %refusal, "refusing to store credential");
                return false;
            }
        };
        let cookie = credential_cookie(&self.settings.name, token, max_age, self.settings.secure);
        let mut held = self.inner.lock();
        held.jar.add(cookie);
        // Anchor on the whole second so the cookie never outlives `exp`.
        held.expires_at_ms = (now_ms / 1000 + max_age) * 1000;
        debug!(cookie = %self.settings.name, max_age, "credential stored");
        true
    }

    fn clear(&self) {
        let mut held = self.inner.lock();
        held.jar.remove(removal_cookie(&self.settings.name));
        held.expires_at_ms = 0;
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
