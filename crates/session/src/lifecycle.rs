// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side session lifecycle: expiry decisions and credential refresh.
//!
//! Every decision here uses the advisory codec, so none of it is a security
//! boundary. It only saves round trips for credentials that are obviously dead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::codec;
use crate::error::RefreshError;
use crate::provider::{IdentityProvider, SessionContext};
use crate::store::CredentialStore;

/// Default remaining lifetime under which a refresh is attempted (5 minutes).
const DEFAULT_WARNING_THRESHOLD_SECS: u64 = 300;

/// Default cookie lifetime for credentials that carry no `exp` (15 minutes).
const DEFAULT_FALLBACK_TTL_SECS: u64 = 900;

/// Default period of the background refresh check.
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// Exact expiry instant of `credential` in epoch millis, if it has one.
fn expiry_ms(credential: &str) -> Result<Option<u64>, crate::error::DecodeError> {
    let claims = codec::decode(credential)?;
    Ok(codec::expires_at(&claims).map(|exp| exp.saturating_mul(1000)))
}

/// Missing, malformed, or at/after `exp`. A credential without `exp` is not
/// considered expired here; the server decides.
pub fn is_expired(credential: Option<&str>, now_ms: u64) -> bool {
    let Some(token) = credential else {
        return true;
    };
    match expiry_ms(token) {
        Ok(Some(exp_ms)) => now_ms >= exp_ms,
        Ok(None) => false,
        Err(_) => true,
    }
}

/// Milliseconds left before `exp`, when positive.
pub fn remaining_ms(credential: Option<&str>, now_ms: u64) -> Option<u64> {
    let exp_ms = expiry_ms(credential?).ok()??;
    exp_ms.checked_sub(now_ms).filter(|left| *left > 0)
}

/// `0 < exp - now < threshold`.
pub fn is_expiring_soon(credential: Option<&str>, threshold_secs: u64, now_ms: u64) -> bool {
    remaining_ms(credential, now_ms).is_some_and(|left| left < threshold_secs.saturating_mul(1000))
}

/// Live, but inside the warning window. Never true for an expired credential.
pub fn should_refresh(credential: Option<&str>, warning_secs: u64, now_ms: u64) -> bool {
    !is_expired(credential, now_ms) && is_expiring_soon(credential, warning_secs, now_ms)
}

/// Tunables for [`Session`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Refresh once remaining lifetime drops below this many seconds.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold_secs: u64,
    /// Cookie lifetime for credentials without `exp`.
    #[serde(default = "default_fallback_ttl")]
    pub fallback_ttl_secs: u64,
    /// Period of the background refresh check.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

fn default_warning_threshold() -> u64 {
    DEFAULT_WARNING_THRESHOLD_SECS
}

fn default_fallback_ttl() -> u64 {
    DEFAULT_FALLBACK_TTL_SECS
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            warning_threshold_secs: DEFAULT_WARNING_THRESHOLD_SECS,
            fallback_ttl_secs: DEFAULT_FALLBACK_TTL_SECS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

impl SessionConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// The credential held by one client process, plus its refresh machinery.
pub struct Session<S, P> {
    store: S,
    provider: P,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    session_secret: Option<String>,
    last_activity_ms: AtomicU64,
}

impl<S: CredentialStore, P: IdentityProvider> Session<S, P> {
    pub fn new(store: S, provider: P, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        let now = clock.now_ms();
        Self {
            store,
            provider,
            clock,
            config,
            session_secret: None,
            last_activity_ms: AtomicU64::new(now),
        }
    }

    /// Attach the long-lived session secret the provider mints from.
    pub fn with_session_secret(mut self, secret: impl Into<String>) -> Self {
        self.session_secret = Some(secret.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The stored credential, if any.
    pub fn credential(&self) -> Option<String> {
        self.store.get()
    }

    /// Store a credential obtained from sign-in or sign-up.
    pub fn establish(&self, token: &str) -> bool {
        let stored = self.store.set(token, self.config.fallback_ttl_secs);
        if stored {
            self.touch();
        }
        stored
    }

    /// Drop the credential (logout, password change).
    pub fn invalidate(&self) {
        self.store.clear();
    }

    /// Record a successful authenticated action.
    pub fn touch(&self) {
        self.last_activity_ms.fetch_max(self.clock.now_ms(), Ordering::SeqCst);
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms.load(Ordering::SeqCst)
    }

    pub fn is_expired(&self) -> bool {
        is_expired(self.credential().as_deref(), self.clock.now_ms())
    }

    pub fn is_expiring_soon(&self, threshold_secs: u64) -> bool {
        is_expiring_soon(self.credential().as_deref(), threshold_secs, self.clock.now_ms())
    }

    pub fn should_refresh(&self) -> bool {
        should_refresh(
            self.credential().as_deref(),
            self.config.warning_threshold_secs,
            self.clock.now_ms(),
        )
    }

    /// Replace the held credential with a freshly minted one.
    ///
    /// Any failure clears the store: the caller must send the user back to
    /// sign-in rather than retry.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        let current = self.store.get();
        if is_expired(current.as_deref(), self.clock.now_ms()) {
            self.store.clear();
            info!("credential missing or expired, re-authentication required");
            return Err(RefreshError::CannotRefreshExpired);
        }

        let ctx = SessionContext { credential: current, session_secret: self.session_secret.clone() };
        let minted = match self.provider.mint_credential(&ctx).await {
            Ok(minted) => minted,
            Err(e) => {
                self.store.clear();
                warn!(err = %e, "credential refresh failed");
                return Err(RefreshError::RefreshFailed(e.to_string()));
            }
        };

        if !self.store.set(&minted.token, self.config.fallback_ttl_secs) {
            self.store.clear();
            warn!("provider minted a credential that cannot be stored");
            return Err(RefreshError::RefreshFailed("minted credential is unusable".to_owned()));
        }
        self.touch();
        info!("credential refreshed");
        Ok(())
    }

    /// Refresh only when inside the warning window. Returns whether it refreshed.
    pub async fn refresh_if_needed(&self) -> Result<bool, RefreshError> {
        if !self.should_refresh() {
            return Ok(false);
        }
        self.refresh().await.map(|()| true)
    }
}

/// Periodically refresh `session` until `shutdown` fires.
///
/// A failed refresh has already cleared the store, so later ticks are no-ops
/// until a new credential is established.
pub fn spawn_refresh_loop<S, P>(
    session: Arc<Session<S, P>>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    S: CredentialStore + 'static,
    P: IdentityProvider + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            match session.refresh_if_needed().await {
                Ok(true) => debug!("background refresh succeeded"),
                Ok(false) => {}
                Err(e) => warn!(err = %e, "background refresh failed, sign-in required"),
            }
        }
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
