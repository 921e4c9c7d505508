// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures shared by unit and integration tests across the workspace.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::codec::compose_unsigned;
use crate::error::ProviderError;
use crate::provider::{IdentityProvider, MintedCredential, ProviderIdentity, SessionContext};

/// An unsigned credential for `sub`/`email` expiring at `exp` (epoch seconds).
pub fn token_for(sub: &str, email: &str, exp: u64) -> String {
    compose_unsigned(&json!({ "sub": sub, "email": email, "exp": exp }))
}

/// An unsigned credential for a fixed test user expiring at `exp`.
pub fn token_expiring_at(exp: u64) -> String {
    token_for("user-1", "user1@example.com", exp)
}

/// Scripted identity provider that counts its calls.
pub struct StubProvider {
    identity: Mutex<Result<ProviderIdentity, ProviderError>>,
    minted: Mutex<Result<MintedCredential, ProviderError>>,
    resolve_calls: AtomicUsize,
    mint_calls: AtomicUsize,
    last_context: Mutex<Option<SessionContext>>,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StubProvider {
    /// Resolves every credential to `user-1` and refuses to mint.
    pub fn new() -> Self {
        Self {
            identity: Mutex::new(Ok(ProviderIdentity {
                subject_id: Some("user-1".to_owned()),
                email: Some("user1@example.com".to_owned()),
                name: Some("User One".to_owned()),
            })),
            minted: Mutex::new(Err(ProviderError::Rejected("minting not scripted".to_owned()))),
            resolve_calls: AtomicUsize::new(0),
            mint_calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        }
    }

    pub fn with_identity(self, identity: Result<ProviderIdentity, ProviderError>) -> Self {
        *self.identity.lock() = identity;
        self
    }

    pub fn with_mint(self, minted: Result<MintedCredential, ProviderError>) -> Self {
        self.set_mint(minted);
        self
    }

    pub fn set_mint(&self, minted: Result<MintedCredential, ProviderError>) {
        *self.minted.lock() = minted;
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn mint_calls(&self) -> usize {
        self.mint_calls.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Option<SessionContext> {
        self.last_context.lock().clone()
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn resolve_principal(&self, _credential: &str) -> Result<ProviderIdentity, ProviderError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.identity.lock().clone()
    }

    async fn mint_credential(
        &self,
        ctx: &SessionContext,
    ) -> Result<MintedCredential, ProviderError> {
        self.mint_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock() = Some(ctx.clone());
        self.minted.lock().clone()
    }
}

/// Lift any `Display` error into `anyhow::Error`, for fallible test setup.
pub trait AnyhowExt<T> {
    fn anyhow(self) -> anyhow::Result<T>;
}

impl<T, E: std::fmt::Display> AnyhowExt<T> for Result<T, E> {
    fn anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{e}"))
    }
}
