// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity provider contract and its HTTP implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Default bound on any single provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Identity as reported by the provider after verifying a credential.
///
/// Fields are optional because providers can answer successfully with an
/// incomplete record; callers decide whether that is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    #[serde(rename = "$id", default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Whatever the provider needs to mint a credential without a password.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// The credential currently held, if any.
    pub credential: Option<String>,
    /// Long-lived session secret, when the client holds one.
    pub session_secret: Option<String>,
}

/// A freshly minted credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintedCredential {
    #[serde(rename = "jwt")]
    pub token: String,
}

/// The two operations this workspace needs from an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify `credential` (signature and liveness) and describe its owner.
    async fn resolve_principal(&self, credential: &str) -> Result<ProviderIdentity, ProviderError>;

    /// Issue a new credential from an already-established session.
    async fn mint_credential(&self, ctx: &SessionContext)
        -> Result<MintedCredential, ProviderError>;
}

#[async_trait]
impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    async fn resolve_principal(&self, credential: &str) -> Result<ProviderIdentity, ProviderError> {
        (**self).resolve_principal(credential).await
    }

    async fn mint_credential(
        &self,
        ctx: &SessionContext,
    ) -> Result<MintedCredential, ProviderError> {
        (**self).mint_credential(ctx).await
    }
}

/// Connection settings for [`HttpIdentityProvider`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base API URL, e.g. `https://cloud.appwrite.io/v1`.
    pub endpoint: String,
    pub project_id: String,
    pub timeout: Duration,
}

/// Account-API client for an Appwrite-compatible identity provider.
pub struct HttpIdentityProvider {
    endpoint: String,
    project_id: String,
    client: Client,
}

impl HttpIdentityProvider {
    pub fn new(config: ProviderConfig) -> anyhow::Result<Self> {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            project_id: config.project_id,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn with_project(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("X-Appwrite-Project", &self.project_id)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let resp = req.send().await.map_err(transport_error)?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected(summarize(status, &text)));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status(status.as_u16(), text));
        }
        resp.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Protocol(e.to_string())
            }
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve_principal(&self, credential: &str) -> Result<ProviderIdentity, ProviderError> {
        let req = self.with_project(self.client.get(self.url("/account")));
        self.send_json(req.header("X-Appwrite-JWT", credential)).await
    }

    async fn mint_credential(
        &self,
        ctx: &SessionContext,
    ) -> Result<MintedCredential, ProviderError> {
        let mut req = self.with_project(self.client.post(self.url("/account/jwts")));
        req = match (&ctx.session_secret, &ctx.credential) {
            (Some(secret), _) => req.header("X-Appwrite-Session", secret),
            (None, Some(jwt)) => req.header("X-Appwrite-JWT", jwt),
            (None, None) => return Err(ProviderError::Rejected("no active session".to_owned())),
        };
        self.send_json(req).await
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(e.to_string())
    }
}

/// Pull the provider's `message` out of an error body when there is one.
fn summarize(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(b) => b.message,
        Err(_) => status.to_string(),
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
