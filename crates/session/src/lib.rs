// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Marquee session: the client-held credential lifecycle.
//!
//! Decodes credentials for advisory expiry checks, keeps the current one in a
//! strict same-site cookie, and refreshes it through the identity provider
//! before it lapses.

pub mod clock;
pub mod codec;
pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod store;
pub mod test_support;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::Claims;
pub use error::{DecodeError, ErrorCode, ProviderError, RefreshError};
pub use lifecycle::{Session, SessionConfig};
pub use provider::{HttpIdentityProvider, IdentityProvider, ProviderConfig, ProviderIdentity};
pub use store::{CookieSettings, CookieStore, CredentialStore, DetachedStore};
