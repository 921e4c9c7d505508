// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use proptest::prelude::*;

use super::*;
use crate::clock::ManualClock;
use crate::error::ProviderError;
use crate::provider::MintedCredential;
use crate::store::{CookieSettings, CookieStore};
use crate::test_support::{token_expiring_at, StubProvider};

const NOW: u64 = 1_700_000_000;
const NOW_MS: u64 = NOW * 1000;

type TestSession = Session<Arc<CookieStore>, Arc<StubProvider>>;

fn session_with(provider: StubProvider, warning_secs: u64) -> (TestSession, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_secs(NOW));
    let store = Arc::new(CookieStore::new(CookieSettings::default(), clock.clone()));
    let config = SessionConfig { warning_threshold_secs: warning_secs, ..SessionConfig::default() };
    (Session::new(store, Arc::new(provider), clock.clone(), config), clock)
}

fn minted(exp: u64) -> Result<MintedCredential, ProviderError> {
    Ok(MintedCredential { token: token_expiring_at(exp) })
}

// -- pure decisions ------------------------------------------------------------

#[test]
fn missing_credential_is_expired() {
    assert!(is_expired(None, NOW_MS));
    assert!(!should_refresh(None, 300, NOW_MS));
    assert!(!is_expiring_soon(None, 300, NOW_MS));
}

#[test]
fn malformed_credential_is_expired() {
    assert!(is_expired(Some("not-a-token"), NOW_MS));
}

#[test]
fn exact_boundary_is_expired() {
    let token = token_expiring_at(NOW);
    assert!(is_expired(Some(&token), NOW_MS));
    assert!(!is_expired(Some(&token), NOW_MS - 1));
}

#[test]
fn credential_without_exp_is_left_to_the_server() {
    let token = crate::codec::compose_unsigned(&serde_json::json!({ "sub": "u" }));
    assert!(!is_expired(Some(&token), NOW_MS));
    assert!(!should_refresh(Some(&token), 300, NOW_MS));
}

#[yare::parameterized(
    well_outside = { 3600, 300, false },
    just_outside = { 300, 300, false },
    inside = { 299, 300, true },
    almost_dead = { 1, 300, true },
    dead = { 0, 300, false },
)]
fn expiring_soon_window(left_secs: u64, threshold: u64, expected: bool) {
    let token = token_expiring_at(NOW + left_secs);
    assert_eq!(is_expiring_soon(Some(&token), threshold, NOW_MS), expected);
}

#[test]
fn should_refresh_never_true_when_expired() {
    let token = token_expiring_at(NOW - 10);
    assert!(!should_refresh(Some(&token), 3600, NOW_MS));
}

proptest! {
    #[test]
    fn expiry_is_monotonic(lifetime in 1u64..100_000, step in 0u64..200_000) {
        let token = token_expiring_at(NOW + lifetime);
        let now = NOW_MS + step * 1000;
        prop_assert_eq!(is_expired(Some(&token), now), step >= lifetime);
        if step < lifetime {
            prop_assert_eq!(remaining_ms(Some(&token), now), Some((lifetime - step) * 1000));
        } else {
            prop_assert_eq!(remaining_ms(Some(&token), now), None);
        }
    }
}

// -- session -------------------------------------------------------------------

#[test]
fn one_second_credential_walks_through_every_state() {
    let (session, clock) = session_with(StubProvider::new(), 1);
    assert!(session.establish(&token_expiring_at(NOW + 1)));

    // Full second left: not yet inside a 1 s warning window.
    assert!(!session.is_expired());
    assert!(!session.should_refresh());

    clock.advance_ms(1);
    assert!(session.should_refresh());
    assert!(!session.is_expired());

    clock.advance_ms(999);
    assert!(session.is_expired());
    assert!(!session.should_refresh());
}

#[test]
fn expiring_soon_uses_caller_threshold() {
    let (session, _clock) = session_with(StubProvider::new(), 60);
    assert!(session.establish(&token_expiring_at(NOW + 120)));
    assert!(session.is_expiring_soon(300));
    assert!(!session.is_expiring_soon(60));
}

#[tokio::test]
async fn refresh_of_expired_credential_never_calls_provider() -> anyhow::Result<()> {
    let (session, clock) = session_with(StubProvider::new().with_mint(minted(NOW + 900)), 300);
    assert!(session.establish(&token_expiring_at(NOW + 10)));
    clock.advance_secs(10);

    let result = session.refresh().await;
    assert_eq!(result, Err(RefreshError::CannotRefreshExpired));
    assert_eq!(session.store().get(), None);
    Ok(())
}

#[tokio::test]
async fn refresh_without_credential_never_calls_provider() -> anyhow::Result<()> {
    let provider = Arc::new(StubProvider::new().with_mint(minted(NOW + 900)));
    let clock = Arc::new(ManualClock::at_secs(NOW));
    let store = Arc::new(CookieStore::new(CookieSettings::default(), clock.clone()));
    let session = Session::new(store, Arc::clone(&provider), clock, SessionConfig::default());

    assert_eq!(session.refresh().await, Err(RefreshError::CannotRefreshExpired));
    assert_eq!(provider.mint_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn successful_refresh_replaces_credential_and_advances_activity() -> anyhow::Result<()> {
    let provider = Arc::new(StubProvider::new().with_mint(minted(NOW + 900)));
    let clock = Arc::new(ManualClock::at_secs(NOW));
    let store = Arc::new(CookieStore::new(CookieSettings::default(), clock.clone()));
    let session = Session::new(store, Arc::clone(&provider), clock.clone(), SessionConfig::default())
        .with_session_secret("secret");

    let old = token_expiring_at(NOW + 100);
    assert!(session.establish(&old));
    let before = session.last_activity_ms();
    clock.advance_secs(5);

    session.refresh().await?;
    assert_eq!(session.credential(), Some(token_expiring_at(NOW + 900)));
    assert_eq!(session.last_activity_ms(), before + 5000);
    assert_eq!(provider.mint_calls(), 1);

    let ctx = provider.last_context().ok_or_else(|| anyhow::anyhow!("no mint context"))?;
    assert_eq!(ctx.credential, Some(old));
    assert_eq!(ctx.session_secret.as_deref(), Some("secret"));
    Ok(())
}

#[tokio::test]
async fn provider_failure_clears_store() -> anyhow::Result<()> {
    let failing = StubProvider::new().with_mint(Err(ProviderError::Timeout));
    let (session, _clock) = session_with(failing, 300);
    assert!(session.establish(&token_expiring_at(NOW + 100)));

    let result = session.refresh().await;
    assert!(matches!(result, Err(RefreshError::RefreshFailed(_))));
    assert_eq!(session.credential(), None);
    Ok(())
}

#[tokio::test]
async fn unusable_minted_credential_clears_store() -> anyhow::Result<()> {
    let stale = StubProvider::new().with_mint(minted(NOW - 1));
    let (session, _clock) = session_with(stale, 300);
    assert!(session.establish(&token_expiring_at(NOW + 100)));

    let result = session.refresh().await;
    assert!(matches!(result, Err(RefreshError::RefreshFailed(_))));
    assert_eq!(session.credential(), None);
    Ok(())
}

#[tokio::test]
async fn refresh_if_needed_skips_healthy_credential() -> anyhow::Result<()> {
    let provider = Arc::new(StubProvider::new().with_mint(minted(NOW + 7200)));
    let clock = Arc::new(ManualClock::at_secs(NOW));
    let store = Arc::new(CookieStore::new(CookieSettings::default(), clock.clone()));
    let session = Session::new(store, Arc::clone(&provider), clock.clone(), SessionConfig::default());
    assert!(session.establish(&token_expiring_at(NOW + 3600)));

    assert!(!session.refresh_if_needed().await?);
    assert_eq!(provider.mint_calls(), 0);

    clock.advance_secs(3600 - 299);
    assert!(session.refresh_if_needed().await?);
    assert_eq!(provider.mint_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_refreshes_are_tolerated() -> anyhow::Result<()> {
    let provider = Arc::new(StubProvider::new().with_mint(minted(NOW + 900)));
    let clock = Arc::new(ManualClock::at_secs(NOW));
    let store = Arc::new(CookieStore::new(CookieSettings::default(), clock.clone()));
    let session = Arc::new(Session::new(store, Arc::clone(&provider), clock, SessionConfig::default()));
    assert!(session.establish(&token_expiring_at(NOW + 100)));

    let a = tokio::spawn({
        let s = Arc::clone(&session);
        async move { s.refresh().await }
    });
    let b = tokio::spawn({
        let s = Arc::clone(&session);
        async move { s.refresh().await }
    });
    a.await??;
    b.await??;
    assert_eq!(session.credential(), Some(token_expiring_at(NOW + 900)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn refresh_loop_refreshes_inside_window_and_stops_on_shutdown() -> anyhow::Result<()> {
    let provider = Arc::new(StubProvider::new().with_mint(minted(NOW + 900)));
    let clock = Arc::new(ManualClock::at_secs(NOW));
    let store = Arc::new(CookieStore::new(CookieSettings::default(), clock.clone()));
    let session = Arc::new(Session::new(store, Arc::clone(&provider), clock, SessionConfig::default()));
    assert!(session.establish(&token_expiring_at(NOW + 60)));

    let shutdown = CancellationToken::new();
    let handle =
        spawn_refresh_loop(Arc::clone(&session), Duration::from_secs(10), shutdown.clone());

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(provider.mint_calls(), 1);
    assert_eq!(session.credential(), Some(token_expiring_at(NOW + 900)));

    // Fresh credential is outside the window; further ticks do nothing.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(provider.mint_calls(), 1);

    shutdown.cancel();
    handle.await?;
    Ok(())
}

#[test]
fn invalidate_clears_credential() {
    let (session, _clock) = session_with(StubProvider::new(), 300);
    assert!(session.establish(&token_expiring_at(NOW + 100)));
    session.invalidate();
    assert_eq!(session.credential(), None);
    assert!(session.is_expired());
}

#[test]
fn config_defaults_fill_missing_fields() -> anyhow::Result<()> {
    let config: SessionConfig = serde_json::from_str(r#"{ "warning_threshold_secs": 120 }"#)?;
    assert_eq!(config.warning_threshold_secs, 120);
    assert_eq!(config.fallback_ttl_secs, 900);
    assert_eq!(config.refresh_interval(), Duration::from_secs(60));
    Ok(())
}
