// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use marquee_session::clock::ManualClock;
use marquee_session::test_support::token_expiring_at;

use super::*;

const NOW: u64 = 1_750_000_000;

fn config() -> GuardConfig {
    GuardConfig {
        protected_prefixes: vec!["/dashboard".into(), "/watchlist".into()],
        entry_prefixes: vec!["/sign-in".into(), "/sign-up".into()],
        static_prefixes: vec!["/assets".into()],
        sign_in_route: "/sign-in".into(),
        landing_route: "/dashboard".into(),
        cookie_name: "appwrite_jwt".into(),
    }
}

fn guard() -> RequestGuard {
    RequestGuard::new(config(), Arc::new(ManualClock::at_secs(NOW)))
}

fn redirect(location: &str, clear_cookie: bool) -> GuardDecision {
    GuardDecision::Redirect { location: location.to_owned(), clear_cookie }
}

#[test]
fn signed_out_user_is_sent_to_sign_in() {
    assert_eq!(
        guard().decide("/watchlist", None, None),
        redirect("/sign-in?redirect=%2Fwatchlist", false)
    );
}

#[test]
fn expired_credential_is_flagged_and_cleared() {
    let stale = token_expiring_at(NOW - 10);
    assert_eq!(
        guard().decide("/dashboard/films", None, Some(&stale)),
        redirect("/sign-in?redirect=%2Fdashboard%2Ffilms&session_expired=true", true)
    );
}

#[test]
fn credential_expiring_this_instant_counts_as_expired() {
    let edge = token_expiring_at(NOW);
    assert_eq!(
        guard().decide("/dashboard", None, Some(&edge)),
        redirect("/sign-in?redirect=%2Fdashboard&session_expired=true", true)
    );
}

#[test]
fn malformed_credential_is_treated_as_stale() {
    assert_eq!(
        guard().decide("/watchlist", None, Some("not-a-token")),
        redirect("/sign-in?redirect=%2Fwatchlist&session_expired=true", true)
    );
}

#[test]
fn empty_cookie_is_absent() {
    assert_eq!(
        guard().decide("/watchlist", None, Some("")),
        redirect("/sign-in?redirect=%2Fwatchlist", false)
    );
}

#[test]
fn live_credential_passes_protected_page_without_caching() {
    let live = token_expiring_at(NOW + 600);
    assert_eq!(
        guard().decide("/watchlist/42", None, Some(&live)),
        GuardDecision::Pass { cache: CachePolicy::NoStore }
    );
}

#[yare::parameterized(
    sign_in = { "/sign-in", None, "/dashboard" },
    sign_up_nested = { "/sign-up/verify", None, "/dashboard" },
    honours_local_redirect = { "/sign-in", Some("redirect=%2Fwatchlist%2F7"), "/watchlist/7" },
    ignores_absolute_url = { "/sign-in", Some("redirect=https%3A%2F%2Fevil.example"), "/dashboard" },
    ignores_protocol_relative = { "/sign-in", Some("redirect=%2F%2Fevil.example"), "/dashboard" },
    ignores_entry_loop = { "/sign-in", Some("redirect=%2Fsign-up"), "/dashboard" },
    ignores_tab_smuggled_host = { "/sign-in", Some("redirect=%2F%09%2Fevil.example"), "/dashboard" },
    ignores_newline = { "/sign-in", Some("redirect=%2Fa%0Ab"), "/dashboard" },
    ignores_carriage_return = { "/sign-in", Some("redirect=%2Fa%0Db"), "/dashboard" },
    ignores_space = { "/sign-in", Some("redirect=%2F%20%2Fevil.example"), "/dashboard" },
)]
fn signed_in_user_is_bounced_off_entry_pages(path: &str, query: Option<&str>, expected: &str) {
    let live = token_expiring_at(NOW + 600);
    assert_eq!(guard().decide(path, query, Some(&live)), redirect(expected, false));
}

#[test]
fn stale_credential_may_visit_sign_in() {
    let stale = token_expiring_at(NOW - 1);
    assert_eq!(
        guard().decide("/sign-in", None, Some(&stale)),
        GuardDecision::Pass { cache: CachePolicy::Default }
    );
}

#[yare::parameterized(
    public_page = { "/", CachePolicy::Default },
    similar_prefix = { "/watchlists", CachePolicy::Default },
    static_asset = { "/assets/app.js", CachePolicy::Immutable },
)]
fn unguarded_paths_pass(path: &str, cache: CachePolicy) {
    assert_eq!(guard().decide(path, None, None), GuardDecision::Pass { cache });
}

#[yare::parameterized(
    exact = { "/watchlist", "/watchlist", true },
    nested = { "/watchlist/x", "/watchlist", true },
    sibling = { "/watchlists", "/watchlist", false },
    trailing_slash_prefix = { "/watchlist/x", "/watchlist/", true },
    shorter_path = { "/watch", "/watchlist", false },
    root = { "/anything", "/", true },
)]
fn segment_aware_prefixes(path: &str, prefix: &str, expected: bool) {
    assert_eq!(matches_prefix(path, prefix), expected);
}

#[test]
fn cache_policies_write_headers() {
    let mut headers = HeaderMap::new();
    CachePolicy::NoStore.apply(&mut headers);
    assert_eq!(headers.get(CACHE_CONTROL), Some(&HeaderValue::from_static(NO_STORE)));
    assert_eq!(headers.get(PRAGMA), Some(&HeaderValue::from_static("no-cache")));

    let mut headers = HeaderMap::new();
    CachePolicy::Immutable.apply(&mut headers);
    assert_eq!(headers.get(CACHE_CONTROL), Some(&HeaderValue::from_static(IMMUTABLE)));
    assert!(headers.get(PRAGMA).is_none());

    let mut headers = HeaderMap::new();
    CachePolicy::Default.apply(&mut headers);
    assert!(headers.is_empty());
}
