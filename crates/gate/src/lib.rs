// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Marquee gate: CORS, rate limiting and credential verification in front of
//! the API, plus a navigation guard in front of the pages.

pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod guard;
pub mod rate_limit;
pub mod state;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use marquee_session::clock::SystemClock;
use marquee_session::provider::HttpIdentityProvider;

use crate::config::GateConfig;
use crate::state::GateState;
use crate::transport::build_router;

/// Run the gate until ctrl-c.
pub async fn run(config: GateConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let provider = HttpIdentityProvider::new(config.provider_config())?;
    let state = Arc::new(GateState::new(config, Arc::new(provider), Arc::new(SystemClock)));
    let router = build_router(state);

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
            }
            shutdown.cancel();
        });
    }

    let listener = TcpListener::bind(&addr).await?;
    info!("marquee gate listening on {addr}");
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    Ok(())
}
