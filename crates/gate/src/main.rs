// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use marquee_gate::config::{GateConfig, LogFormat};

#[tokio::main]
async fn main() {
    let config = GateConfig::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    if let Err(e) = marquee_gate::run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
