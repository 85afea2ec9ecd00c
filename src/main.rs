// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Abuse Guard Service
//!
//! Runs the throttling/mitigation core as an external authorization service
//! for the learning-platform edge proxy.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `MAX_FAILURES`: Failures within the window that trigger a lockout
//!   (default: 5)
//! - `LOCKOUT_WINDOW_MS`: Failure-accumulation window (default: 300000)
//! - `LOCKOUT_BLOCK_MS`: Lockout duration (default: 900000)
//! - `EVENT_LOG_CAPACITY`: Security event ring buffer size (default: 1000)
//! - `ENFORCEMENT_ENABLED`: Set to `false` to bypass enforcement; intended
//!   for test harnesses only (default: true)

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use abuse_guard::{
    config::Config,
    handlers::{
        auth_check, auth_result, check, guard, health, list_blocks, metrics_text, report,
        unblock, AppState,
    },
    RequestGate,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        max_failures = config.lockout.max_failures,
        lockout_window_ms = config.lockout.window_ms,
        lockout_block_ms = config.lockout.block_ms,
        event_log_capacity = config.events.capacity,
        enforcement_enabled = config.gate.enforcement_enabled,
        "Starting abuse guard"
    );

    // Composition root: the gate owns every store for the process lifetime.
    // No background sweeper exists; eviction rides the stores' write paths.
    let gate = RequestGate::new(&config);
    let state = Arc::new(AppState {
        gate,
        config: config.clone(),
    });

    // Build router
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/check", post(check))
        .route("/guard", post(guard))
        .route("/auth/check", post(auth_check))
        .route("/auth/result", post(auth_result))
        .route("/report", post(report))
        .route("/blocks", get(list_blocks))
        .route("/blocks/:source", delete(unblock));

    if config.metrics.enabled {
        app = app.route(config.metrics.path.as_str(), get(metrics_text));
    }

    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        lockout: abuse_guard::config::LockoutConfig {
            max_failures: std::env::var("MAX_FAILURES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            window_ms: std::env::var("LOCKOUT_WINDOW_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300_000),
            block_ms: std::env::var("LOCKOUT_BLOCK_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900_000),
            ..Default::default()
        },
        events: abuse_guard::config::EventLogConfig {
            capacity: std::env::var("EVENT_LOG_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
        },
        gate: abuse_guard::config::GateConfig {
            enforcement_enabled: std::env::var("ENFORCEMENT_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            ..Default::default()
        },
        ..Default::default()
    }
}
