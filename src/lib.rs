// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Abuse Guard
//!
//! The adaptive request-throttling and brute-force-mitigation core of the
//! learning-platform backend:
//!
//! - Fixed-window request quotas per arbitrary key
//! - Sliding-window login-failure tracking with lockout (5 failures in
//!   5 minutes locks for 15 minutes by default)
//! - A bounded security event log whose correlator auto-blocks source
//!   addresses that cross per-kind thresholds
//! - A request gate that composes the stores, emits events on rejections,
//!   and returns structured decisions with retry hints
//!
//! All state is in-memory and process-lifetime; every store is safe to call
//! from many concurrent tasks.

pub mod blocklist;
pub mod config;
pub mod events;
pub mod gate;
pub mod handlers;
pub mod lockout;
pub mod metrics;
pub mod quota;

pub use blocklist::BlockRegistry;
pub use config::Config;
pub use events::{EventLog, EventSink, SecurityEvent, SecurityEventKind};
pub use gate::{CallContext, EndpointPolicy, GateDecision, KeyStrategy, RequestGate};
pub use lockout::LoginAttemptStore;
pub use quota::QuotaStore;
