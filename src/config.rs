// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the abuse guard service.
//!
//! Every tunable the stores consume lives here so the composition root can
//! construct the whole core from one deserialized value. Defaults match the
//! platform's observed production settings (5-minute failure window, 5
//! failures, 15-minute lockout).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the abuse guard service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Quota store configuration
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Login attempt store configuration
    #[serde(default)]
    pub lockout: LockoutConfig,

    /// Security event log configuration
    #[serde(default)]
    pub events: EventLogConfig,

    /// Request gate configuration
    #[serde(default)]
    pub gate: GateConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Quota store tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Map size at which expired entries are swept on the write path
    /// (default: 10000)
    #[serde(default = "default_sweep_threshold")]
    pub sweep_threshold: usize,

    /// Quota applied when an endpoint declares no explicit limit
    /// (default: 60)
    #[serde(default = "default_quota_limit")]
    pub default_limit: u32,

    /// Window applied when an endpoint declares no explicit window in
    /// seconds (default: 60)
    #[serde(default = "default_quota_window_secs")]
    pub default_window_secs: u64,
}

/// Login attempt store tunables.
///
/// The failure-accumulation window and the lockout duration answer different
/// questions ("how fast were failures observed" vs "how long is the penalty")
/// and are tuned independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Sliding window for counting failures in milliseconds
    /// (default: 300000 = 5 minutes)
    #[serde(default = "default_lockout_window_ms")]
    pub window_ms: u64,

    /// Failure count within the window that triggers a lockout (default: 5)
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Lockout duration in milliseconds (default: 900000 = 15 minutes)
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,

    /// Map size at which dead entries are swept on the write path
    /// (default: 10000)
    #[serde(default = "default_sweep_threshold")]
    pub sweep_threshold: usize,
}

/// Security event log tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    /// Ring buffer capacity; oldest events are evicted first (default: 1000)
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

/// Request gate tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// When false, every call is admitted without touching the stores.
    /// Exists so test harnesses can bypass enforcement deterministically;
    /// never driven by ambient environment state.
    #[serde(default = "default_true")]
    pub enforcement_enabled: bool,

    /// Retry hint in seconds returned to callers rejected because their
    /// source address is blocked (default: 3600). Blocks have no expiry, so
    /// the hint is nominal and deliberately uninformative.
    #[serde(default = "default_source_block_retry_hint")]
    pub source_block_retry_hint_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_sweep_threshold() -> usize {
    10_000
}

fn default_quota_limit() -> u32 {
    60
}

fn default_quota_window_secs() -> u64 {
    60
}

fn default_lockout_window_ms() -> u64 {
    300_000 // 5 minutes
}

fn default_max_failures() -> u32 {
    5
}

fn default_block_ms() -> u64 {
    900_000 // 15 minutes
}

fn default_event_capacity() -> usize {
    1000
}

fn default_source_block_retry_hint() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            quota: QuotaConfig::default(),
            lockout: LockoutConfig::default(),
            events: EventLogConfig::default(),
            gate: GateConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            sweep_threshold: default_sweep_threshold(),
            default_limit: default_quota_limit(),
            default_window_secs: default_quota_window_secs(),
        }
    }
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            window_ms: default_lockout_window_ms(),
            max_failures: default_max_failures(),
            block_ms: default_block_ms(),
            sweep_threshold: default_sweep_threshold(),
        }
    }
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enforcement_enabled: default_true(),
            source_block_retry_hint_secs: default_source_block_retry_hint(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl LockoutConfig {
    /// Get the failure-accumulation window duration
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Get the lockout duration
    pub fn block(&self) -> Duration {
        Duration::from_millis(self.block_ms)
    }
}

impl QuotaConfig {
    /// Get the default quota window duration
    pub fn default_window(&self) -> Duration {
        Duration::from_secs(self.default_window_secs)
    }
}

impl GateConfig {
    /// Get the nominal retry hint for blocked sources
    pub fn source_block_retry_hint(&self) -> Duration {
        Duration::from_secs(self.source_block_retry_hint_secs)
    }
}
