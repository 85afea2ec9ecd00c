// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Attack pattern configurations for security testing.
//!
//! Simulations run on a virtual clock: `interval_ms` is the simulated gap
//! between consecutive requests, so no test sleeps.

use std::time::Duration;

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Simulated milliseconds between consecutive requests
    pub interval_ms: u64,
    /// Number of unique source addresses
    pub unique_sources: usize,
    /// Number of unique account identities targeted
    pub unique_identities: usize,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            interval_ms: 100,
            unique_sources: 1,
            unique_identities: 1,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single source flooding a quota-guarded endpoint.
    pub fn quota_flood() -> Self {
        Self {
            total_requests: 200,
            interval_ms: 10,
            ..Default::default()
        }
    }

    /// Many sources, each staying at a low rate.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 500,
            interval_ms: 20,
            unique_sources: 100,
            ..Default::default()
        }
    }

    /// Single source pacing itself just under the quota.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 60,
            interval_ms: 7_000,
            ..Default::default()
        }
    }

    /// Repeated credential failures against one account from one source.
    pub fn brute_force() -> Self {
        Self {
            total_requests: 10,
            interval_ms: 1_000,
            ..Default::default()
        }
    }

    /// One source spraying failures across many accounts, one attempt each,
    /// staying under every per-account lockout threshold.
    pub fn credential_stuffing() -> Self {
        Self {
            total_requests: 50,
            interval_ms: 500,
            unique_identities: 50,
            ..Default::default()
        }
    }

    /// Simulated gap between consecutive requests.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Simulated duration of the whole attack.
    pub fn simulated_duration(&self) -> Duration {
        self.interval() * self.total_requests as u32
    }
}
