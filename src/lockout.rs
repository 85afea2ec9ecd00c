// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Login attempt store: sliding-window failure tracking with lockout.
//!
//! Unlike the quota store's fixed window, failures here are a sliding log:
//! only attempts within the trailing window count toward the threshold. The
//! accumulation window and the lockout duration are independent tunables.

use crate::config::LockoutConfig;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Failure history for one (origin, identity) pair.
///
/// Every timestamp in `failures` lies within the configured window relative
/// to "now" at last prune. The entry is deleted once both fields are
/// empty/expired.
#[derive(Debug, Default)]
struct AttemptState {
    failures: Vec<Instant>,
    blocked_until: Option<Instant>,
}

impl AttemptState {
    fn prune(&mut self, now: Instant, config: &LockoutConfig) {
        let window = config.window();
        self.failures.retain(|t| *t + window >= now);
        if let Some(until) = self.blocked_until {
            if until <= now {
                self.blocked_until = None;
            }
        }
    }

    fn is_dead(&self) -> bool {
        self.failures.is_empty() && self.blocked_until.is_none()
    }
}

/// Outcome of recording a failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct LockoutStatus {
    /// Whether the key is now locked out
    pub locked: bool,
    /// When the lockout ends, if one is active
    pub blocked_until: Option<Instant>,
    /// Failures currently inside the sliding window
    pub recent_failures: u32,
}

/// Shared store of per-key failure history and lockout timers.
pub struct LoginAttemptStore {
    entries: RwLock<HashMap<String, AttemptState>>,
    config: LockoutConfig,
}

impl LoginAttemptStore {
    /// Create a new store with the given configuration.
    pub fn new(config: LockoutConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Whether `key` is currently locked out.
    pub async fn is_blocked(&self, key: &str) -> bool {
        self.blocked_until_at(key, Instant::now()).await.is_some()
    }

    pub async fn is_blocked_at(&self, key: &str, now: Instant) -> bool {
        self.blocked_until_at(key, now).await.is_some()
    }

    /// When the active lockout for `key` ends, if any.
    ///
    /// An expired lockout is cleared in place, and the entry is deleted
    /// entirely once its failures have aged out too.
    pub async fn blocked_until(&self, key: &str) -> Option<Instant> {
        self.blocked_until_at(key, Instant::now()).await
    }

    pub async fn blocked_until_at(&self, key: &str, now: Instant) -> Option<Instant> {
        let mut entries = self.entries.write().await;
        let state = entries.get_mut(key)?;

        if let Some(until) = state.blocked_until {
            if now < until {
                return Some(until);
            }
        }
        state.prune(now, &self.config);
        if state.is_dead() {
            entries.remove(key);
        }
        None
    }

    /// Record a failed attempt for `key`.
    pub async fn record_failure(&self, key: &str) -> LockoutStatus {
        self.record_failure_at(key, Instant::now()).await
    }

    /// Record a failed attempt with an explicit instant.
    ///
    /// Prunes the failure log to the sliding window, appends `now`, and
    /// starts a lockout when the count reaches the threshold. A further
    /// failure never extends an active lockout.
    pub async fn record_failure_at(&self, key: &str, now: Instant) -> LockoutStatus {
        let mut entries = self.entries.write().await;

        if entries.len() >= self.config.sweep_threshold {
            let config = &self.config;
            entries.retain(|_, state| {
                state.prune(now, config);
                !state.is_dead()
            });
        }

        let state = entries.entry(key.to_string()).or_default();
        state.prune(now, &self.config);
        state.failures.push(now);

        let recent_failures = state.failures.len() as u32;
        if recent_failures >= self.config.max_failures && state.blocked_until.is_none() {
            state.blocked_until = Some(now + self.config.block());
            warn!(key, recent_failures, "failure threshold reached, locking out");
        } else {
            debug!(key, recent_failures, "failed attempt recorded");
        }

        LockoutStatus {
            locked: state.blocked_until.is_some(),
            blocked_until: state.blocked_until,
            recent_failures,
        }
    }

    /// Unconditionally remove all state for `key`.
    ///
    /// Called on a successful authenticated operation.
    pub async fn clear(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Number of tracked keys, for tests and diagnostics.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Build the tracking key from a network origin and an identity claim.
///
/// The identity is trimmed and lower-cased so that "Alice@Example.com " and
/// "alice@example.com" accumulate against the same state. Failures against
/// different accounts from one origin, and against one account from
/// different origins, are tracked independently.
pub fn attempt_key(origin: &str, identity: &str) -> String {
    format!("{}|{}", origin, identity.trim().to_lowercase())
}
