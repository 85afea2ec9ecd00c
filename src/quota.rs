// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window quota store.
//!
//! One counter per key, reset atomically when its window expires. All
//! callers sharing a key inside one window share one counter. The fixed
//! window is an accepted approximation over a sliding log: up to 2x the
//! limit can pass across a window boundary, in exchange for O(1) state per
//! key and no per-request timestamp log.

use crate::config::QuotaConfig;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// One rate-limit window for one key.
///
/// `count` only increases while `now < window_reset_at`; once the window has
/// passed the entry is logically expired and is replaced, never incremented.
#[derive(Debug)]
struct QuotaEntry {
    count: u32,
    window_reset_at: Instant,
}

/// Outcome of a quota consumption attempt.
#[derive(Debug, Clone, Copy)]
pub struct QuotaDecision {
    /// Whether the call is within its quota
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// Time until the window resets, relative to the evaluation instant
    pub reset_in: Duration,
    /// Instant at which the window resets
    pub reset_at: Instant,
}

/// Shared fixed-window counter store.
pub struct QuotaStore {
    entries: RwLock<HashMap<String, QuotaEntry>>,
    sweep_threshold: usize,
}

impl QuotaStore {
    /// Create a new quota store with the given configuration.
    pub fn new(config: &QuotaConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sweep_threshold: config.sweep_threshold,
        }
    }

    /// Consume one unit of quota for `key` against `limit` per `window`.
    pub async fn consume(&self, key: &str, limit: u32, window: Duration) -> QuotaDecision {
        self.consume_at(key, limit, window, Instant::now()).await
    }

    /// Consume with an explicit evaluation instant.
    pub async fn consume_at(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: Instant,
    ) -> QuotaDecision {
        let mut entries = self.entries.write().await;

        // No background timer exists; eviction piggybacks on the write path
        // once the map crosses the size ceiling.
        if entries.len() >= self.sweep_threshold {
            entries.retain(|_, entry| entry.window_reset_at > now);
        }

        if let Some(entry) = entries.get_mut(key) {
            if now < entry.window_reset_at {
                entry.count += 1;
                let allowed = entry.count <= limit;
                if !allowed {
                    debug!(key, count = entry.count, limit, "quota exceeded");
                }
                return QuotaDecision {
                    allowed,
                    remaining: limit.saturating_sub(entry.count),
                    reset_in: entry.window_reset_at - now,
                    reset_at: entry.window_reset_at,
                };
            }
        }

        // Absent or expired: start a fresh window with count = 1.
        let reset_at = now + window;
        entries.insert(
            key.to_string(),
            QuotaEntry {
                count: 1,
                window_reset_at: reset_at,
            },
        );
        QuotaDecision {
            allowed: true,
            remaining: limit.saturating_sub(1),
            reset_in: window,
            reset_at,
        }
    }

    /// Number of live entries, for tests and diagnostics.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
