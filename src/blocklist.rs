// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Registry of source addresses denied all further processing.
//!
//! Entries are added by the event correlator and never expire inside this
//! core. Unblocking is an administrative action exposed over the admin
//! endpoint, not a timer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;

/// Audit record for one blocked source.
#[derive(Debug, Clone, Serialize)]
pub struct BlockEntry {
    /// Why the source was blocked
    pub reason: String,
    /// When the block was applied
    pub blocked_at: DateTime<Utc>,
}

/// Shared set of blocked source addresses.
#[derive(Default)]
pub struct BlockRegistry {
    entries: RwLock<HashMap<String, BlockEntry>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `source` is currently blocked.
    pub async fn is_blocked(&self, source: &str) -> bool {
        self.entries.read().await.contains_key(source)
    }

    /// Block `source`. Returns false if it was already blocked; the first
    /// block's reason and timestamp are kept.
    pub async fn block(&self, source: &str, reason: &str) -> bool {
        let mut entries = self.entries.write().await;
        if entries.contains_key(source) {
            return false;
        }
        warn!(source, reason, "blocking source address");
        entries.insert(
            source.to_string(),
            BlockEntry {
                reason: reason.to_string(),
                blocked_at: Utc::now(),
            },
        );
        true
    }

    /// Administrative unblock. Returns whether an entry was removed.
    pub async fn unblock(&self, source: &str) -> bool {
        let removed = self.entries.write().await.remove(source).is_some();
        if removed {
            warn!(source, "source address unblocked");
        }
        removed
    }

    /// Current blocks, for the admin listing endpoint.
    pub async fn snapshot(&self) -> Vec<(String, BlockEntry)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(source, entry)| (source.clone(), entry.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
