// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Security event log and correlator.
//!
//! Events are immutable facts appended to a capped ring buffer. On every
//! append the correlator counts prior events of the same kind from the same
//! source inside a per-kind lookback window; at the threshold it synthesizes
//! a `suspicious-activity` event and blocks the source. Threshold rules are
//! deliberately simple and explainable: false positives lock real users out,
//! and the log must be auditable after the fact.
//!
//! Sink failures never reach the request path: a security event that cannot
//! be persisted is logged locally and dropped.

use crate::blocklist::BlockRegistry;
use crate::config::EventLogConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Enumerated kinds of security-relevant events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityEventKind {
    /// A caller exhausted its request quota
    QuotaExceeded,
    /// A credential check failed, or an attempt hit an active lockout
    AuthenticationFailed,
    /// A forged or tampered request token was detected
    IntegrityCheckFailed,
    /// Input matching an injection signature was detected
    InjectionAttempt,
    /// An already-blocked source was turned away; carries no correlation rule
    BlockedSourceRejected,
    /// Derived by the correlator when a threshold is reached
    SuspiciousActivity,
}

impl std::fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::QuotaExceeded => "quota-exceeded",
            Self::AuthenticationFailed => "authentication-failed",
            Self::IntegrityCheckFailed => "integrity-check-failed",
            Self::InjectionAttempt => "injection-attempt",
            Self::BlockedSourceRejected => "blocked-source-rejected",
            Self::SuspiciousActivity => "suspicious-activity",
        };
        write!(f, "{s}")
    }
}

/// An immutable security event. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    pub kind: SecurityEventKind,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl SecurityEvent {
    pub fn new(kind: SecurityEventKind, source: &str) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            source: source.to_string(),
            user_id: None,
            endpoint: None,
            metadata: Map::new(),
        }
    }

    /// Override the timestamp; used by tests and by callers replaying facts.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Threshold rule: how many events of one kind from one source inside the
/// lookback window amount to suspicious activity.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationRule {
    pub kind: SecurityEventKind,
    pub lookback: Duration,
    pub threshold: usize,
}

/// Default rule table.
pub fn default_rules() -> Vec<CorrelationRule> {
    vec![
        CorrelationRule {
            kind: SecurityEventKind::QuotaExceeded,
            lookback: Duration::from_secs(30 * 60),
            threshold: 3,
        },
        CorrelationRule {
            kind: SecurityEventKind::AuthenticationFailed,
            lookback: Duration::from_secs(15 * 60),
            threshold: 5,
        },
        CorrelationRule {
            kind: SecurityEventKind::IntegrityCheckFailed,
            lookback: Duration::from_secs(5 * 60),
            threshold: 5,
        },
        CorrelationRule {
            kind: SecurityEventKind::InjectionAttempt,
            lookback: Duration::from_secs(10 * 60),
            threshold: 2,
        },
    ]
}

/// Sink error types.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for security events outside the in-memory log.
///
/// Implementations must not block on external resources from the request
/// path; a failed `record` is logged and swallowed by the event log.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &SecurityEvent) -> Result<(), SinkError>;
}

/// Default sink: a structured audit record on the tracing pipeline.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &SecurityEvent) -> Result<(), SinkError> {
        let payload = serde_json::to_string(event)?;
        info!(target: "audit", kind = %event.kind, source = %event.source, %payload, "security event");
        Ok(())
    }
}

/// Capped ring buffer of security events with synchronous correlation.
pub struct EventLog {
    capacity: usize,
    events: RwLock<VecDeque<SecurityEvent>>,
    rules: Vec<CorrelationRule>,
    blocks: Arc<BlockRegistry>,
    sink: Box<dyn EventSink>,
}

impl EventLog {
    /// Create a log with the default rule table and tracing sink.
    pub fn new(config: &EventLogConfig, blocks: Arc<BlockRegistry>) -> Self {
        Self {
            capacity: config.capacity,
            events: RwLock::new(VecDeque::new()),
            rules: default_rules(),
            blocks,
            sink: Box::new(TracingSink),
        }
    }

    /// Replace the rule table.
    pub fn with_rules(mut self, rules: Vec<CorrelationRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the sink.
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Append an event and run correlation.
    pub async fn register(&self, event: SecurityEvent) {
        self.sink_event(&event);

        let correlated = {
            let mut events = self.events.write().await;
            events.push_back(event.clone());
            while events.len() > self.capacity {
                events.pop_front();
            }

            self.rules
                .iter()
                .find(|r| r.kind == event.kind)
                .and_then(|rule| {
                    let count = events
                        .iter()
                        .filter(|e| {
                            e.kind == event.kind
                                && e.source == event.source
                                && within_lookback(event.timestamp, e.timestamp, rule.lookback)
                        })
                        .count();
                    (count >= rule.threshold).then_some((*rule, count))
                })
        };

        if let Some((rule, count)) = correlated {
            let reason = format!(
                "{} {} events within {}s",
                count,
                event.kind,
                rule.lookback.as_secs()
            );
            // First block wins; the derived event is only synthesized when
            // the block is new, so a hammering source cannot flood the log
            // with suspicious-activity entries.
            if self.blocks.block(&event.source, &reason).await {
                let derived = SecurityEvent::new(SecurityEventKind::SuspiciousActivity, &event.source)
                    .at(event.timestamp)
                    .with_metadata("trigger", Value::String(event.kind.to_string()))
                    .with_metadata("count", Value::from(count))
                    .with_metadata("lookback_secs", Value::from(rule.lookback.as_secs()));
                self.sink_event(&derived);

                let mut events = self.events.write().await;
                events.push_back(derived);
                while events.len() > self.capacity {
                    events.pop_front();
                }
            }
        }
    }

    fn sink_event(&self, event: &SecurityEvent) {
        // A failure to persist a security event must never fail the request
        // being evaluated.
        if let Err(err) = self.sink.record(event) {
            warn!(error = %err, kind = %event.kind, "event sink failed, dropping record");
        }
    }

    /// Events of `kind` from `source` within `window` of `now`.
    pub async fn events_by_kind_and_source(
        &self,
        kind: SecurityEventKind,
        source: &str,
        window: Duration,
    ) -> Vec<SecurityEvent> {
        self.events_by_kind_and_source_at(kind, source, window, Utc::now())
            .await
    }

    pub async fn events_by_kind_and_source_at(
        &self,
        kind: SecurityEventKind,
        source: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Vec<SecurityEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| {
                e.kind == kind && e.source == source && within_lookback(now, e.timestamp, window)
            })
            .cloned()
            .collect()
    }

    /// All retained events from `source`, oldest first.
    pub async fn events_by_source(&self, source: &str) -> Vec<SecurityEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.source == source)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

/// Whether `older` falls inside `lookback` of `newer`, inclusive.
fn within_lookback(newer: DateTime<Utc>, older: DateTime<Utc>, lookback: Duration) -> bool {
    match newer.signed_duration_since(older).to_std() {
        Ok(age) => age <= lookback,
        // `older` is in the future of `newer`; outside the window.
        Err(_) => false,
    }
}
