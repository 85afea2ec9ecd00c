// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request gate: the policy enforcement seam in front of the stores.
//!
//! Per guarded call the gate checks the block registry first, then the quota
//! or lockout store, emits a security event on every rejection, and hands
//! back a decision value. Rejections are data, not errors: nothing here
//! unwinds a call stack.
//!
//! The caller-visible rejection never says which store rejected; the
//! distinction lives in `RejectionKind` for internal logs and metrics only.

use crate::blocklist::BlockRegistry;
use crate::config::{Config, GateConfig};
use crate::events::{EventLog, SecurityEvent, SecurityEventKind};
use crate::lockout::{attempt_key, LockoutStatus, LoginAttemptStore};
use crate::quota::QuotaStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// How the throttling key is derived from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategy {
    /// Track by network origin
    ByOrigin,
    /// Track by normalized authenticated identity
    ByAuthenticatedIdentity,
    /// Track by origin and identity combined
    ByOriginAndIdentity,
}

/// Declared throttling policy for one guarded endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EndpointPolicy {
    pub limit: u32,
    pub window_secs: u64,
    pub key_strategy: KeyStrategy,
}

impl EndpointPolicy {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Description of one incoming call, as supplied by the routing layer.
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    /// Network-origin identifier of the caller
    pub source: &'a str,
    /// Authenticated or claimed identity, when the endpoint has one
    pub identity: Option<&'a str>,
    /// Guarded endpoint being called
    pub endpoint: &'a str,
}

impl<'a> CallContext<'a> {
    pub fn new(source: &'a str, endpoint: &'a str) -> Self {
        Self {
            source,
            identity: None,
            endpoint,
        }
    }

    pub fn with_identity(mut self, identity: &'a str) -> Self {
        self.identity = Some(identity);
        self
    }
}

/// Internal rejection taxonomy. Not exposed to callers verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    QuotaExceeded,
    AccountLocked,
    SourceBlocked,
}

impl RejectionKind {
    /// Label for internal logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "quota_exceeded",
            Self::AccountLocked => "account_locked",
            Self::SourceBlocked => "source_blocked",
        }
    }
}

/// Quota figures attached to quota-originated decisions, for the
/// X-RateLimit response headers.
#[derive(Debug, Clone, Copy)]
pub struct QuotaInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset_in: Duration,
}

/// A structured rejection carrying a retry hint.
#[derive(Debug, Clone, Copy)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub retry_after: Duration,
    /// Present only when the rejection originated from the quota store
    pub quota: Option<QuotaInfo>,
}

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy)]
pub enum GateDecision {
    Allowed {
        /// Present when a quota was consumed for this call
        quota: Option<QuotaInfo>,
    },
    Rejected(Rejection),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed { .. })
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            GateDecision::Allowed { .. } => None,
            GateDecision::Rejected(r) => Some(r),
        }
    }
}

/// The long-lived enforcement instance owning all throttling state.
///
/// One per process; the composition root constructs the stores and injects
/// them here. Nothing outside the gate mutates them directly.
pub struct RequestGate {
    quota: QuotaStore,
    attempts: LoginAttemptStore,
    events: EventLog,
    blocks: Arc<BlockRegistry>,
    config: GateConfig,
}

impl RequestGate {
    /// Construct the gate and all its stores from one configuration.
    pub fn new(config: &Config) -> Self {
        let blocks = Arc::new(BlockRegistry::new());
        Self::from_parts(
            QuotaStore::new(&config.quota),
            LoginAttemptStore::new(config.lockout.clone()),
            EventLog::new(&config.events, blocks.clone()),
            blocks,
            config.gate.clone(),
        )
    }

    /// Assemble a gate from pre-built stores.
    ///
    /// `events` must share `blocks` with the gate, or correlator blocks will
    /// not short-circuit subsequent calls.
    pub fn from_parts(
        quota: QuotaStore,
        attempts: LoginAttemptStore,
        events: EventLog,
        blocks: Arc<BlockRegistry>,
        config: GateConfig,
    ) -> Self {
        Self {
            quota,
            attempts,
            events,
            blocks,
            config,
        }
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    pub fn block_registry(&self) -> &Arc<BlockRegistry> {
        &self.blocks
    }

    /// Evaluate a quota-guarded call.
    pub async fn check_request(
        &self,
        ctx: &CallContext<'_>,
        policy: &EndpointPolicy,
    ) -> GateDecision {
        self.check_request_at(ctx, policy, Instant::now()).await
    }

    pub async fn check_request_at(
        &self,
        ctx: &CallContext<'_>,
        policy: &EndpointPolicy,
        now: Instant,
    ) -> GateDecision {
        if !self.config.enforcement_enabled {
            return GateDecision::Allowed { quota: None };
        }

        if let Some(rejection) = self.check_source_block(ctx).await {
            return GateDecision::Rejected(rejection);
        }

        let key = self.derive_key(ctx, policy.key_strategy);
        let decision = self
            .quota
            .consume_at(&key, policy.limit, policy.window(), now)
            .await;

        if decision.allowed {
            GateDecision::Allowed {
                quota: Some(QuotaInfo {
                    limit: policy.limit,
                    remaining: decision.remaining,
                    reset_in: decision.reset_in,
                }),
            }
        } else {
            self.events
                .register(
                    SecurityEvent::new(SecurityEventKind::QuotaExceeded, ctx.source)
                        .with_endpoint(ctx.endpoint)
                        .with_metadata("limit", Value::from(policy.limit))
                        .with_metadata("window_secs", Value::from(policy.window_secs)),
                )
                .await;
            GateDecision::Rejected(Rejection {
                kind: RejectionKind::QuotaExceeded,
                retry_after: decision.reset_in,
                quota: Some(QuotaInfo {
                    limit: policy.limit,
                    remaining: 0,
                    reset_in: decision.reset_in,
                }),
            })
        }
    }

    /// Pre-check an authentication-guarded call, before the credential
    /// verifier runs.
    pub async fn check_auth(&self, ctx: &CallContext<'_>) -> GateDecision {
        self.check_auth_at(ctx, Instant::now()).await
    }

    pub async fn check_auth_at(&self, ctx: &CallContext<'_>, now: Instant) -> GateDecision {
        if !self.config.enforcement_enabled {
            return GateDecision::Allowed { quota: None };
        }

        if let Some(rejection) = self.check_source_block(ctx).await {
            return GateDecision::Rejected(rejection);
        }

        let key = self.auth_key(ctx);
        if let Some(until) = self.attempts.blocked_until_at(&key, now).await {
            debug!(source = ctx.source, "attempt rejected by active lockout");
            // Still an authentication failure from the correlator's point of
            // view: hammering a locked account escalates to an IP block. The
            // lockout itself is not extended.
            self.events
                .register(
                    self.event_for(SecurityEventKind::AuthenticationFailed, ctx)
                        .with_metadata("lockout", Value::Bool(true)),
                )
                .await;
            return GateDecision::Rejected(Rejection {
                kind: RejectionKind::AccountLocked,
                retry_after: until - now,
                quota: None,
            });
        }

        GateDecision::Allowed { quota: None }
    }

    /// Record the credential verifier's outcome for an attempt that passed
    /// `check_auth`.
    pub async fn record_auth_result(
        &self,
        ctx: &CallContext<'_>,
        success: bool,
    ) -> Option<LockoutStatus> {
        self.record_auth_result_at(ctx, success, Instant::now())
            .await
    }

    pub async fn record_auth_result_at(
        &self,
        ctx: &CallContext<'_>,
        success: bool,
        now: Instant,
    ) -> Option<LockoutStatus> {
        if !self.config.enforcement_enabled {
            return None;
        }

        let key = self.auth_key(ctx);
        if success {
            self.attempts.clear(&key).await;
            return None;
        }

        let status = self.attempts.record_failure_at(&key, now).await;
        self.events
            .register(self.event_for(SecurityEventKind::AuthenticationFailed, ctx))
            .await;
        Some(status)
    }

    /// Feed an event from an outer detector (token integrity checks,
    /// injection scanners) into the log.
    pub async fn report(
        &self,
        kind: SecurityEventKind,
        ctx: &CallContext<'_>,
        metadata: Map<String, Value>,
    ) {
        if !self.config.enforcement_enabled {
            return;
        }
        let mut event = self.event_for(kind, ctx);
        event.metadata = metadata;
        self.events.register(event).await;
    }

    async fn check_source_block(&self, ctx: &CallContext<'_>) -> Option<Rejection> {
        if !self.blocks.is_blocked(ctx.source).await {
            return None;
        }
        debug!(source = ctx.source, "rejecting call from blocked source");
        self.events
            .register(self.event_for(SecurityEventKind::BlockedSourceRejected, ctx))
            .await;
        Some(Rejection {
            kind: RejectionKind::SourceBlocked,
            retry_after: self.config.source_block_retry_hint(),
            quota: None,
        })
    }

    fn event_for(&self, kind: SecurityEventKind, ctx: &CallContext<'_>) -> SecurityEvent {
        let mut event = SecurityEvent::new(kind, ctx.source).with_endpoint(ctx.endpoint);
        if let Some(identity) = ctx.identity {
            event = event.with_user(identity);
        }
        event
    }

    fn derive_key(&self, ctx: &CallContext<'_>, strategy: KeyStrategy) -> String {
        match strategy {
            KeyStrategy::ByOrigin => ctx.source.to_string(),
            KeyStrategy::ByAuthenticatedIdentity => match ctx.identity {
                Some(identity) => identity.trim().to_lowercase(),
                // Unauthenticated caller on an identity-keyed endpoint:
                // fall back to the origin so the call is still throttled.
                None => ctx.source.to_string(),
            },
            KeyStrategy::ByOriginAndIdentity => {
                attempt_key(ctx.source, ctx.identity.unwrap_or_default())
            }
        }
    }

    fn auth_key(&self, ctx: &CallContext<'_>) -> String {
        attempt_key(ctx.source, ctx.identity.unwrap_or_default())
    }
}
