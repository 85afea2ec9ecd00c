// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the abuse guard service.
//!
//! The service runs as an external authorization filter: the edge proxy
//! POSTs a description of each guarded call and reads the decision from the
//! body (`/check`, `/auth/*`), or proxies straight through `/guard`, which
//! renders denials as 429 responses with retry headers.
//!
//! Rejected callers get a uniform body and status regardless of which store
//! rejected them; the distinction stays in internal logs and metrics.

use crate::config::Config;
use crate::events::SecurityEventKind;
use crate::gate::{CallContext, EndpointPolicy, GateDecision, KeyStrategy, Rejection, RequestGate};
use crate::metrics;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared application state.
pub struct AppState {
    pub gate: RequestGate,
    pub config: Config,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Error response body. Deliberately uniform for every rejection kind.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub code: &'static str,
    pub retry_after_secs: u64,
}

/// Gate check request from the routing layer.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub ip: String,
    #[serde(default)]
    pub identity: Option<String>,
    pub endpoint: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub window_secs: Option<u64>,
    #[serde(default)]
    pub key_strategy: Option<KeyStrategy>,
}

/// Gate check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_epoch_secs: Option<i64>,
}

/// Authentication pre-check request.
#[derive(Debug, Deserialize)]
pub struct AuthCheckRequest {
    pub ip: String,
    pub identity: String,
    #[serde(default = "default_auth_endpoint")]
    pub endpoint: String,
}

/// Authentication outcome report.
#[derive(Debug, Deserialize)]
pub struct AuthResultRequest {
    pub ip: String,
    pub identity: String,
    pub success: bool,
    #[serde(default = "default_auth_endpoint")]
    pub endpoint: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResultResponse {
    pub recorded: bool,
    pub locked: bool,
}

/// Event report from an outer detector.
#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub ip: String,
    pub kind: SecurityEventKind,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_auth_endpoint() -> String {
    "/auth/login".to_string()
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "abuse-guard",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn policy_from(req: &CheckRequest, config: &Config) -> EndpointPolicy {
    EndpointPolicy {
        limit: req.limit.unwrap_or(config.quota.default_limit),
        window_secs: req.window_secs.unwrap_or(config.quota.default_window_secs),
        key_strategy: req.key_strategy.unwrap_or(KeyStrategy::ByOrigin),
    }
}

fn allowed_body(decision: &GateDecision) -> CheckResponse {
    let quota = match decision {
        GateDecision::Allowed { quota } => *quota,
        GateDecision::Rejected(_) => None,
    };
    CheckResponse {
        allowed: true,
        retry_after_secs: None,
        remaining: quota.map(|q| q.remaining),
        limit: quota.map(|q| q.limit),
        reset_epoch_secs: quota.map(|q| reset_epoch(q.reset_in)),
    }
}

fn rejected_body(rejection: &Rejection) -> CheckResponse {
    CheckResponse {
        allowed: false,
        retry_after_secs: Some(rejection.retry_after.as_secs()),
        remaining: rejection.quota.map(|q| q.remaining),
        limit: rejection.quota.map(|q| q.limit),
        reset_epoch_secs: rejection.quota.map(|q| reset_epoch(q.reset_in)),
    }
}

fn reset_epoch(reset_in: std::time::Duration) -> i64 {
    Utc::now().timestamp() + reset_in.as_secs() as i64
}

fn count_decision(decision: &GateDecision) {
    metrics::CHECKS_TOTAL.inc();
    match decision {
        GateDecision::Allowed { .. } => metrics::CHECKS_ALLOWED.inc(),
        GateDecision::Rejected(r) => {
            metrics::CHECKS_REJECTED
                .with_label_values(&[r.kind.as_str()])
                .inc();
        }
    }
}

/// Evaluate a quota-guarded call; the decision is returned in the body so
/// the edge proxy can render the response itself.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> impl IntoResponse {
    let policy = policy_from(&req, &state.config);
    let mut ctx = CallContext::new(&req.ip, &req.endpoint);
    if let Some(identity) = req.identity.as_deref() {
        ctx = ctx.with_identity(identity);
    }

    let decision = state.gate.check_request(&ctx, &policy).await;
    count_decision(&decision);

    match &decision {
        GateDecision::Allowed { .. } => {
            debug!(ip = %req.ip, endpoint = %req.endpoint, "request allowed");
            (StatusCode::OK, Json(allowed_body(&decision)))
        }
        GateDecision::Rejected(rejection) => {
            info!(
                ip = %req.ip,
                endpoint = %req.endpoint,
                kind = rejection.kind.as_str(),
                retry_after_secs = rejection.retry_after.as_secs(),
                "request rejected"
            );
            (StatusCode::OK, Json(rejected_body(rejection)))
        }
    }
}

/// Direct mode: denials render the full 429 contract.
pub async fn guard(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> Response {
    let policy = policy_from(&req, &state.config);
    let mut ctx = CallContext::new(&req.ip, &req.endpoint);
    if let Some(identity) = req.identity.as_deref() {
        ctx = ctx.with_identity(identity);
    }

    let decision = state.gate.check_request(&ctx, &policy).await;
    count_decision(&decision);

    match decision {
        GateDecision::Allowed { quota: Some(q) } => (
            StatusCode::OK,
            [
                ("X-RateLimit-Limit", q.limit.to_string()),
                ("X-RateLimit-Remaining", q.remaining.to_string()),
                ("X-RateLimit-Reset", reset_epoch(q.reset_in).to_string()),
            ],
            Json(allowed_body(&GateDecision::Allowed { quota: Some(q) })),
        )
            .into_response(),
        GateDecision::Allowed { quota: None } => {
            (StatusCode::OK, Json(allowed_body(&decision))).into_response()
        }
        GateDecision::Rejected(rejection) => rejection_response(&rejection),
    }
}

/// Render a rejection per the response contract: 429, Retry-After, and the
/// X-RateLimit trio when the quota store rejected. Same status and body for
/// every kind.
pub fn rejection_response(rejection: &Rejection) -> Response {
    let retry_secs = rejection.retry_after.as_secs();
    let body = ErrorResponse {
        error: "too many requests",
        code: "RATE_LIMITED",
        retry_after_secs: retry_secs,
    };

    match rejection.quota {
        Some(q) => (
            StatusCode::TOO_MANY_REQUESTS,
            [
                ("Retry-After", retry_secs.to_string()),
                ("X-RateLimit-Limit", q.limit.to_string()),
                ("X-RateLimit-Remaining", q.remaining.to_string()),
                ("X-RateLimit-Reset", reset_epoch(q.reset_in).to_string()),
            ],
            Json(body),
        )
            .into_response(),
        None => (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", retry_secs.to_string())],
            Json(body),
        )
            .into_response(),
    }
}

/// Lockout/block pre-check before the credential verifier runs.
pub async fn auth_check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuthCheckRequest>,
) -> impl IntoResponse {
    let ctx = CallContext::new(&req.ip, &req.endpoint).with_identity(&req.identity);
    let decision = state.gate.check_auth(&ctx).await;
    count_decision(&decision);

    match &decision {
        GateDecision::Allowed { .. } => (StatusCode::OK, Json(allowed_body(&decision))),
        GateDecision::Rejected(rejection) => {
            info!(
                ip = %req.ip,
                kind = rejection.kind.as_str(),
                "authentication attempt rejected"
            );
            (StatusCode::OK, Json(rejected_body(rejection)))
        }
    }
}

/// Record the credential verifier's outcome.
pub async fn auth_result(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuthResultRequest>,
) -> impl IntoResponse {
    let ctx = CallContext::new(&req.ip, &req.endpoint).with_identity(&req.identity);
    let status = state.gate.record_auth_result(&ctx, req.success).await;

    (
        StatusCode::OK,
        Json(AuthResultResponse {
            recorded: true,
            locked: status.map(|s| s.locked).unwrap_or(false),
        }),
    )
}

/// Accept an event from an outer detector.
pub async fn report(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReportRequest>,
) -> impl IntoResponse {
    let mut ctx = CallContext::new(&req.ip, req.endpoint.as_deref().unwrap_or(""));
    if let Some(user) = req.user_id.as_deref() {
        ctx = ctx.with_identity(user);
    }

    state.gate.report(req.kind, &ctx, req.metadata).await;
    metrics::REPORTED_EVENTS.inc();

    StatusCode::ACCEPTED
}

/// Administrative listing of blocked sources.
pub async fn list_blocks(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let blocks = state.gate.block_registry().snapshot().await;
    let body: Vec<Value> = blocks
        .into_iter()
        .map(|(source, entry)| {
            serde_json::json!({
                "source": source,
                "reason": entry.reason,
                "blocked_at": entry.blocked_at,
            })
        })
        .collect();
    Json(body)
}

/// Administrative unblock.
pub async fn unblock(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
) -> impl IntoResponse {
    if state.gate.block_registry().unblock(&source).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Prometheus metrics in text exposition format.
pub async fn metrics_text() -> impl IntoResponse {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let families = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buf) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {err}"),
        )
            .into_response();
    }
    (StatusCode::OK, buf).into_response()
}
