// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for gate decisions.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec,
};

lazy_static! {
    pub static ref CHECKS_TOTAL: IntCounter = register_int_counter!(
        "abuse_guard_checks_total",
        "Total gate checks evaluated"
    )
    .unwrap();
    pub static ref CHECKS_ALLOWED: IntCounter = register_int_counter!(
        "abuse_guard_checks_allowed_total",
        "Gate checks that were admitted"
    )
    .unwrap();
    pub static ref CHECKS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "abuse_guard_rejections_total",
        "Gate rejections by internal kind",
        &["kind"]
    )
    .unwrap();
    pub static ref REPORTED_EVENTS: IntCounter = register_int_counter!(
        "abuse_guard_reported_events_total",
        "Security events reported by outer detectors"
    )
    .unwrap();
}
