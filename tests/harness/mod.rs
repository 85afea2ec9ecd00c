// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for abuse guard attack simulation.
//!
//! This module provides utilities for simulating abuse patterns against the
//! request gate to validate the throttling and mitigation controls.

pub mod attacks;
pub mod generators;
pub mod metrics;
