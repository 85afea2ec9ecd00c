// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for attack simulation results.

use std::collections::HashMap;

/// Possible outcomes for a simulated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Admitted by the gate (for auth runs: reached the credential verifier)
    Allowed,
    QuotaExceeded,
    AccountLocked,
    SourceBlocked,
}

/// Collects outcomes during an attack simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    outcomes: HashMap<Outcome, usize>,
    requests_per_source: HashMap<String, usize>,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, source: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self
            .requests_per_source
            .entry(source.to_string())
            .or_insert(0) += 1;
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Ratio of rejected to total requests.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        let allowed = self.count(Outcome::Allowed);
        (total - allowed) as f64 / total as f64
    }

    pub fn unique_sources(&self) -> usize {
        self.requests_per_source.len()
    }

    /// Generate a summary report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            quota_exceeded: self.count(Outcome::QuotaExceeded),
            account_locked: self.count(Outcome::AccountLocked),
            source_blocked: self.count(Outcome::SourceBlocked),
            block_rate: self.block_rate(),
            unique_sources: self.unique_sources(),
        }
    }
}

/// Summary report of attack metrics.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub quota_exceeded: usize,
    pub account_locked: usize,
    pub source_blocked: usize,
    pub block_rate: f64,
    pub unique_sources: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Attack Metrics Report ===")?;
        writeln!(f, "Total Requests:    {}", self.total_requests)?;
        writeln!(f, "Allowed:           {}", self.allowed)?;
        writeln!(f, "Quota Exceeded:    {}", self.quota_exceeded)?;
        writeln!(f, "Account Locked:    {}", self.account_locked)?;
        writeln!(f, "Source Blocked:    {}", self.source_blocked)?;
        writeln!(f, "Block Rate:        {:.1}%", self.block_rate * 100.0)?;
        writeln!(f, "Unique Sources:    {}", self.unique_sources)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let mut metrics = AttackMetrics::new();
        metrics.record(Outcome::Allowed, "10.0.0.1");
        metrics.record(Outcome::Allowed, "10.0.0.1");
        metrics.record(Outcome::QuotaExceeded, "10.0.0.2");

        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.count(Outcome::Allowed), 2);
        assert_eq!(metrics.count(Outcome::QuotaExceeded), 1);
        assert_eq!(metrics.unique_sources(), 2);
    }

    #[test]
    fn test_block_rate() {
        let mut metrics = AttackMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Allowed, "10.0.0.1");
        }
        for _ in 0..7 {
            metrics.record(Outcome::SourceBlocked, "10.0.0.1");
        }
        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
    }
}
