//! Shared health state for the /health and /queries endpoints.
//! Updated by the Scanner after every term and every cycle.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

/// Result of the most recent scan of one query term.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TermStatus {
    /// Unix seconds of the last scan attempt.
    pub last_scan_at: u64,
    /// New listings found by the last successful scan.
    pub last_new: usize,
    /// Error from the last scan, cleared on the next success.
    pub last_error: Option<String>,
}

/// Shared health metrics. Updated by scanner components, read by API.
#[derive(Default)]
pub struct HealthState {
    cycles_completed: AtomicU64,
    /// Unix seconds of the last finished cycle (0 = none yet).
    last_cycle_at: AtomicU64,
    notifications_sent: AtomicU64,
    dispatch_failures: AtomicU64,
    terms: DashMap<String, TermStatus>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, finished_at: u64) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_at.store(finished_at, Ordering::Relaxed);
    }

    pub fn inc_notifications_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dispatch_failures(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_term_success(&self, query: &str, at: u64, new: usize) {
        self.terms.insert(
            query.to_string(),
            TermStatus { last_scan_at: at, last_new: new, last_error: None },
        );
    }

    /// Keeps `last_new` from the previous success.
    pub fn record_term_failure(&self, query: &str, at: u64, error: String) {
        let mut entry = self.terms.entry(query.to_string()).or_default();
        entry.last_scan_at = at;
        entry.last_error = Some(error);
    }

    pub fn term_status(&self, query: &str) -> Option<TermStatus> {
        self.terms.get(query).map(|s| s.clone())
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn last_cycle_at(&self) -> u64 {
        self.last_cycle_at.load(Ordering::Relaxed)
    }

    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    pub fn dispatch_failures(&self) -> u64 {
        self.dispatch_failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_keeps_last_new_and_success_clears_error() {
        let health = HealthState::new();
        health.record_term_success("lego", 100, 3);
        health.record_term_failure("lego", 200, "timed out after 60s".to_string());

        let s = health.term_status("lego").unwrap();
        assert_eq!(s.last_scan_at, 200);
        assert_eq!(s.last_new, 3);
        assert_eq!(s.last_error.as_deref(), Some("timed out after 60s"));

        health.record_term_success("lego", 300, 0);
        assert!(health.term_status("lego").unwrap().last_error.is_none());
    }

    #[test]
    fn cycle_counter_advances() {
        let health = HealthState::new();
        health.record_cycle(42);
        health.record_cycle(43);
        assert_eq!(health.cycles_completed(), 2);
        assert_eq!(health.last_cycle_at(), 43);
    }
}
