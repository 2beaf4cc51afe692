use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};

use crate::api::{CycleLatency, HealthState};
use crate::config::Config;
use crate::detector::new_listings;
use crate::error::{SnapshotFetchError, TermError};
use crate::notify::{format_listing, Notifier};
use crate::snapshot::{extract_listings, SnapshotSource};
use crate::state::ListingStore;
use crate::types::ListingSet;

/// What one term iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOutcome {
    /// First observation of the term: stored as baseline, nothing sent.
    Baseline { listings: usize },
    /// Nothing above the high-water mark.
    NoUpdate { listings: usize },
    /// New listings found and dispatched.
    Notified { new: usize, sent: usize, failed: usize },
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub terms: Vec<(String, Result<TermOutcome, TermError>)>,
    pub duration: Duration,
}

impl CycleReport {
    pub fn failed_terms(&self) -> usize {
        self.terms.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn notifications_sent(&self) -> usize {
        self.terms
            .iter()
            .map(|(_, r)| match r {
                Ok(TermOutcome::Notified { sent, .. }) => *sent,
                _ => 0,
            })
            .sum()
    }
}

/// Drives one scan cycle: for each watched query term, in order,
/// fetch → extract → diff → format → dispatch → store.
#[derive(Clone)]
pub struct Scanner {
    queries: Arc<Vec<String>>,
    marketplace_url: String,
    snapshot_timeout: Duration,
    source: Arc<dyn SnapshotSource>,
    notifier: Arc<dyn Notifier>,
    store: Arc<ListingStore>,
    health: Arc<HealthState>,
    latency: Arc<CycleLatency>,
}

impl Scanner {
    pub fn new(
        cfg: &Config,
        source: Arc<dyn SnapshotSource>,
        notifier: Arc<dyn Notifier>,
        store: Arc<ListingStore>,
        health: Arc<HealthState>,
        latency: Arc<CycleLatency>,
    ) -> Self {
        Self {
            queries: Arc::new(cfg.queries.clone()),
            marketplace_url: cfg.marketplace_url.clone(),
            snapshot_timeout: Duration::from_secs(cfg.snapshot_timeout_secs),
            source,
            notifier,
            store,
            health,
            latency,
        }
    }

    #[cfg(test)]
    pub fn with_snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.snapshot_timeout = timeout;
        self
    }

    pub fn queries(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.queries)
    }

    /// Run every term once, strictly sequentially. A failing term is logged
    /// and recorded; it never stops the remaining terms.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        info!(terms = self.queries.len(), "Scan cycle started");

        let mut report = CycleReport::default();
        for query in self.queries.iter() {
            let result = self.scan_term_isolated(query).await;
            match &result {
                Ok(outcome) => {
                    let new = match outcome {
                        TermOutcome::Notified { new, .. } => *new,
                        _ => 0,
                    };
                    self.health.record_term_success(query, now_secs(), new);
                }
                Err(e) => {
                    error!(query = %query, error = %e, "Scan of \"{query}\" failed: {e}");
                    self.health.record_term_failure(query, now_secs(), e.to_string());
                }
            }
            report.terms.push((query.clone(), result));
        }

        report.duration = started.elapsed();
        self.latency.record(report.duration);
        self.health.record_cycle(now_secs());

        info!(
            terms = report.terms.len(),
            failed = report.failed_terms(),
            sent = report.notifications_sent(),
            duration_ms = report.duration.as_millis() as u64,
            "Scan cycle complete: {} terms, {} failed, {} notifications in {:.1}s",
            report.terms.len(),
            report.failed_terms(),
            report.notifications_sent(),
            report.duration.as_secs_f64(),
        );
        report
    }

    /// Term boundary. The term runs on its own task so a panic inside it
    /// surfaces as `TermError::Unexpected` instead of unwinding the cycle.
    async fn scan_term_isolated(&self, query: &str) -> Result<TermOutcome, TermError> {
        let scanner = self.clone();
        let owned = query.to_string();
        match tokio::spawn(async move { scanner.scan_term(&owned).await }).await {
            Ok(result) => result,
            Err(join_err) => Err(TermError::Unexpected(join_err.to_string())),
        }
    }

    /// One term iteration. The term lock is held from the store read through
    /// the store write, so overlapping cycles cannot race on this term.
    pub async fn scan_term(&self, query: &str) -> Result<TermOutcome, TermError> {
        let _guard = self.store.lock_query(query).await;
        info!(query = %query, "Loading \"{query}\"");

        let doc = tokio::time::timeout(self.snapshot_timeout, self.source.fetch(query))
            .await
            .map_err(|_| SnapshotFetchError::Timeout(self.snapshot_timeout))??;

        let (current, stats) = extract_listings(&doc, &self.marketplace_url)?;
        debug!(
            query = %query,
            cards = stats.cards_total,
            accepted = stats.accepted,
            no_id = stats.rejected_no_id,
            zero_id = stats.rejected_zero_id,
            promoted = stats.rejected_promoted,
            bumped = stats.rejected_bumped,
            malformed = stats.rejected_malformed,
            duplicate = stats.rejected_duplicate,
            rejected = stats.rejected(),
            "[FILTER] {} of {} cards eligible",
            stats.accepted,
            stats.cards_total,
        );

        let outcome = match self.store.get(query) {
            None => {
                info!(
                    query = %query,
                    listings = current.len(),
                    "Checking \"{query}\"... populating the listing for the first time"
                );
                TermOutcome::Baseline { listings: current.len() }
            }
            Some(previous) => {
                let fresh = new_listings(&previous, &current);
                if fresh.is_empty() {
                    info!(query = %query, "There is no update for \"{query}\"");
                    TermOutcome::NoUpdate { listings: current.len() }
                } else {
                    info!(
                        query = %query,
                        new = fresh.len(),
                        "There is an update for \"{query}\": {} new",
                        fresh.len()
                    );
                    let (sent, failed) = self.dispatch(query, &fresh).await;
                    TermOutcome::Notified { new: fresh.len(), sent, failed }
                }
            }
        };

        // Stored regardless of per-message dispatch results.
        self.store.put(query, current);
        Ok(outcome)
    }

    /// Send one message per listing, in order. Returns (sent, failed).
    async fn dispatch(&self, query: &str, fresh: &ListingSet) -> (usize, usize) {
        let mut sent = 0usize;
        let mut failed = 0usize;
        for listing in fresh {
            let message = format_listing(listing);
            match self.notifier.send(&message).await {
                Ok(()) => {
                    sent += 1;
                    self.health.inc_notifications_sent();
                }
                Err(e) => {
                    failed += 1;
                    self.health.inc_dispatch_failures();
                    warn!(
                        query = %query,
                        listing_id = listing.listing_id,
                        error = %e,
                        "Notification for listing {} failed: {e}",
                        listing.listing_id,
                    );
                }
            }
        }
        (sent, failed)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
