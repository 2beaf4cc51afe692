use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::health::HealthState;
use crate::api::latency::CycleLatency;
use crate::state::ListingStore;

#[derive(Clone)]
pub struct ApiState {
    pub queries: Arc<Vec<String>>,
    pub store: Arc<ListingStore>,
    pub health: Arc<HealthState>,
    pub latency: Arc<CycleLatency>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/queries", get(get_queries))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<u64>,
    pub notifications_sent: u64,
    pub dispatch_failures: u64,
    pub queries: usize,
    /// Terms with a stored baseline.
    pub baselines: usize,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub has_baseline: bool,
    pub listings: usize,
    pub high_water_mark: Option<i64>,
    pub last_scan_at: Option<u64>,
    pub last_new: usize,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let last = state.health.last_cycle_at();
    Json(HealthResponse {
        // "starting" until the first cycle finishes.
        status: if state.health.cycles_completed() > 0 { "ok" } else { "starting" },
        cycles_completed: state.health.cycles_completed(),
        last_cycle_at: (last > 0).then_some(last),
        notifications_sent: state.health.notifications_sent(),
        dispatch_failures: state.health.dispatch_failures(),
        queries: state.queries.len(),
        baselines: state.store.query_count(),
    })
}

async fn get_queries(State(state): State<ApiState>) -> Json<Vec<QueryResponse>> {
    let rows = state
        .queries
        .iter()
        .map(|query| {
            let set = state.store.get(query);
            let status = state.health.term_status(query).unwrap_or_default();
            QueryResponse {
                query: query.clone(),
                has_baseline: set.is_some(),
                listings: set.as_ref().map_or(0, |s| s.len()),
                high_water_mark: set.as_ref().and_then(|s| s.high_water_mark()),
                last_scan_at: (status.last_scan_at > 0).then_some(status.last_scan_at),
                last_new: status.last_new,
                last_error: status.last_error,
            }
        })
        .collect();
    Json(rows)
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50_ms, p95_ms, p99_ms) = state.latency.percentiles();
    Json(LatencyResponse {
        samples: state.latency.len(),
        p50_ms,
        p95_ms,
        p99_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{test_listing, ListingSet};

    fn state() -> ApiState {
        ApiState {
            queries: Arc::new(vec!["lego".to_string(), "switch".to_string()]),
            store: ListingStore::new(),
            health: Arc::new(HealthState::new()),
            latency: Arc::new(CycleLatency::new()),
        }
    }

    #[tokio::test]
    async fn health_reports_starting_before_first_cycle() {
        let Json(h) = get_health(State(state())).await;
        assert_eq!(h.status, "starting");
        assert_eq!(h.queries, 2);
        assert!(h.last_cycle_at.is_none());
        assert_eq!(h.baselines, 0);
    }

    #[tokio::test]
    async fn queries_combine_store_and_term_status() {
        let st = state();
        st.store.put("lego", ListingSet::new(vec![test_listing(1, 10), test_listing(2, 40)]));
        st.health.record_term_success("lego", 1_000, 2);
        st.health.record_term_failure("switch", 1_001, "marketplace returned HTTP 503".to_string());

        let Json(rows) = get_queries(State(st)).await;
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].query, "lego");
        assert!(rows[0].has_baseline);
        assert_eq!(rows[0].listings, 2);
        assert_eq!(rows[0].high_water_mark, Some(40));
        assert_eq!(rows[0].last_new, 2);

        assert_eq!(rows[1].query, "switch");
        assert!(!rows[1].has_baseline);
        assert_eq!(rows[1].last_scan_at, Some(1_001));
        assert_eq!(rows[1].last_error.as_deref(), Some("marketplace returned HTTP 503"));
    }

    #[tokio::test]
    async fn latency_is_empty_without_cycles() {
        let Json(l) = get_stats_latency(State(state())).await;
        assert_eq!(l.samples, 0);
        assert!(l.p50_ms.is_none());
    }
}
