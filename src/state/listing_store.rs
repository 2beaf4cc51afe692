use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::ListingSet;

// ---------------------------------------------------------------------------
// ListingStore
// ---------------------------------------------------------------------------

/// Query term → last observed ListingSet. In-memory for the process lifetime;
/// no eviction, no capacity bound.
///
/// Writers must hold the term's lock (see [`ListingStore::lock_query`]) across
/// the whole get → diff → put sequence. Two cycles that overlap on the same
/// term are serialized there; different terms never contend.
pub struct ListingStore {
    /// query → most recent ListingSet
    sets: DashMap<String, ListingSet>,
    /// query → per-term serialization lock
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ListingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, query: &str) -> Option<ListingSet> {
        self.sets.get(query).map(|s| s.clone())
    }

    /// Replace the term's ListingSet wholesale.
    pub fn put(&self, query: &str, set: ListingSet) {
        self.sets.insert(query.to_string(), set);
    }

    /// Acquire the term's lock. Held until the returned guard is dropped.
    pub async fn lock_query(&self, query: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the DashMap shard is not held across the await.
        let lock = Arc::clone(
            self.locks
                .entry(query.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        lock.lock_owned().await
    }

    pub fn query_count(&self) -> usize {
        self.sets.len()
    }
}

impl Default for ListingStore {
    fn default() -> Self {
        Self {
            sets: DashMap::new(),
            locks: DashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
