//! In-memory histogram of scan cycle durations.
//! Recorded by the Scanner at the end of each cycle, read by /stats/latency.

use std::sync::Mutex;
use std::time::Duration;

/// Values stored in milliseconds.
pub struct CycleLatency {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

impl CycleLatency {
    /// Tracks 1ms to 1h, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 3_600_000, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    pub fn record(&self, d: Duration) {
        let ms = (d.as_millis().min(3_600_000) as u64).max(1);
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(ms);
        }
    }

    /// Return (p50_ms, p95_ms, p99_ms). None if no samples.
    pub fn percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        let Ok(h) = self.inner.lock() else {
            return (None, None, None);
        };
        if h.len() == 0 {
            return (None, None, None);
        }
        (
            Some(h.value_at_quantile(0.5)),
            Some(h.value_at_quantile(0.95)),
            Some(h.value_at_quantile(0.99)),
        )
    }

    pub fn len(&self) -> u64 {
        self.inner.lock().map(|h| h.len()).unwrap_or(0)
    }
}

impl Default for CycleLatency {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_has_no_percentiles() {
        assert_eq!(CycleLatency::new().percentiles(), (None, None, None));
    }

    #[test]
    fn records_samples() {
        let lat = CycleLatency::new();
        for ms in [100, 200, 300] {
            lat.record(Duration::from_millis(ms));
        }
        lat.record(Duration::from_micros(10));
        assert_eq!(lat.len(), 4);
        let (p50, _, p99) = lat.percentiles();
        assert!(p50.unwrap() >= 100);
        assert!(p99.unwrap() >= 299);
    }
}
