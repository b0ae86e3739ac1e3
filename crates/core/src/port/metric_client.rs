// Metric Client Port
// Fire-and-forget counters; never on the correctness path.

/// A single metric attribute key/value pair.
pub type MetricAttribute = (&'static str, String);

/// Metric client trait.
pub trait MetricClient: Send + Sync {
    fn count(&self, metric: &str, delta: u64, attributes: &[MetricAttribute]);
}

/// Metric client that discards everything.
pub struct NoopMetricClient;

impl MetricClient for NoopMetricClient {
    fn count(&self, _metric: &str, _delta: u64, _attributes: &[MetricAttribute]) {}
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct RecordedCount {
        pub metric: String,
        pub delta: u64,
        pub attributes: Vec<(String, String)>,
    }

    #[derive(Default)]
    pub struct RecordingMetricClient {
        counts: Mutex<Vec<RecordedCount>>,
    }

    impl RecordingMetricClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn recorded(&self) -> Vec<RecordedCount> {
            self.counts.lock().unwrap().clone()
        }

        /// Sum of deltas recorded for a metric name.
        pub fn total_for(&self, metric: &str) -> u64 {
            self.counts
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.metric == metric)
                .map(|c| c.delta)
                .sum()
        }
    }

    impl MetricClient for RecordingMetricClient {
        fn count(&self, metric: &str, delta: u64, attributes: &[MetricAttribute]) {
            self.counts.lock().unwrap().push(RecordedCount {
                metric: metric.to_string(),
                delta,
                attributes: attributes
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            });
        }
    }
}
