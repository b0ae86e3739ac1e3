// Activity Context Port
// The durable-execution caller's view of one in-flight activity.

use thiserror::Error;

/// Returned by `record_heartbeat` when the caller has requested
/// cancellation or the caller-side liveness deadline has elapsed.
#[derive(Error, Debug, Clone)]
#[error("activity cancelled: {reason}")]
pub struct ActivityCancelled {
    pub reason: String,
}

impl ActivityCancelled {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Activity context trait.
///
/// `record_heartbeat` both reports liveness to the caller and surfaces the
/// caller's cancellation decision, so a probe loop needs exactly one call
/// per tick.
pub trait ActivityContext: Send + Sync {
    fn record_heartbeat(&self) -> Result<(), ActivityCancelled>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Context that records heartbeats and can be scripted or flipped to
    /// cancelled at any point.
    #[derive(Default)]
    pub struct MockActivityContext {
        beats: AtomicUsize,
        cancelled: AtomicBool,
        cancel_after: Option<usize>,
    }

    impl MockActivityContext {
        /// Never cancels.
        pub fn healthy() -> Self {
            Self::default()
        }

        /// Reports cancellation starting with the n-th heartbeat (1-based).
        pub fn cancel_after(beats: usize) -> Self {
            Self {
                cancel_after: Some(beats),
                ..Self::default()
            }
        }

        /// Flip to cancelled immediately.
        pub fn cancel_now(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }

        pub fn heartbeats(&self) -> usize {
            self.beats.load(Ordering::SeqCst)
        }
    }

    impl ActivityContext for MockActivityContext {
        fn record_heartbeat(&self) -> Result<(), ActivityCancelled> {
            let beat = self.beats.fetch_add(1, Ordering::SeqCst) + 1;

            if self.cancelled.load(Ordering::SeqCst) {
                return Err(ActivityCancelled::new("cancellation requested"));
            }
            if let Some(after) = self.cancel_after {
                if beat >= after {
                    return Err(ActivityCancelled::new("cancellation requested"));
                }
            }
            Ok(())
        }
    }
}
