// Clock Port (for deterministic duration tracking in tests)

/// Clock interface used wherever the engine measures durations.
pub trait TimeProvider: Send + Sync {
    /// Milliseconds since the unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall-clock provider (production).
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Manually advanced clock.
    pub struct ManualTimeProvider {
        now: AtomicI64,
    }

    impl ManualTimeProvider {
        pub fn starting_at(millis: i64) -> Self {
            Self {
                now: AtomicI64::new(millis),
            }
        }

        pub fn advance(&self, millis: i64) {
            self.now.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl TimeProvider for ManualTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
