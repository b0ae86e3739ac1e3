// Feature Flag Port
// Consumed as an opaque oracle; the engine never computes flag values.

use uuid::Uuid;

/// A typed flag definition with its default value.
#[derive(Debug, Clone, Copy)]
pub struct Flag<T: Copy> {
    pub key: &'static str,
    pub default: T,
}

/// Route operation execution through the remote executor instead of a
/// locally supervised subprocess.
pub const USE_REMOTE_EXECUTION: Flag<bool> = Flag {
    key: "platform.use-remote-execution",
    default: false,
};

/// How often to poll a remote workload for its status, in seconds.
pub const WORKLOAD_POLL_FREQUENCY_SECONDS: Flag<i64> = Flag {
    key: "platform.workload-poll-frequency-seconds",
    default: 5,
};

/// Evaluation context for flag lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagContext {
    Anonymous,
    Workspace(Uuid),
}

impl FlagContext {
    pub fn for_workspace(workspace_id: Option<Uuid>) -> Self {
        match workspace_id {
            Some(id) => FlagContext::Workspace(id),
            None => FlagContext::Anonymous,
        }
    }
}

/// Flag client trait. Read-only, no side effects.
pub trait FlagClient: Send + Sync {
    fn bool_variation(&self, flag: &Flag<bool>, context: &FlagContext) -> bool;
    fn int_variation(&self, flag: &Flag<i64>, context: &FlagContext) -> i64;
}

/// Flag client that always returns the flag defaults.
pub struct DefaultFlagClient;

impl FlagClient for DefaultFlagClient {
    fn bool_variation(&self, flag: &Flag<bool>, _context: &FlagContext) -> bool {
        flag.default
    }

    fn int_variation(&self, flag: &Flag<i64>, _context: &FlagContext) -> i64 {
        flag.default
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;

    /// Flag client backed by static maps; unknown keys fall back to the
    /// flag default.
    #[derive(Default)]
    pub struct StaticFlagClient {
        bools: HashMap<&'static str, bool>,
        ints: HashMap<&'static str, i64>,
    }

    impl StaticFlagClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_bool(mut self, flag: &Flag<bool>, value: bool) -> Self {
            self.bools.insert(flag.key, value);
            self
        }

        pub fn with_int(mut self, flag: &Flag<i64>, value: i64) -> Self {
            self.ints.insert(flag.key, value);
            self
        }
    }

    impl FlagClient for StaticFlagClient {
        fn bool_variation(&self, flag: &Flag<bool>, _context: &FlagContext) -> bool {
            self.bools.get(flag.key).copied().unwrap_or(flag.default)
        }

        fn int_variation(&self, flag: &Flag<i64>, _context: &FlagContext) -> i64 {
            self.ints.get(flag.key).copied().unwrap_or(flag.default)
        }
    }
}
