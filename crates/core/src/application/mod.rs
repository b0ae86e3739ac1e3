// Application Layer - the activity execution engine

pub mod cancellation;
pub mod dispatcher;
pub mod heartbeat;
pub mod runner;
pub mod workload;

pub use cancellation::{cancel_channel, CancelHandle, CancelSlot, CancelToken};
pub use dispatcher::{ConnectorActivity, EngineConfig};
pub use heartbeat::with_background_heartbeat;
pub use runner::{ExecutionError, ProcessRunner};
