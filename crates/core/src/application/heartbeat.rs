// Heartbeat Supervisor
// Runs a background liveness probe alongside a unit of work.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::application::cancellation::CancelSlot;
use crate::port::ActivityContext;

/// Run `work` while a background probe heartbeats to the caller every
/// `interval`.
///
/// When the caller reports cancellation (or its liveness deadline has
/// elapsed), the probe fires the cancel action stored in `slot` - at most
/// once, structurally - and then stops probing; `work`'s own failure path
/// propagates the cancellation. The probe task is always stopped and joined
/// before this function returns, and the slot is disarmed once `work`
/// completes, so no probe activity survives past the return.
pub async fn with_background_heartbeat<T, E, Fut>(
    slot: CancelSlot,
    context: Arc<dyn ActivityContext>,
    interval: Duration,
    work: Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let (done_tx, mut done_rx) = watch::channel(false);

    let probe_slot = slot.clone();
    let probe = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = done_rx.changed() => break,
            }
            if *done_rx.borrow() {
                break;
            }

            match context.record_heartbeat() {
                Ok(()) => debug!("Heartbeat recorded"),
                Err(cancelled) => {
                    warn!(reason = %cancelled, "Caller cancellation observed, firing cancel callback");
                    if !probe_slot.fire() {
                        warn!("Cancellation observed before a cancel action was registered");
                    }
                    break;
                }
            }
        }
    });

    let result = work.await;

    // The work has returned; its cancel action must never run after this.
    slot.disarm();
    let _ = done_tx.send(true);
    let _ = probe.await;

    result
}
