// Cooperative Cancellation Primitives

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

type CancelFn = Box<dyn FnOnce() + Send>;

/// Cancellation signal observed by in-flight work.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until cancellation is requested. If the handle is dropped
    /// without cancelling, this stays pending so a `select!` against it
    /// never resolves spuriously.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Cancellation requester. `cancel` is idempotent; signalling after the
/// work has finished is a no-op because nothing observes the token anymore.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a cancellation channel.
pub fn cancel_channel() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Holder for the cancel action of one unit of work.
///
/// The unit of work registers its cancel action before starting cancellable
/// work; the heartbeat probe fires it on external cancellation. Firing takes
/// the `FnOnce` out of the slot, so at-most-once invocation is structural
/// rather than a convention.
#[derive(Clone, Default)]
pub struct CancelSlot {
    inner: Arc<Mutex<Option<CancelFn>>>,
}

impl CancelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the cancel action, replacing any previous one.
    pub fn register(&self, cancel: impl FnOnce() + Send + 'static) {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Box::new(cancel));
    }

    /// Invoke the registered action, if any. Returns whether an action ran.
    pub fn fire(&self) -> bool {
        let cancel = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match cancel {
            Some(cancel) => {
                cancel();
                true
            }
            None => false,
        }
    }

    /// Drop the registered action without invoking it. Called once the unit
    /// of work has returned, after which cancelling would be meaningless.
    pub fn disarm(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_registered(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
