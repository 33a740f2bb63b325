//! Cooperative cancellation for saga runs.
//!
//! A [`CancelHandle`] fires a [`CancelSignal`]. The saga races its remote
//! limit-service calls against the signal; compensation always runs to
//! completion regardless of it.

use std::future::Future;

use tokio::sync::watch;

/// Creates a connected handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Sending side of a cancellation signal.
///
/// Dropping the handle without calling [`cancel`](Self::cancel) leaves its
/// signals un-cancelled forever.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Fires the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns another signal observing this handle.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Wraps the handle so that dropping the guard fires the signal.
    pub fn drop_guard(self) -> CancelOnDrop {
        CancelOnDrop { handle: Some(self) }
    }
}

/// Fires its signal when dropped unless disarmed first.
#[derive(Debug)]
pub struct CancelOnDrop {
    handle: Option<CancelHandle>,
}

impl CancelOnDrop {
    /// Disarms the guard and returns the handle without firing it.
    pub fn disarm(mut self) -> CancelHandle {
        // The handle is only taken here or in Drop.
        match self.handle.take() {
            Some(handle) => handle,
            None => unreachable!("guard disarmed twice"),
        }
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

/// Receiving side of a cancellation signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Returns true once the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the signal fires. Pends forever if the handle is
    /// dropped without firing.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            let fired = *rx.borrow_and_update();
            if fired {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Runs `fut` unless the signal fires first, in which case `fut` is
    /// dropped and `None` is returned.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}
