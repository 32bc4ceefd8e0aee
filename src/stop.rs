//! Stop signal for the polling loop.
//!
//! `channel()` returns a cloneable [`StopHandle`] and the [`StopToken`] the
//! loop waits on. The wait between cycles doubles as the poll interval and
//! ends early as soon as a stop is requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

/// Requests that a polling loop stop. Cheap to clone and idempotent.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    /// Requests a stop. Never blocks.
    pub fn stop(&self) {
        // Full means a stop is already pending.
        let _ = self.tx.try_send(());
    }
}

/// Observed by the polling loop. Once a stop is seen it stays stopped.
#[derive(Debug)]
pub struct StopToken {
    rx: Receiver<()>,
    stopped: AtomicBool,
}

impl StopToken {
    /// Returns true if a stop has been requested, without waiting.
    pub fn is_stopped(&self) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return true;
        }
        if self.rx.try_recv().is_ok() {
            self.stopped.store(true, Ordering::Release);
            return true;
        }
        false
    }

    /// Waits up to `timeout`, returning true as soon as a stop is requested.
    ///
    /// If every handle has been dropped the token can no longer fire, so the
    /// full timeout is slept and false is returned.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return true;
        }

        let started = Instant::now();
        match self.rx.recv_timeout(timeout) {
            Ok(()) => {
                self.stopped.store(true, Ordering::Release);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout.saturating_sub(started.elapsed()));
                false
            }
        }
    }
}

/// Creates a connected stop handle and token.
#[must_use]
pub fn channel() -> (StopHandle, StopToken) {
    let (tx, rx) = bounded(1);
    (
        StopHandle { tx },
        StopToken {
            rx,
            stopped: AtomicBool::new(false),
        },
    )
}
