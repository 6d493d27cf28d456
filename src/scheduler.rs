//! Periodic capture scheduling for camera sessions.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Fires one capture-and-analyze cycle per interval while armed.
///
/// Ticks are fire-and-forget: the timer never waits for a cycle to finish.
/// Overlap is prevented by the session's in-flight guard (a busy tick is
/// skipped, never queued), not by the scheduler. Changing the interval
/// cancels the pending wait and re-arms with the new period. Disarming
/// aborts the timer task so no tick can fire after stop is requested, even
/// one already queued by the runtime.
pub struct CaptureScheduler {
    interval_tx: watch::Sender<Duration>,
    stopped: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureScheduler {
    pub fn new(interval: Duration) -> Self {
        let (interval_tx, _) = watch::channel(interval);
        Self {
            interval_tx,
            stopped: Arc::new(AtomicBool::new(true)),
            task: Mutex::new(None),
        }
    }

    pub fn is_armed(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
            && self.task.lock().expect("lock poisoned").is_some()
    }

    /// Current period.
    pub fn interval(&self) -> Duration {
        *self.interval_tx.borrow()
    }

    /// Arm the periodic timer. Every firing spawns `tick` as its own task.
    /// Arming an already armed scheduler cancels the previous timer first.
    pub fn arm<F, Fut>(&self, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.disarm();
        self.stopped.store(false, Ordering::Release);

        let stopped = self.stopped.clone();
        let mut interval_rx = self.interval_tx.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                let period = *interval_rx.borrow_and_update();
                tokio::select! {
                    _ = tokio::time::sleep(period) => {
                        if stopped.load(Ordering::Acquire) {
                            break;
                        }
                        tokio::spawn(tick());
                    }
                    changed = interval_rx.changed() => {
                        // Pending wait cancelled; loop re-arms with the new
                        // period from scratch.
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        *self.task.lock().expect("lock poisoned") = Some(handle);
    }

    /// Change the period. Takes effect on the next scheduling cycle (the
    /// pending wait restarts with the new period). Returns false when the
    /// scheduler is not armed.
    pub fn set_interval(&self, period: Duration) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.interval_tx.send(period).is_ok()
    }

    /// Cancel the pending timer. Idempotent; no tick fires after this
    /// returns.
    pub fn disarm(&self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(handle) = self.task.lock().expect("lock poisoned").take() {
            handle.abort();
        }
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}
