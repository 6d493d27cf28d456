//! Exclusive in-flight lease over the inference request slot.
//!
//! Acquire-before-request, release-on-completion; acquisition failure means
//! "skip this trigger", never "queue it". The guard is the single flag
//! shared by the periodic scheduler and the manual analyze action, so at
//! most one inference request is outstanding at any time.
//!
//! A failed cycle persists its lease: the slot stays engaged with no
//! completion pending, suspending further ticks until the user acts. That
//! suspended hold is released by retry or by any teardown transition; a
//! live request's hold is only ever released by its own completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The exclusivity flag. Cheap to clone; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct InflightGuard {
    engaged: Arc<AtomicBool>,
    /// Set when the engaged slot is held by a persisted lease rather than a
    /// live request.
    suspended: Arc<AtomicBool>,
}

impl InflightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lease, or `None` when the slot is already held.
    pub fn try_lease(&self) -> Option<InflightLease> {
        if self
            .engaged
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.suspended.store(false, Ordering::Release);
            Some(InflightLease {
                guard: self.clone(),
                armed: true,
            })
        } else {
            None
        }
    }

    /// Whether the slot is currently held (live request or suspended).
    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Acquire)
    }

    /// Whether the slot is held by a persisted lease with no completion
    /// pending.
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    /// Force-clear the slot. Used by user-initiated retry after a failed
    /// cycle deliberately left its lease engaged.
    pub fn force_release(&self) {
        self.suspended.store(false, Ordering::Release);
        self.engaged.store(false, Ordering::Release);
    }

    /// Clear the slot only when it is held by a persisted lease. A live
    /// request keeps the slot until its own completion resolves, so a
    /// response still on the wire can never race a fresh request.
    pub fn release_suspended(&self) {
        if self.suspended.swap(false, Ordering::AcqRel) {
            self.engaged.store(false, Ordering::Release);
        }
    }
}

/// Held while a request is outstanding. Dropping the lease releases the
/// guard unless the lease was persisted.
#[derive(Debug)]
pub struct InflightLease {
    guard: InflightGuard,
    armed: bool,
}

impl InflightLease {
    /// Release on completion.
    pub fn release(mut self) {
        self.armed = false;
        self.guard.force_release();
    }

    /// Keep the slot engaged beyond this lease, marked suspended. Failed
    /// cycles use this to hold off further ticks until the user retries or
    /// tears the session down.
    pub fn persist(mut self) {
        self.armed = false;
        self.guard.suspended.store(true, Ordering::Release);
    }
}

impl Drop for InflightLease {
    fn drop(&mut self) {
        if self.armed {
            self.guard.force_release();
        }
    }
}
