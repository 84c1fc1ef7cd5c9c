//! Host integration seam.
//!
//! The reconciler never spins a loop of its own: whenever work appears
//! it pokes the host's [`WorkDriver`], and the host decides when to call
//! back into [`crate::Reconciler::do_bounded_work`] with its own yield
//! budget. Event-loop hosts wire this to a wake-up; tests count pokes.

use std::sync::Arc;

pub trait WorkDriver: Send + Sync {
    /// Called whenever the reconciler has (or regains) pending work.
    /// May be called redundantly; implementations should coalesce.
    fn schedule_work(&self);
}

/// Driver for hosts that poll [`crate::Reconciler::has_work`] themselves.
#[derive(Default)]
pub struct NoopDriver;

impl WorkDriver for NoopDriver {
    fn schedule_work(&self) {}
}

pub(crate) fn noop_driver() -> Arc<dyn WorkDriver> {
    Arc::new(NoopDriver)
}
