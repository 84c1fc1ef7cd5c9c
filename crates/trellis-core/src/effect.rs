//! Effect scheduling: commit and teardown tasks for effect hooks, with
//! teardown-before-reapply and teardown-on-unmount ordering.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::collections::map::HashMap;
use crate::commit::CommitRef;

static NEXT_EFFECT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EffectId(u64);

impl EffectId {
    pub(crate) fn next() -> Self {
        Self(NEXT_EFFECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Cleanup returned by an effect body, run before the next body for the
/// same slot and once on unmount.
pub type EffectCleanup = Box<dyn FnOnce()>;

type EffectBody = Box<dyn FnOnce() -> Option<EffectCleanup>>;

enum EffectTaskKind {
    Run(EffectBody),
    Teardown,
}

/// One queued piece of effect work, executed after a thread's deltas
/// are applied. Carries the commit it was registered for, so a boundary
/// rewind can discard tasks from a rolled-back subtree.
pub struct EffectTask {
    at: CommitRef,
    id: EffectId,
    kind: EffectTaskKind,
}

impl EffectTask {
    pub(crate) fn run(at: CommitRef, id: EffectId, body: EffectBody) -> Self {
        Self {
            at,
            id,
            kind: EffectTaskKind::Run(body),
        }
    }

    pub(crate) fn teardown(at: CommitRef, id: EffectId) -> Self {
        Self {
            at,
            id,
            kind: EffectTaskKind::Teardown,
        }
    }

    pub(crate) fn at(&self) -> &CommitRef {
        &self.at
    }
}

impl fmt::Debug for EffectTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EffectTaskKind::Run(_) => "run",
            EffectTaskKind::Teardown => "teardown",
        };
        write!(f, "EffectTask({:?} at {}, {kind})", self.id, self.at.id())
    }
}

/// Owns every live cleanup, keyed by effect id.
pub(crate) struct EffectManager {
    cleanups: HashMap<EffectId, EffectCleanup>,
}

impl EffectManager {
    pub fn new() -> Self {
        Self {
            cleanups: HashMap::new(),
        }
    }

    /// Execute tasks in enqueue order. A `Run` task always disposes the
    /// slot's previous cleanup before invoking the new body; `Teardown`
    /// disposes and stops there, and is a no-op when nothing is held
    /// (so an unmount after a plain effect never double-fires).
    pub fn execute(&mut self, tasks: Vec<EffectTask>) {
        for task in tasks {
            if let Some(cleanup) = self.cleanups.remove(&task.id) {
                cleanup();
            }
            if let EffectTaskKind::Run(body) = task.kind {
                if let Some(cleanup) = body() {
                    self.cleanups.insert(task.id, cleanup);
                }
            }
        }
    }

    #[cfg(test)]
    fn live_cleanups(&self) -> usize {
        self.cleanups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn cleanup_runs_before_reapply() {
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let mut manager = EffectManager::new();
        let at = CommitRef::new_root();
        let id = EffectId::next();

        let first_log = log.clone();
        manager.execute(vec![EffectTask::run(
            at.clone(),
            id,
            Box::new(move || {
                first_log.borrow_mut().push("effect-1");
                let cleanup_log = first_log.clone();
                Some(Box::new(move || cleanup_log.borrow_mut().push("cleanup-1")) as EffectCleanup)
            }),
        )]);

        let second_log = log.clone();
        manager.execute(vec![EffectTask::run(
            at,
            id,
            Box::new(move || {
                second_log.borrow_mut().push("effect-2");
                None
            }),
        )]);

        assert_eq!(*log.borrow(), vec!["effect-1", "cleanup-1", "effect-2"]);
    }

    #[test]
    fn teardown_fires_exactly_once() {
        let count = Rc::new(RefCell::new(0));
        let mut manager = EffectManager::new();
        let at = CommitRef::new_root();
        let id = EffectId::next();

        let effect_count = count.clone();
        manager.execute(vec![EffectTask::run(
            at.clone(),
            id,
            Box::new(move || {
                let cleanup_count = effect_count.clone();
                Some(Box::new(move || *cleanup_count.borrow_mut() += 1) as EffectCleanup)
            }),
        )]);

        manager.execute(vec![EffectTask::teardown(at.clone(), id)]);
        manager.execute(vec![EffectTask::teardown(at, id)]);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(manager.live_cleanups(), 0);
    }
}
