//! Deterministic harness around a [`Reconciler`]: a poke-counting
//! driver, a recording of every delta set and failure notification, and
//! a settle loop with a hard round cap so a render loop fails the test
//! instead of hanging it.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use trellis_core::{
    BoundaryClear, CommitId, ComponentFn, DeltaSet, Failure, Hooks, Node, Props, Reconciler,
    RootHandle, WorkDriver,
};

const MAX_SETTLE_ROUNDS: usize = 64;

/// Wrap a closure as a component function.
pub fn component<F>(func: F) -> ComponentFn
where
    F: Fn(&Props, &Node, &mut Hooks<'_>) -> Result<Node, Failure> + 'static,
{
    Rc::new(func)
}

/// Driver that counts schedule pokes instead of waking an event loop.
#[derive(Default)]
pub struct ManualDriver {
    pokes: AtomicUsize,
}

impl ManualDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pokes(&self) -> usize {
        self.pokes.load(Ordering::Relaxed)
    }
}

impl WorkDriver for ManualDriver {
    fn schedule_work(&self) {
        self.pokes.fetch_add(1, Ordering::Relaxed);
    }
}

/// One recorded error notification.
#[derive(Clone)]
pub struct RecordedFailure {
    pub boundary: Option<CommitId>,
    pub message: Option<String>,
    pub clear: Option<BoundaryClear>,
}

#[derive(Default)]
struct Recording {
    deltas: Vec<DeltaSet>,
    failures: Vec<RecordedFailure>,
}

pub struct TestHarness {
    pub reconciler: Reconciler,
    driver: Arc<ManualDriver>,
    recording: Rc<RefCell<Recording>>,
}

impl TestHarness {
    pub fn new() -> Self {
        let driver = ManualDriver::new();
        let mut reconciler = Reconciler::with_driver(driver.clone());
        let recording = Rc::new(RefCell::new(Recording::default()));

        let deltas = recording.clone();
        reconciler.on_delta(move |set| deltas.borrow_mut().deltas.push(set.clone()));

        let failures = recording.clone();
        reconciler.on_error(move |notification| {
            failures.borrow_mut().failures.push(RecordedFailure {
                boundary: notification.boundary(),
                message: notification.failure().message().map(str::to_string),
                clear: notification.clear_handle().cloned(),
            });
        });

        Self {
            reconciler,
            driver,
            recording,
        }
    }

    /// Mount and settle in one step.
    pub fn mount(&mut self, node: Node) -> RootHandle {
        let root = self.reconciler.mount(node);
        self.run_until_idle();
        root
    }

    pub fn unmount(&mut self, root: &RootHandle) {
        self.reconciler.unmount(root);
        self.run_until_idle();
    }

    /// Drain all work, follow-up threads included. Panics when the
    /// reconciler keeps producing work (a render loop).
    pub fn run_until_idle(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            self.reconciler.work_to_completion();
            if !self.reconciler.has_work() {
                return;
            }
        }
        panic!("reconciler did not settle after {MAX_SETTLE_ROUNDS} rounds");
    }

    pub fn pokes(&self) -> usize {
        self.driver.pokes()
    }

    /// Every delta set applied so far, oldest first.
    pub fn deltas(&self) -> Vec<DeltaSet> {
        self.recording.borrow().deltas.clone()
    }

    pub fn last_deltas(&self) -> DeltaSet {
        self.recording
            .borrow()
            .deltas
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<RecordedFailure> {
        self.recording.borrow().failures.clone()
    }

    pub fn clear_recording(&self) {
        let mut recording = self.recording.borrow_mut();
        recording.deltas.clear();
        recording.failures.clear();
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
