//! The reconciler front end: mount roots, fold re-render requests into
//! work threads, run the bounded work loop and apply completed threads.
//!
//! All mutation funnels through here. A thread's deltas hit the tree
//! atomically (apply happens only once the pending stack is empty), then
//! delta listeners fire, effects flush synchronously, and failure
//! notifications go out last.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::boundary::ErrorNotification;
use crate::commit::{CommitId, CommitRef};
use crate::component::ElementService;
use crate::delta::DeltaSet;
use crate::effect::EffectManager;
use crate::element::{Element, Node};
use crate::platform::{noop_driver, WorkDriver};
use crate::thread::WorkThread;
use crate::tree::CommitTree;
use crate::update::Update;

/// Pops between yield checks in the bounded work loop.
const YIELD_CHECK_INTERVAL: usize = 10;

struct RequestsInner {
    queue: RefCell<Vec<CommitRef>>,
    driver: Arc<dyn WorkDriver>,
}

/// The one inlet for new work outside `mount`: state setters and
/// boundary clears push targets here, and the work loop folds the queue
/// into the current or next thread. Shared so handles stay valid after
/// their render returns.
#[derive(Clone)]
pub(crate) struct RenderRequests {
    inner: Rc<RequestsInner>,
}

impl RenderRequests {
    fn new(driver: Arc<dyn WorkDriver>) -> Self {
        Self {
            inner: Rc::new(RequestsInner {
                queue: RefCell::new(Vec::new()),
                driver,
            }),
        }
    }

    pub fn request(&self, at: CommitRef) {
        self.inner.queue.borrow_mut().push(at);
        self.inner.driver.schedule_work();
    }

    fn drain(&self) -> Vec<CommitRef> {
        std::mem::take(&mut *self.inner.queue.borrow_mut())
    }

    fn is_empty(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }
}

/// Returned by [`Reconciler::mount`]; names the root position for later
/// unmounting.
#[derive(Clone, Debug)]
pub struct RootHandle {
    at: CommitRef,
}

impl RootHandle {
    pub fn id(&self) -> CommitId {
        self.at.id()
    }
}

pub struct Reconciler {
    tree: CommitTree,
    service: ElementService,
    effects: EffectManager,
    /// The in-flight thread; `None` when idle.
    thread: Option<WorkThread>,
    requests: RenderRequests,
    /// Targets that could not attach to the in-flight thread; folded
    /// into exactly one follow-up thread after apply.
    deferred: Vec<CommitRef>,
    driver: Arc<dyn WorkDriver>,
    delta_listeners: Vec<Box<dyn FnMut(&DeltaSet)>>,
    error_listeners: Vec<Box<dyn FnMut(&ErrorNotification)>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::with_driver(noop_driver())
    }

    pub fn with_driver(driver: Arc<dyn WorkDriver>) -> Self {
        let requests = RenderRequests::new(driver.clone());
        Self {
            tree: CommitTree::new(),
            service: ElementService::new(requests.clone()),
            effects: EffectManager::new(),
            thread: None,
            requests,
            deferred: Vec::new(),
            driver,
            delta_listeners: Vec::new(),
            error_listeners: Vec::new(),
        }
    }

    /// Observe every applied [`DeltaSet`]. Fires before effects run.
    pub fn on_delta(&mut self, listener: impl FnMut(&DeltaSet) + 'static) {
        self.delta_listeners.push(Box::new(listener));
    }

    /// Observe failures after the thread that caught them applies.
    pub fn on_error(&mut self, listener: impl FnMut(&ErrorNotification) + 'static) {
        self.error_listeners.push(Box::new(listener));
    }

    pub fn tree(&self) -> &CommitTree {
        &self.tree
    }

    /// Mount `node` as a new root. The whole node becomes the children
    /// of one implicit container element, so a multi-element mount still
    /// has a single root commit. Work is queued, not performed; drive it
    /// with [`Reconciler::do_bounded_work`] or
    /// [`Reconciler::work_to_completion`].
    pub fn mount(&mut self, node: Node) -> RootHandle {
        let at = CommitRef::new_root();
        self.tree.add_root(at.clone());
        self.thread
            .get_or_insert_with(WorkThread::new)
            .queue_mount(at.clone(), Element::fragment(node));
        self.driver.schedule_work();
        RootHandle { at }
    }

    /// Queue removal of a mounted root and everything under it.
    pub fn unmount(&mut self, root: &RootHandle) {
        match self.tree.get(root.id()).cloned() {
            Some(commit) => {
                self.thread
                    .get_or_insert_with(WorkThread::new)
                    .pending
                    .push(Update::remove(commit));
                self.driver.schedule_work();
            }
            None => {
                // Never applied: drop the queued mount and the root slot.
                if let Some(thread) = self.thread.as_mut() {
                    thread.pending.retain(|update| !update.at.is_under(root.id()));
                }
                self.tree.remove_root(root.id());
            }
        }
    }

    /// Force a re-render of the subtree at `at`, even if its elements
    /// look unchanged. Same path the state hooks schedule through.
    pub fn request_render(&mut self, at: CommitRef) {
        self.requests.request(at);
    }

    /// True when a call to [`Reconciler::do_bounded_work`] would do
    /// anything.
    pub fn has_work(&self) -> bool {
        self.thread.as_ref().is_some_and(WorkThread::has_pending)
            || !self.deferred.is_empty()
            || !self.requests.is_empty()
    }

    /// Run queued work until it is exhausted or `should_yield` says
    /// stop. Yielding leaves the in-flight thread intact; the next call
    /// resumes it. Returns true when work remains.
    pub fn do_bounded_work(&mut self, mut should_yield: impl FnMut() -> bool) -> bool {
        let mut processed = 0usize;
        loop {
            self.fold_requests();

            let drained = self.thread.as_ref().map_or(true, |t| !t.has_pending());
            if drained {
                if let Some(thread) = self.thread.take() {
                    self.apply_thread(thread);
                }
                // Effects and listeners may have raised requests of
                // their own; fold them before deciding we are idle.
                self.fold_requests();
                if self.deferred.is_empty() {
                    return false;
                }
                let targets = std::mem::take(&mut self.deferred);
                self.start_thread(targets);
                continue;
            }

            let thread = self
                .thread
                .as_mut()
                .expect("drained check guarantees an in-flight thread");
            thread.process_one(&self.tree, &mut self.service);

            processed += 1;
            if processed % YIELD_CHECK_INTERVAL == 0 && should_yield() {
                return true;
            }
        }
    }

    /// Drain everything, follow-up threads included, with no yielding.
    pub fn work_to_completion(&mut self) {
        self.do_bounded_work(|| false);
    }

    /// Move queued re-render requests into the in-flight thread where an
    /// ancestor update is still pending, deferring the rest.
    fn fold_requests(&mut self) {
        for target in self.requests.drain() {
            let attached = self
                .thread
                .as_mut()
                .is_some_and(|thread| thread.attach_target(&target));
            if !attached {
                self.deferred.push(target);
            }
        }
    }

    /// Seed a follow-up thread: one distant update per root that has a
    /// target somewhere beneath it.
    fn start_thread(&mut self, targets: Vec<CommitRef>) {
        let mut thread = WorkThread::new();
        for root in self.tree.root_commits() {
            let live: Vec<CommitRef> = targets
                .iter()
                .filter(|target| target.is_under(root.id()))
                .cloned()
                .collect();
            if !live.is_empty() {
                thread.pending.push(Update::distant(root.clone(), live));
            }
        }
        self.thread = Some(thread);
    }

    fn apply_thread(&mut self, thread: WorkThread) {
        let WorkThread {
            deltas,
            effects,
            notifications,
            dropped_roots,
            ..
        } = thread;

        for id in dropped_roots {
            self.tree.remove_root(id);
        }

        if !deltas.is_empty() {
            self.tree.apply(&deltas);
            log::trace!(
                "applied thread: {} created, {} updated, {} skipped, {} removed",
                deltas.created.len(),
                deltas.updated.len(),
                deltas.skipped.len(),
                deltas.removed.len(),
            );
            for listener in &mut self.delta_listeners {
                listener(&deltas);
            }
        }

        self.effects.execute(effects);

        for queued in notifications {
            let notification = match queued.boundary {
                Some(at) => ErrorNotification::caught(
                    at.id(),
                    queued.failure,
                    self.service.clear_handle(&at),
                ),
                None => {
                    log::error!("failure with no boundary in scope: {}", queued.failure);
                    ErrorNotification::unhandled(queued.failure)
                }
            };
            for listener in &mut self.error_listeners {
                listener(&notification);
            }
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}
