//! The work thread: one bounded, resumable traversal unit.
//!
//! A thread is an explicit accumulator — a stack of pending updates, the
//! delta log, pending effects, visited bookkeeping and queued failure
//! notifications — owned uniquely by the scheduler and threaded through
//! the bounded work loop. Processing one update never suspends; only a
//! whole not-yet-applied thread can be discarded, and the boundary
//! rewind below is the one built-in partial-cancellation path.

use crate::collections::map::HashSet;
use crate::commit::{Commit, CommitId, CommitRef};
use crate::component::ElementService;
use crate::delta::{CommitUpdate, DeltaSet};
use crate::effect::EffectTask;
use crate::element::{Element, ElementKind, Failure};
use crate::tree::CommitTree;
use crate::update::{diff_children, Update};

/// A failure waiting for its post-apply notification.
pub(crate) struct QueuedFailure {
    pub boundary: Option<CommitRef>,
    pub failure: Failure,
}

pub(crate) struct WorkThread {
    pub pending: Vec<Update>,
    pub deltas: DeltaSet,
    pub effects: Vec<EffectTask>,
    /// Positions already processed this thread. Their outcome is final
    /// until apply, so late requests for them go to the follow-up
    /// thread rather than attaching here.
    pub visited: HashSet<CommitId>,
    pub notifications: Vec<QueuedFailure>,
    /// Root refs that never got a commit and never will: a mount whose
    /// thread rewound past them. Apply drops them from the root set.
    pub dropped_roots: Vec<CommitId>,
}

impl WorkThread {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            deltas: DeltaSet::new(),
            effects: Vec::new(),
            visited: HashSet::new(),
            notifications: Vec::new(),
            dropped_roots: Vec::new(),
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn queue_mount(&mut self, at: CommitRef, element: Element) {
        self.pending.push(Update::create(at, element));
    }

    /// Attach a re-render target to an already-pending ancestor update,
    /// if one exists. Returns false when the request has to wait for the
    /// follow-up thread instead.
    pub fn attach_target(&mut self, target: &CommitRef) -> bool {
        if self.visited.contains(&target.id()) {
            return false;
        }
        for update in &mut self.pending {
            if target.is_under(update.at.id()) {
                update.targets.push(target.clone());
                return true;
            }
        }
        false
    }

    /// Pop and process one pending update. Returns false when the stack
    /// was already empty and the thread is ready to apply.
    pub fn process_one(&mut self, tree: &CommitTree, service: &mut ElementService) -> bool {
        match self.pending.pop() {
            Some(update) => {
                self.process_update(update, tree, service);
                true
            }
            None => false,
        }
    }

    fn process_update(&mut self, update: Update, tree: &CommitTree, service: &mut ElementService) {
        let Update {
            at,
            prev,
            next,
            targets,
        } = update;
        self.visited.insert(at.id());

        let identical = match (&prev, &next) {
            (Some(prev), Some(next)) => prev.element().id() == next.id(),
            _ => false,
        };
        let on_target_path = targets.iter().any(|target| target.is_under(at.id()));
        let is_target = targets.iter().any(|target| target.id() == at.id());

        // Stable subtree, no target below: nothing to do at all.
        if identical && !on_target_path {
            return;
        }

        match next {
            Some(next) => {
                if identical && !is_target {
                    // On a target's path but not the target itself:
                    // propagate the walk one level and bump the version.
                    let prev = prev.expect("identical update without a previous commit");
                    for child in tree.resolve_children(prev.children()) {
                        self.pending.push(Update::distant(child, targets.clone()));
                    }
                    let commit = Commit::next_version(
                        &at,
                        prev.element().clone(),
                        prev.children().to_vec(),
                    );
                    self.deltas.skipped.push(commit);
                    return;
                }

                let output = service.render(&next, &at);
                if let Some(failure) = output.failure {
                    self.rewind(&at, failure, tree, service);
                    return;
                }
                self.effects.extend(output.effects);

                let mut inherited = targets;
                inherited.extend(output.targets);

                let prev_children = match &prev {
                    Some(prev) => tree.resolve_children(prev.children()),
                    None => Vec::new(),
                };
                let (child_refs, updates) =
                    diff_children(&at, &prev_children, &output.child, &inherited);
                let commit = Commit::next_version(&at, next, child_refs);
                match prev {
                    Some(prev) => {
                        // A forced re-render that reproduced the same
                        // element and child refs is a skip: the version
                        // bumps, nothing else moves.
                        let same_children = prev
                            .children()
                            .iter()
                            .map(CommitRef::id)
                            .eq(commit.children().iter().map(CommitRef::id));
                        if identical && same_children {
                            self.deltas.skipped.push(commit);
                        } else {
                            self.deltas.updated.push(CommitUpdate {
                                prev,
                                next: commit,
                            });
                        }
                    }
                    None => self.deltas.created.push(commit),
                }
                self.pending.extend(updates);
            }
            None => {
                let prev = prev
                    .expect("update with neither a previous commit nor a next element");
                let output = service.clear(&prev);
                self.effects.extend(output.effects);
                for child in tree.resolve_children(prev.children()) {
                    self.pending.push(Update::remove(child));
                }
                self.deltas.removed.push(prev);
            }
        }
    }

    /// A failure surfaced while evaluating `at`: roll this thread back
    /// to the nearest boundary and point the walk at it, or unmount the
    /// whole tree when no boundary exists.
    fn rewind(
        &mut self,
        at: &CommitRef,
        failure: Failure,
        tree: &CommitTree,
        service: &mut ElementService,
    ) {
        match self.find_boundary(at, tree) {
            Some(boundary) => {
                let bid = boundary.id();
                // Discard partial work at and below the boundary; its
                // own re-evaluation below re-records it.
                self.pending.retain(|update| !update.at.is_under(bid));
                self.deltas.retain_not(|commit| commit.path().contains(bid));
                self.effects.retain(|task| !task.at().is_under(bid));
                service.rollback(bid, tree);

                service.poison(bid, failure.clone());
                self.notifications.push(QueuedFailure {
                    boundary: Some(boundary.to_ref()),
                    failure,
                });

                let at = boundary.to_ref();
                let prev = tree.get(bid).cloned().unwrap_or_else(|| boundary.clone());
                let element = boundary.element().clone();
                self.pending.push(Update {
                    at: at.clone(),
                    prev: Some(prev),
                    next: Some(element),
                    targets: vec![at],
                });
            }
            None => {
                self.pending.clear();
                self.deltas = DeltaSet::new();
                self.effects.clear();
                service.rollback_all(tree);
                for root in tree.roots() {
                    if !tree.contains(root.id()) {
                        self.dropped_roots.push(root.id());
                    }
                }
                for root in tree.root_commits() {
                    self.pending.push(Update::remove(root.clone()));
                }
                self.notifications.push(QueuedFailure {
                    boundary: None,
                    failure,
                });
            }
        }
    }

    /// Nearest boundary on `at`'s path, checking commits produced
    /// earlier in this same thread before the applied tree.
    fn find_boundary(&self, at: &CommitRef, tree: &CommitTree) -> Option<Commit> {
        for id in at.path().ids().iter().rev() {
            let candidate = self.deltas.latest(*id).or_else(|| tree.get(*id));
            if let Some(commit) = candidate {
                if matches!(commit.element().kind(), ElementKind::Boundary) {
                    return Some(commit.clone());
                }
            }
        }
        None
    }
}
