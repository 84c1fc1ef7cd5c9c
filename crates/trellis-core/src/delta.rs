//! The realized outcome of processed updates: what a renderer backend
//! consumes after a work thread completes.

use crate::commit::{Commit, CommitId};

/// An updated position: the prior commit and its replacement.
#[derive(Clone, Debug)]
pub struct CommitUpdate {
    pub prev: Commit,
    pub next: Commit,
}

/// Everything one completed work thread changed, grouped by outcome.
///
/// `skipped` entries are version-only bumps: the element was untouched
/// but the position sat on a re-render target's path.
#[derive(Clone, Debug, Default)]
pub struct DeltaSet {
    pub created: Vec<Commit>,
    pub updated: Vec<CommitUpdate>,
    pub skipped: Vec<Commit>,
    pub removed: Vec<Commit>,
}

impl DeltaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.skipped.is_empty()
            && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len() + self.skipped.len() + self.removed.len()
    }

    /// Drop every entry whose position satisfies the predicate. Used by
    /// the boundary rewind to discard partial work under a boundary.
    pub(crate) fn retain_not(&mut self, mut discard: impl FnMut(&Commit) -> bool) {
        self.created.retain(|commit| !discard(commit));
        self.updated.retain(|update| !discard(&update.next));
        self.skipped.retain(|commit| !discard(commit));
        self.removed.retain(|commit| !discard(commit));
    }

    /// Most recent in-thread commit recorded for `id`, if any.
    pub(crate) fn latest(&self, id: CommitId) -> Option<&Commit> {
        self.updated
            .iter()
            .rev()
            .map(|update| &update.next)
            .chain(self.created.iter().rev())
            .chain(self.skipped.iter().rev())
            .find(|commit| commit.id() == id)
    }
}
