//! Error boundary state and the notifications delivered after apply.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::commit::{CommitId, CommitRef};
use crate::element::Failure;
use crate::scheduler::RenderRequests;

/// Lazily created per boundary commit; holds the most recent uncaught
/// failure from its subtree.
#[derive(Clone, Debug)]
pub(crate) enum BoundaryState {
    Normal,
    Caught(Failure),
}

pub(crate) type BoundaryStates = Rc<RefCell<HashMap<CommitId, BoundaryState>>>;

/// Resets a boundary and requests its re-render. Handed to error
/// listeners so applications can leave the fallback state.
#[derive(Clone)]
pub struct BoundaryClear {
    states: BoundaryStates,
    at: CommitRef,
    requests: RenderRequests,
}

impl BoundaryClear {
    pub(crate) fn new(states: BoundaryStates, at: CommitRef, requests: RenderRequests) -> Self {
        Self {
            states,
            at,
            requests,
        }
    }

    pub fn clear(&self) {
        self.states
            .borrow_mut()
            .insert(self.at.id(), BoundaryState::Normal);
        self.requests.request(self.at.clone());
    }
}

impl fmt::Debug for BoundaryClear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundaryClear({})", self.at.id())
    }
}

/// Delivered to error listeners once a thread's deltas are applied.
/// `boundary` is `None` when no boundary existed anywhere on the path
/// and the whole tree was unmounted.
#[derive(Debug)]
pub struct ErrorNotification {
    boundary: Option<CommitId>,
    failure: Failure,
    clear: Option<BoundaryClear>,
}

impl ErrorNotification {
    pub(crate) fn caught(boundary: CommitId, failure: Failure, clear: BoundaryClear) -> Self {
        Self {
            boundary: Some(boundary),
            failure,
            clear: Some(clear),
        }
    }

    pub(crate) fn unhandled(failure: Failure) -> Self {
        Self {
            boundary: None,
            failure,
            clear: None,
        }
    }

    pub fn boundary(&self) -> Option<CommitId> {
        self.boundary
    }

    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    pub fn clear_handle(&self) -> Option<&BoundaryClear> {
        self.clear.as_ref()
    }
}
