//! Per-commit component state: the slot storage behind hooks.
//!
//! Created on a component commit's first evaluation, destroyed when the
//! commit is removed. The handle is shared so state setters handed out
//! to event handlers stay valid after the render returns.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::commit::{CommitId, CommitRef};
use crate::effect::EffectId;
use crate::hooks::Deps;

pub(crate) struct ComponentStateInner {
    pub at: CommitRef,
    pub unmounted: bool,
    /// Hook slot values, keyed by call-order index.
    pub values: HashMap<usize, Rc<dyn Any>>,
    pub deps: HashMap<usize, Deps>,
    pub effects: HashMap<usize, EffectId>,
    /// Resolved context subscription per slot: the provider commit this
    /// slot subscribed to, or `None` when no provider was in scope.
    pub contexts: HashMap<usize, Option<CommitId>>,
}

#[derive(Clone)]
pub(crate) struct ComponentState {
    inner: Rc<RefCell<ComponentStateInner>>,
}

impl ComponentState {
    pub fn new(at: CommitRef) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ComponentStateInner {
                at,
                unmounted: false,
                values: HashMap::new(),
                deps: HashMap::new(),
                effects: HashMap::new(),
                contexts: HashMap::new(),
            })),
        }
    }

    pub fn borrow(&self) -> std::cell::Ref<'_, ComponentStateInner> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, ComponentStateInner> {
        self.inner.borrow_mut()
    }

    pub fn mark_unmounted(&self) {
        self.inner.borrow_mut().unmounted = true;
    }
}
