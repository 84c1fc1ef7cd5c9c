//! Contexts: values provided by an ancestor commit and consumed by any
//! descendant component, with consumer subscriptions driving forced
//! re-renders when the provided value changes.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::collections::map::HashMap;
use crate::commit::{CommitId, CommitRef};
use crate::element::{Element, Node, PropValue};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContextId(u64);

/// A context handle: identity plus the value consumers read when no
/// provider is in scope.
#[derive(Clone, Debug)]
pub struct Context {
    id: ContextId,
    default: PropValue,
}

impl Context {
    pub fn new(default: impl Into<PropValue>) -> Self {
        Self {
            id: ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
            default: default.into(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn default_value(&self) -> &PropValue {
        &self.default
    }

    /// Build a provider element for this context.
    pub fn provide(&self, value: impl Into<PropValue>, children: impl Into<Node>) -> Element {
        Element::provider(self.id, value.into(), children.into())
    }
}

/// Live state of one provider commit.
pub(crate) struct ContextState {
    pub at: CommitRef,
    pub context: ContextId,
    pub value: PropValue,
    /// Subscribed consumer commits, in subscription order so forced
    /// re-render targets come out deterministically.
    pub consumers: IndexMap<CommitId, CommitRef>,
}

impl ContextState {
    pub fn new(at: CommitRef, context: ContextId, value: PropValue) -> Self {
        Self {
            at,
            context,
            value,
            consumers: IndexMap::new(),
        }
    }
}

/// Nearest provider of `context` above (or at) `at`, by path walk.
pub(crate) fn find_provider(
    states: &HashMap<CommitId, ContextState>,
    at: &CommitRef,
    context: ContextId,
) -> Option<CommitId> {
    for id in at.path().ids().iter().rev() {
        if let Some(state) = states.get(id) {
            if state.context == context {
                return Some(*id);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_provider_prefers_nearest() {
        let context = Context::new(PropValue::Null);
        let other = Context::new(PropValue::Null);

        let root = CommitRef::new_root();
        let mid = CommitRef::new_child(&root);
        let leaf = CommitRef::new_child(&mid);

        let mut states = HashMap::new();
        states.insert(
            root.id(),
            ContextState::new(root.clone(), context.id(), PropValue::Bool(true)),
        );
        states.insert(
            mid.id(),
            ContextState::new(mid.clone(), context.id(), PropValue::Bool(false)),
        );

        assert_eq!(find_provider(&states, &leaf, context.id()), Some(mid.id()));
        assert_eq!(find_provider(&states, &leaf, other.id()), None);
    }
}
