//! Hooks: slot-indexed persistent state for component functions.
//!
//! A fresh [`Hooks`] table is built per component invocation, bound to
//! that commit's state, its ref and the render request queue, and passed
//! into the component explicitly. Slots are claimed in call order, so a
//! component's hook calls must be stable across renders.

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::commit::{CommitId, CommitRef};
use crate::context::{find_provider, Context, ContextState};
use crate::effect::{EffectCleanup, EffectId, EffectTask};
use crate::element::PropValue;
use crate::scheduler::RenderRequests;
use crate::state::ComponentState;

/// Effect/memo dependency list. `None` means "always changed".
pub type Deps = Option<Vec<PropValue>>;

pub(crate) fn deps_changed(prev: &Deps, next: &Deps) -> bool {
    match (prev, next) {
        (None, _) | (_, None) => true,
        (Some(prev), Some(next)) => {
            prev.len() != next.len()
                || prev.iter().zip(next.iter()).any(|(a, b)| a != b)
        }
    }
}

struct MemoEntry<T> {
    deps: Deps,
    value: T,
}

/// Mutable cell stored in a hook slot; survives re-renders without
/// triggering them.
pub struct MutRef<T> {
    cell: Rc<RefCell<T>>,
}

impl<T> Clone for MutRef<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: 'static> MutRef<T> {
    fn new(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
        }
    }

    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.cell.borrow_mut())
    }
}

impl<T: Clone + 'static> MutRef<T> {
    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }
}

/// Writes a state slot and schedules a re-render of its commit. The
/// only path by which new work appears outside `mount`/`request`.
pub struct StateSetter<T> {
    state: ComponentState,
    slot: usize,
    requests: RenderRequests,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            slot: self.slot,
            requests: self.requests.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Clone + 'static> StateSetter<T> {
    pub fn set(&self, value: T) {
        self.write(Rc::new(value));
    }

    pub fn update(&self, updater: impl FnOnce(&T) -> T) {
        let next = {
            let inner = self.state.borrow();
            let value = inner
                .values
                .get(&self.slot)
                .and_then(|value| value.downcast_ref::<T>())
                .expect("state slot holds a different type; hook order must be stable");
            updater(value)
        };
        self.write(Rc::new(next));
    }

    fn write(&self, value: Rc<dyn Any>) {
        let at = {
            let mut inner = self.state.borrow_mut();
            if inner.unmounted {
                return;
            }
            inner.values.insert(self.slot, value);
            inner.at.clone()
        };
        self.requests.request(at);
    }
}

/// The per-invocation hook table.
pub struct Hooks<'a> {
    state: ComponentState,
    at: CommitRef,
    slot: usize,
    contexts: &'a mut HashMap<CommitId, ContextState>,
    effects: &'a mut Vec<EffectTask>,
    requests: RenderRequests,
}

impl<'a> Hooks<'a> {
    pub(crate) fn new(
        state: ComponentState,
        at: CommitRef,
        contexts: &'a mut HashMap<CommitId, ContextState>,
        effects: &'a mut Vec<EffectTask>,
        requests: RenderRequests,
    ) -> Self {
        Self {
            state,
            at,
            slot: 0,
            contexts,
            effects,
            requests,
        }
    }

    fn next_slot(&mut self) -> usize {
        let slot = self.slot;
        self.slot += 1;
        slot
    }

    /// Persistent value plus a setter that re-renders this commit.
    /// The initializer runs only on the slot's first claim.
    pub fn use_state<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> (T, StateSetter<T>) {
        let slot = self.next_slot();
        {
            let mut inner = self.state.borrow_mut();
            if !inner.values.contains_key(&slot) {
                inner.values.insert(slot, Rc::new(init()));
            }
        }
        let value = self
            .state
            .borrow()
            .values
            .get(&slot)
            .and_then(|value| value.downcast_ref::<T>())
            .expect("state slot holds a different type; hook order must be stable")
            .clone();
        let setter = StateSetter {
            state: self.state.clone(),
            slot,
            requests: self.requests.clone(),
            _marker: PhantomData,
        };
        (value, setter)
    }

    /// Queue `body` to run after this thread applies, whenever `deps`
    /// differ from the previous render. The slot's prior cleanup runs
    /// first; the body's return value becomes the next cleanup.
    pub fn use_effect(
        &mut self,
        deps: Deps,
        body: impl FnOnce() -> Option<EffectCleanup> + 'static,
    ) {
        let slot = self.next_slot();
        let (changed, id) = {
            let mut inner = self.state.borrow_mut();
            let changed = match inner.deps.get(&slot) {
                None => true,
                Some(prev) => deps_changed(prev, &deps),
            };
            inner.deps.insert(slot, deps);
            let id = *inner.effects.entry(slot).or_insert_with(EffectId::next);
            (changed, id)
        };
        if changed {
            self.effects
                .push(EffectTask::run(self.at.clone(), id, Box::new(body)));
        }
    }

    /// Read the nearest provider's value, subscribing this commit as a
    /// consumer. Falls back to the context's default when no provider is
    /// in scope. The provider lookup is cached per slot.
    pub fn use_context(&mut self, context: &Context) -> PropValue {
        let slot = self.next_slot();
        let cached = self.state.borrow().contexts.get(&slot).copied();
        let provider = match cached {
            Some(provider) => provider,
            None => {
                let provider = find_provider(self.contexts, &self.at, context.id());
                self.state.borrow_mut().contexts.insert(slot, provider);
                if let Some(provider) = provider {
                    if let Some(state) = self.contexts.get_mut(&provider) {
                        state.consumers.insert(self.at.id(), self.at.clone());
                    }
                }
                provider
            }
        };
        provider
            .and_then(|provider| self.contexts.get(&provider))
            .map(|state| state.value.clone())
            .unwrap_or_else(|| context.default_value().clone())
    }

    /// Mutable cell that persists across renders without scheduling any.
    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> MutRef<T> {
        let slot = self.next_slot();
        {
            let mut inner = self.state.borrow_mut();
            if !inner.values.contains_key(&slot) {
                inner.values.insert(slot, Rc::new(MutRef::new(init())));
            }
        }
        self.state
            .borrow()
            .values
            .get(&slot)
            .and_then(|value| value.downcast_ref::<MutRef<T>>())
            .expect("ref slot holds a different type; hook order must be stable")
            .clone()
    }

    /// Cache a computed value, recomputing only when `deps` change.
    pub fn use_memo<T: Clone + 'static>(
        &mut self,
        deps: Deps,
        compute: impl FnOnce() -> T,
    ) -> T {
        let slot = self.next_slot();
        let recompute = match self.state.borrow().values.get(&slot) {
            None => true,
            Some(value) => {
                let entry = value
                    .downcast_ref::<MemoEntry<T>>()
                    .expect("memo slot holds a different type; hook order must be stable");
                deps_changed(&entry.deps, &deps)
            }
        };
        if recompute {
            let value = compute();
            self.state
                .borrow_mut()
                .values
                .insert(slot, Rc::new(MemoEntry { deps, value }));
        }
        self.state
            .borrow()
            .values
            .get(&slot)
            .and_then(|value| value.downcast_ref::<MemoEntry<T>>())
            .map(|entry| entry.value.clone())
            .expect("memo slot holds a different type; hook order must be stable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deps_none_always_changes() {
        assert!(deps_changed(&None, &Some(vec![])));
        assert!(deps_changed(&Some(vec![]), &None));
        assert!(deps_changed(&None, &None));
    }

    #[test]
    fn deps_compare_elementwise() {
        let a = Some(vec![PropValue::Number(1.0), PropValue::Text("x".into())]);
        let b = Some(vec![PropValue::Number(1.0), PropValue::Text("x".into())]);
        let c = Some(vec![PropValue::Number(2.0), PropValue::Text("x".into())]);
        assert!(!deps_changed(&a, &b));
        assert!(deps_changed(&a, &c));
        assert!(deps_changed(&a, &Some(vec![PropValue::Number(1.0)])));
        let empty: Deps = Some(vec![]);
        assert!(!deps_changed(&empty, &Some(vec![])));
    }
}
