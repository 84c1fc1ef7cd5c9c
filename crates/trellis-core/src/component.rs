//! Element evaluation: turning one element at one commit position into
//! its child output, hook state updates, effect registrations and
//! forced re-render targets.

use std::cell::RefCell;
use std::rc::Rc;

use crate::boundary::{BoundaryClear, BoundaryState, BoundaryStates};
use crate::collections::map::HashMap;
use crate::commit::{Commit, CommitId, CommitRef};
use crate::context::ContextState;
use crate::effect::EffectTask;
use crate::element::{Element, ElementKind, Failure, Node, PropValue};
use crate::hooks::Hooks;
use crate::scheduler::RenderRequests;
use crate::state::ComponentState;
use crate::tree::CommitTree;

/// Everything one evaluation produced.
pub(crate) struct ElementOutput {
    pub child: Node,
    pub failure: Option<Failure>,
    pub effects: Vec<EffectTask>,
    /// Descendants that must re-render even if their elements are
    /// unchanged (context consumers of a provider whose value moved).
    pub targets: Vec<CommitRef>,
}

impl ElementOutput {
    fn passthrough(child: Node) -> Self {
        Self {
            child,
            failure: None,
            effects: Vec::new(),
            targets: Vec::new(),
        }
    }
}

/// Owns all ancillary per-commit state: component hook storage, provider
/// state and boundary state.
pub(crate) struct ElementService {
    components: HashMap<CommitId, ComponentState>,
    contexts: HashMap<CommitId, ContextState>,
    boundaries: BoundaryStates,
    requests: RenderRequests,
}

impl ElementService {
    pub fn new(requests: RenderRequests) -> Self {
        Self {
            components: HashMap::new(),
            contexts: HashMap::new(),
            boundaries: Rc::new(RefCell::new(HashMap::new())),
            requests,
        }
    }

    pub fn render(&mut self, element: &Element, at: &CommitRef) -> ElementOutput {
        match element.kind() {
            ElementKind::Host(_)
            | ElementKind::Text
            | ElementKind::Number
            | ElementKind::Bool
            | ElementKind::Empty
            | ElementKind::Fragment => ElementOutput::passthrough(element.children().clone()),
            ElementKind::Provider(context) => self.render_provider(element, at, *context),
            ElementKind::Boundary => {
                if self.is_poisoned(at.id()) {
                    ElementOutput::passthrough(Node::Empty)
                } else {
                    ElementOutput::passthrough(element.children().clone())
                }
            }
            ElementKind::Component(func) => {
                let func = func.clone();
                self.render_component(element, at, func)
            }
        }
    }

    fn render_provider(
        &mut self,
        element: &Element,
        at: &CommitRef,
        context: crate::context::ContextId,
    ) -> ElementOutput {
        let value = element
            .props()
            .get("value")
            .cloned()
            .unwrap_or(PropValue::Null);
        let mut output = ElementOutput::passthrough(element.children().clone());
        match self.contexts.get_mut(&at.id()) {
            None => {
                self.contexts
                    .insert(at.id(), ContextState::new(at.clone(), context, value));
            }
            Some(state) => {
                if state.value != value {
                    state.value = value;
                    output.targets = state.consumers.values().cloned().collect();
                }
            }
        }
        output
    }

    fn render_component(
        &mut self,
        element: &Element,
        at: &CommitRef,
        func: crate::element::ComponentFn,
    ) -> ElementOutput {
        let state = self
            .components
            .entry(at.id())
            .or_insert_with(|| ComponentState::new(at.clone()))
            .clone();

        let mut effects = Vec::new();
        let result = {
            let mut hooks = Hooks::new(
                state,
                at.clone(),
                &mut self.contexts,
                &mut effects,
                self.requests.clone(),
            );
            func(element.props(), element.children(), &mut hooks)
        };

        let mut output = match result {
            Ok(child) => ElementOutput::passthrough(child),
            Err(failure) => {
                let mut output = ElementOutput::passthrough(Node::Empty);
                output.failure = Some(failure);
                output
            }
        };
        output.effects = effects;
        output
    }

    /// Tear down a removed commit's state: unsubscribe its contexts,
    /// queue teardown tasks for every still-mounted effect slot, drop
    /// provider and boundary entries.
    pub fn clear(&mut self, prev: &Commit) -> ElementOutput {
        let mut output = ElementOutput::passthrough(Node::Empty);
        match prev.element().kind() {
            ElementKind::Provider(_) => {
                self.contexts.remove(&prev.id());
            }
            ElementKind::Boundary => {
                self.boundaries.borrow_mut().remove(&prev.id());
            }
            ElementKind::Component(_) => {
                if let Some(state) = self.components.remove(&prev.id()) {
                    state.mark_unmounted();
                    let inner = state.borrow();
                    for provider in inner.contexts.values().flatten() {
                        if let Some(context) = self.contexts.get_mut(provider) {
                            context.consumers.shift_remove(&prev.id());
                        }
                    }
                    let mut effects: Vec<_> =
                        inner.effects.iter().map(|(slot, id)| (*slot, *id)).collect();
                    effects.sort_by_key(|(slot, _)| *slot);
                    for (_, id) in effects {
                        output.effects.push(EffectTask::teardown(prev.to_ref(), id));
                    }
                }
            }
            _ => {}
        }
        output
    }

    /// Discard state created under `boundary` by renders a rewind is
    /// throwing away. Commits already in the applied tree keep theirs;
    /// only never-applied positions lose state, along with consumer
    /// subscriptions they registered on surviving providers.
    pub fn rollback(&mut self, boundary: CommitId, tree: &CommitTree) {
        self.components
            .retain(|id, state| tree.contains(*id) || !state.borrow().at.is_under(boundary));
        self.contexts
            .retain(|id, state| tree.contains(*id) || !state.at.is_under(boundary));
        for state in self.contexts.values_mut() {
            state
                .consumers
                .retain(|id, at| tree.contains(*id) || !at.is_under(boundary));
        }
    }

    /// Rewind with no boundary in scope: drop every piece of state with
    /// no applied commit behind it.
    pub fn rollback_all(&mut self, tree: &CommitTree) {
        self.components.retain(|id, _| tree.contains(*id));
        self.contexts.retain(|id, _| tree.contains(*id));
        for state in self.contexts.values_mut() {
            state.consumers.retain(|id, _| tree.contains(*id));
        }
    }

    pub fn poison(&mut self, boundary: CommitId, failure: Failure) {
        self.boundaries
            .borrow_mut()
            .insert(boundary, BoundaryState::Caught(failure));
    }

    pub fn is_poisoned(&self, boundary: CommitId) -> bool {
        matches!(
            self.boundaries.borrow().get(&boundary),
            Some(BoundaryState::Caught(_))
        )
    }

    pub fn clear_handle(&self, at: &CommitRef) -> BoundaryClear {
        BoundaryClear::new(self.boundaries.clone(), at.clone(), self.requests.clone())
    }
}
