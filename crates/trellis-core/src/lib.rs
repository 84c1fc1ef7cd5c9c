//! Incremental tree reconciliation with versioned commits.
//!
//! Applications describe UI as [`Node`] values built from [`Element`]s;
//! the [`Reconciler`] diffs each description against the committed tree
//! and emits [`DeltaSet`]s for a renderer backend to consume. Rendering
//! runs in bounded, resumable work threads so a host event loop can
//! interleave it with input handling.
//!
//! Component functions receive a [`Hooks`] table for persistent state
//! (`use_state`), side effects (`use_effect`), context subscription
//! (`use_context`) and the rest of the hook family. Failures unwind to
//! the nearest [`Element::boundary`] ancestor; the boundary renders
//! empty until its [`BoundaryClear`] handle resets it.
//!
//! ```no_run
//! use std::rc::Rc;
//! use trellis_core::{ComponentFn, Element, Node, Props, Reconciler};
//!
//! let counter: ComponentFn = Rc::new(|_props, _children, hooks| {
//!     let (count, set_count) = hooks.use_state(|| 0i64);
//!     let _ = set_count;
//!     Ok(Node::Text(format!("count: {count}")))
//! });
//!
//! let mut reconciler = Reconciler::new();
//! reconciler.on_delta(|deltas| println!("{} changes", deltas.len()));
//! reconciler.mount(Element::component(counter, Props::new(), Node::Empty).into());
//! reconciler.work_to_completion();
//! ```

mod boundary;
mod collections;
mod commit;
mod component;
mod context;
mod delta;
mod effect;
mod element;
mod hash;
mod hooks;
mod platform;
mod scheduler;
mod state;
mod thread;
mod tree;
mod update;

pub use boundary::{BoundaryClear, ErrorNotification};
pub use commit::{Commit, CommitId, CommitPath, CommitRef, CommitVersion};
pub use context::{Context, ContextId};
pub use delta::{CommitUpdate, DeltaSet};
pub use effect::{EffectCleanup, EffectId};
pub use element::{
    convert_node_to_elements, ComponentFn, Element, ElementId, ElementKind, Failure, Key, Node,
    PropValue, Props,
};
pub use hooks::{Deps, Hooks, MutRef, StateSetter};
pub use platform::{NoopDriver, WorkDriver};
pub use scheduler::{Reconciler, RootHandle};
pub use tree::CommitTree;
pub use update::{calculate_changed_elements, diff_children, ChangeReport, Update};
