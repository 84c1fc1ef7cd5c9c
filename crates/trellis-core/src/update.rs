//! Child diffing: deciding which children are created, persisted or
//! removed when a commit's element output changes.

use crate::commit::{Commit, CommitRef};
use crate::element::{convert_node_to_elements, Element, Node};

/// A request to reconcile one commit position.
///
/// `prev == None` means create; `next == None` means remove; both
/// present means update-or-skip. `targets` names descendants that must
/// re-render even if the elements along the way are unchanged.
#[derive(Clone)]
pub struct Update {
    pub at: CommitRef,
    pub prev: Option<Commit>,
    pub next: Option<Element>,
    pub targets: Vec<CommitRef>,
}

impl Update {
    pub fn create(at: CommitRef, element: Element) -> Self {
        Self {
            at,
            prev: None,
            next: Some(element),
            targets: Vec::new(),
        }
    }

    pub fn remove(prev: Commit) -> Self {
        Self {
            at: prev.to_ref(),
            prev: Some(prev),
            next: None,
            targets: Vec::new(),
        }
    }

    pub fn change(prev: Commit, next: Element, targets: Vec<CommitRef>) -> Self {
        Self {
            at: prev.to_ref(),
            prev: Some(prev),
            next: Some(next),
            targets,
        }
    }

    /// A "distant" update: the element is unchanged, but the walk must
    /// continue down toward the given targets.
    pub fn distant(root: Commit, targets: Vec<CommitRef>) -> Self {
        let element = root.element().clone();
        Self {
            at: root.to_ref(),
            prev: Some(root),
            next: Some(element),
            targets,
        }
    }
}

/// Index-level outcome of matching a previous list against a next list.
#[derive(Debug, PartialEq, Eq)]
pub struct ChangeReport {
    /// For each next index, the claimed previous index (if any).
    pub next_to_prev: Vec<Option<usize>>,
    /// Next indices with no previous counterpart.
    pub created: Vec<usize>,
    /// Previous indices claimed by no next item.
    pub removed: Vec<usize>,
}

/// First-match assignment: each next item claims the first compatible,
/// not-yet-claimed previous item. O(n*m) by intent; an optimal
/// assignment would change observable reuse behavior.
pub fn calculate_changed_elements<P, N>(
    prevs: &[P],
    nexts: &[N],
    mut compatible: impl FnMut(&P, &N) -> bool,
) -> ChangeReport {
    let mut claimed = vec![false; prevs.len()];
    let mut next_to_prev = Vec::with_capacity(nexts.len());
    let mut created = Vec::new();

    for (next_index, next) in nexts.iter().enumerate() {
        let matched = prevs.iter().enumerate().position(|(prev_index, prev)| {
            !claimed[prev_index] && compatible(prev, next)
        });
        match matched {
            Some(prev_index) => claimed[prev_index] = true,
            None => created.push(next_index),
        }
        next_to_prev.push(matched);
    }

    let removed = claimed
        .iter()
        .enumerate()
        .filter(|(_, claimed)| !**claimed)
        .map(|(index, _)| index)
        .collect();

    ChangeReport {
        next_to_prev,
        created,
        removed,
    }
}

/// Kind must match; keyed items match only on equal keys, unkeyed items
/// match any unkeyed item of the same kind (first-match picks the
/// earliest unclaimed one, so an unkeyed shift reuses commits instead of
/// churning them). Keyed and unkeyed never match each other.
fn commit_matches(prev: &Commit, next: &Element) -> bool {
    if !prev.element().kind().same_kind(next.kind()) {
        return false;
    }
    match (prev.element().key(), next.key()) {
        (Some(prev_key), Some(next_key)) => prev_key == next_key,
        (None, None) => true,
        _ => false,
    }
}

fn live_targets(targets: &[CommitRef], under: &Commit) -> Vec<CommitRef> {
    targets
        .iter()
        .filter(|target| target.is_under(under.id()))
        .cloned()
        .collect()
}

/// Update for a persisted child, or `None` when the element is
/// untouched and no target needs this subtree walked.
fn persisted_update(prev: Commit, next: Element, targets: &[CommitRef]) -> Option<Update> {
    let live = live_targets(targets, &prev);
    if prev.element().id() == next.id() && live.is_empty() {
        return None;
    }
    Some(Update::change(prev, next, live))
}

/// Diff a commit's previous children against its new child output.
///
/// Returns the canonical next child ref list plus the updates needed to
/// realize it. Removal updates come last in the list so they pop first
/// off the work stack and their teardowns enqueue ahead of fresh
/// effects.
pub fn diff_children(
    parent: &CommitRef,
    prev_children: &[Commit],
    next: &Node,
    targets: &[CommitRef],
) -> (Vec<CommitRef>, Vec<Update>) {
    let elements = convert_node_to_elements(next);

    if let ([prev], [_]) = (prev_children, elements.as_slice()) {
        let prev = prev.clone();
        let element = elements
            .into_iter()
            .next()
            .expect("slice pattern guarantees one element");
        return fast_single(parent, prev, element, targets);
    }

    let report = calculate_changed_elements(prev_children, &elements, commit_matches);

    let mut refs = Vec::with_capacity(elements.len());
    let mut updates = Vec::new();

    for (next_index, element) in elements.into_iter().enumerate() {
        match report.next_to_prev[next_index] {
            Some(prev_index) => {
                let prev = prev_children[prev_index].clone();
                refs.push(prev.to_ref());
                if let Some(update) = persisted_update(prev, element, targets) {
                    updates.push(update);
                }
            }
            None => {
                let at = CommitRef::new_child(parent);
                refs.push(at.clone());
                updates.push(Update::create(at, element));
            }
        }
    }

    for prev_index in &report.removed {
        updates.push(Update::remove(prev_children[*prev_index].clone()));
    }

    (refs, updates)
}

/// Exactly one previous child and one next element: classify directly
/// without running the general matcher.
fn fast_single(
    parent: &CommitRef,
    prev: Commit,
    element: Element,
    targets: &[CommitRef],
) -> (Vec<CommitRef>, Vec<Update>) {
    if commit_matches(&prev, &element) {
        let refs = vec![prev.to_ref()];
        let updates = persisted_update(prev, element, targets)
            .into_iter()
            .collect();
        return (refs, updates);
    }
    let at = CommitRef::new_child(parent);
    let refs = vec![at.clone()];
    let updates = vec![Update::create(at, element), Update::remove(prev)];
    (refs, updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, Props};

    fn host(tag: &str) -> Element {
        Element::host(tag, Props::new(), Node::Empty)
    }

    fn commits_for(parent: &CommitRef, elements: &[Element]) -> Vec<Commit> {
        elements
            .iter()
            .map(|element| {
                let at = CommitRef::new_child(parent);
                Commit::next_version(&at, element.clone(), Vec::new())
            })
            .collect()
    }

    #[test]
    fn report_handles_reorder() {
        let report = calculate_changed_elements(
            &["A", "B", "C"],
            &["b", "c", "a"],
            |prev, next| prev.to_lowercase() == **next,
        );
        assert_eq!(report.next_to_prev, vec![Some(1), Some(2), Some(0)]);
        assert!(report.created.is_empty());
        assert!(report.removed.is_empty());
    }

    #[test]
    fn report_handles_create() {
        let report = calculate_changed_elements(
            &["A", "B"],
            &["a", "b", "c"],
            |prev, next| prev.to_lowercase() == **next,
        );
        assert_eq!(report.next_to_prev, vec![Some(0), Some(1), None]);
        assert_eq!(report.created, vec![2]);
        assert!(report.removed.is_empty());
    }

    #[test]
    fn report_handles_delete() {
        let report = calculate_changed_elements(
            &["A", "B", "C", "D"],
            &["a", "b", "c"],
            |prev, next| prev.to_lowercase() == **next,
        );
        assert_eq!(report.next_to_prev, vec![Some(0), Some(1), Some(2)]);
        assert!(report.created.is_empty());
        assert_eq!(report.removed, vec![3]);
    }

    #[test]
    fn report_never_claims_twice() {
        let report = calculate_changed_elements(
            &["a"],
            &["a", "a"],
            |prev, next| prev == next,
        );
        assert_eq!(report.next_to_prev, vec![Some(0), None]);
        assert_eq!(report.created, vec![1]);
    }

    #[test]
    fn unkeyed_shift_creates_and_removes_once() {
        // prev [A, B, C] vs next [B, C, D], kind-only: D is created and
        // A removed; B and C persist against their old commits.
        let parent = CommitRef::new_root();
        let prev = commits_for(&parent, &[host("A"), host("B"), host("C")]);
        let next = Node::Fragment(vec![
            host("B").into(),
            host("C").into(),
            host("D").into(),
        ]);

        let (refs, updates) = diff_children(&parent, &prev, &next, &[]);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].id(), prev[1].id());
        assert_eq!(refs[1].id(), prev[2].id());

        let creates = updates
            .iter()
            .filter(|update| update.prev.is_none())
            .count();
        let removes = updates
            .iter()
            .filter(|update| update.next.is_none())
            .count();
        assert_eq!(creates, 1);
        assert_eq!(removes, 1);
    }

    #[test]
    fn keyed_reorder_is_stable() {
        let parent = CommitRef::new_root();
        let prev = commits_for(
            &parent,
            &[host("x").keyed("a"), host("x").keyed("b")],
        );
        let next = Node::Fragment(vec![
            host("x").keyed("b").into(),
            host("x").keyed("a").into(),
        ]);

        let (refs, updates) = diff_children(&parent, &prev, &next, &[]);
        assert_eq!(refs[0].id(), prev[1].id());
        assert_eq!(refs[1].id(), prev[0].id());
        assert!(updates.iter().all(|update| update.prev.is_some()));
        assert!(updates.iter().all(|update| update.next.is_some()));
    }

    #[test]
    fn keyed_never_matches_unkeyed() {
        let parent = CommitRef::new_root();
        let prev = commits_for(&parent, &[host("x")]);
        let next = Node::Element(host("x").keyed("k"));

        let (_, updates) = diff_children(&parent, &prev, &next, &[]);
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().any(|update| update.prev.is_none()));
        assert!(updates.iter().any(|update| update.next.is_none()));
    }

    #[test]
    fn identical_child_without_targets_is_elided() {
        let parent = CommitRef::new_root();
        let element = host("x");
        let prev = commits_for(&parent, std::slice::from_ref(&element));
        let next = Node::Element(element);

        let (refs, updates) = diff_children(&parent, &prev, &next, &[]);
        assert_eq!(refs.len(), 1);
        assert!(updates.is_empty());
    }

    #[test]
    fn identical_child_on_target_path_still_updates() {
        let parent = CommitRef::new_root();
        let element = host("x");
        let prev = commits_for(&parent, std::slice::from_ref(&element));
        let target = CommitRef::new_child(&prev[0].to_ref());
        let next = Node::Element(element);

        let (_, updates) = diff_children(&parent, &prev, &next, &[target.clone()]);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].targets.len(), 1);
        assert_eq!(updates[0].targets[0].id(), target.id());
    }

    #[test]
    fn fast_path_replaces_incompatible_single() {
        let parent = CommitRef::new_root();
        let prev = commits_for(&parent, &[host("a")]);
        let next = Node::Element(host("b"));

        let (refs, updates) = diff_children(&parent, &prev, &next, &[]);
        assert_eq!(refs.len(), 1);
        assert_ne!(refs[0].id(), prev[0].id());
        assert_eq!(updates.len(), 2);
        assert!(matches!(
            updates[0].next.as_ref().map(Element::kind),
            Some(ElementKind::Host(_))
        ));
        assert!(updates[1].next.is_none());
    }
}
