//! The commit tree: the durable store of the last known-good render.
//!
//! One arena-style map owns every [`Commit`]; refs and paths are plain
//! copyable indices into it. The tree is mutated only through
//! [`CommitTree::apply`], by the scheduler, once per completed thread.

use crate::collections::map::HashMap;
use crate::commit::{Commit, CommitId, CommitRef};
use crate::delta::DeltaSet;

pub struct CommitTree {
    commits: HashMap<CommitId, Commit>,
    roots: Vec<CommitRef>,
}

impl CommitTree {
    pub fn new() -> Self {
        Self {
            commits: HashMap::new(),
            roots: Vec::new(),
        }
    }

    pub fn get(&self, id: CommitId) -> Option<&Commit> {
        self.commits.get(&id)
    }

    pub fn contains(&self, id: CommitId) -> bool {
        self.commits.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn roots(&self) -> &[CommitRef] {
        &self.roots
    }

    pub fn root_commits(&self) -> Vec<&Commit> {
        self.roots
            .iter()
            .filter_map(|root| self.commits.get(&root.id()))
            .collect()
    }

    pub(crate) fn add_root(&mut self, root: CommitRef) {
        self.roots.push(root);
    }

    pub(crate) fn remove_root(&mut self, id: CommitId) {
        self.roots.retain(|root| root.id() != id);
    }

    /// Resolve the still-live commits behind a child ref list.
    pub(crate) fn resolve_children(&self, children: &[CommitRef]) -> Vec<Commit> {
        children
            .iter()
            .filter_map(|child| self.commits.get(&child.id()))
            .cloned()
            .collect()
    }

    /// Walk `at`'s path from nearest ancestor to root, returning the
    /// first live commit matching the predicate. O(depth).
    pub fn find_ancestor(
        &self,
        at: &CommitRef,
        mut predicate: impl FnMut(&Commit) -> bool,
    ) -> Option<&Commit> {
        for id in at.path().ids().iter().rev() {
            if let Some(commit) = self.commits.get(id) {
                if predicate(commit) {
                    return Some(commit);
                }
            }
        }
        None
    }

    /// Install one completed thread's outcome. Created, updated and
    /// skipped commits replace their map entries; removed ids are
    /// dropped, and a removed root leaves the root set.
    pub fn apply(&mut self, deltas: &DeltaSet) {
        for commit in &deltas.created {
            self.commits.insert(commit.id(), commit.clone());
        }
        for update in &deltas.updated {
            self.commits.insert(update.next.id(), update.next.clone());
        }
        for commit in &deltas.skipped {
            self.commits.insert(commit.id(), commit.clone());
        }
        for commit in &deltas.removed {
            self.commits.remove(&commit.id());
            self.roots.retain(|root| root.id() != commit.id());
        }
    }
}

impl Default for CommitTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::CommitRef;
    use crate::element::{Element, ElementKind, Node, Props};

    fn commit_under(parent: Option<&CommitRef>, element: Element) -> Commit {
        let at = match parent {
            Some(parent) => CommitRef::new_child(parent),
            None => CommitRef::new_root(),
        };
        Commit::next_version(&at, element, Vec::new())
    }

    #[test]
    fn apply_installs_and_removes() {
        let mut tree = CommitTree::new();
        let root = commit_under(None, Element::host("a", Props::new(), Node::Empty));
        tree.add_root(root.to_ref());

        let mut deltas = DeltaSet::new();
        deltas.created.push(root.clone());
        tree.apply(&deltas);
        assert!(tree.contains(root.id()));
        assert_eq!(tree.root_commits().len(), 1);

        let mut removal = DeltaSet::new();
        removal.removed.push(root.clone());
        tree.apply(&removal);
        assert!(!tree.contains(root.id()));
        assert!(tree.roots().is_empty());
    }

    #[test]
    fn find_ancestor_walks_nearest_first() {
        let mut tree = CommitTree::new();
        let root = commit_under(None, Element::boundary(Node::Empty));
        let child = commit_under(
            Some(&root.to_ref()),
            Element::host("b", Props::new(), Node::Empty),
        );
        let grandchild = commit_under(
            Some(&child.to_ref()),
            Element::host("c", Props::new(), Node::Empty),
        );

        let mut deltas = DeltaSet::new();
        deltas.created.push(root.clone());
        deltas.created.push(child.clone());
        deltas.created.push(grandchild.clone());
        tree.apply(&deltas);

        let found = tree
            .find_ancestor(&grandchild.to_ref(), |commit| {
                matches!(commit.element().kind(), ElementKind::Boundary)
            })
            .map(Commit::id);
        assert_eq!(found, Some(root.id()));

        let nearest = tree
            .find_ancestor(&grandchild.to_ref(), |commit| {
                matches!(commit.element().kind(), ElementKind::Host(_))
            })
            .map(Commit::id);
        assert_eq!(nearest, Some(grandchild.id()));
    }
}
