//! Commits: immutable, versioned snapshots of one tree position.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::element::Element;

static NEXT_COMMIT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_COMMIT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle for a logical tree position. Stable for the
/// lifetime of that position, across any number of versions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct CommitId(u64);

impl CommitId {
    pub(crate) fn next() -> Self {
        Self(NEXT_COMMIT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque, monotonically increasing version handle. Allocated whenever a
/// commit's element, children, or hook-driven content changes; two
/// commits with the same id and different versions are the same position
/// at different times.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CommitVersion(u64);

impl CommitVersion {
    pub(crate) fn next() -> Self {
        Self(NEXT_COMMIT_VERSION.fetch_add(1, Ordering::Relaxed))
    }
}

/// Ordered ids from a root down to a node, inclusive. Copy-cheap (the
/// id slice is shared), never retroactively altered.
#[derive(Clone, PartialEq, Eq)]
pub struct CommitPath {
    ids: Rc<[CommitId]>,
}

impl CommitPath {
    fn root(id: CommitId) -> Self {
        Self { ids: Rc::from([id]) }
    }

    /// Extend this path with a child id.
    pub fn child(&self, id: CommitId) -> Self {
        let mut ids = Vec::with_capacity(self.ids.len() + 1);
        ids.extend_from_slice(&self.ids);
        ids.push(id);
        Self { ids: ids.into() }
    }

    /// Ancestor/descendant test: `a` is an ancestor of (or equal to) the
    /// owner of this path iff its id appears in it.
    pub fn contains(&self, id: CommitId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[CommitId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl fmt::Debug for CommitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids.iter()).finish()
    }
}

/// Lightweight handle to a commit position, usable before the commit
/// itself exists (for example to address a not-yet-created child).
#[derive(Clone, Debug)]
pub struct CommitRef {
    id: CommitId,
    path: CommitPath,
}

impl CommitRef {
    /// Allocate a fresh root position.
    pub(crate) fn new_root() -> Self {
        let id = CommitId::next();
        Self {
            id,
            path: CommitPath::root(id),
        }
    }

    /// Allocate a fresh child position under `parent`.
    pub(crate) fn new_child(parent: &CommitRef) -> Self {
        let id = CommitId::next();
        Self {
            id,
            path: parent.path.child(id),
        }
    }

    pub fn id(&self) -> CommitId {
        self.id
    }

    pub fn path(&self) -> &CommitPath {
        &self.path
    }

    /// True when `ancestor` lies on this ref's path (inclusive).
    pub fn is_under(&self, ancestor: CommitId) -> bool {
        self.path.contains(ancestor)
    }
}

/// One entry in the commit tree. Immutable once constructed; "updating"
/// a commit means building a successor with [`Commit::next_version`] and
/// letting the tree replace the map entry.
#[derive(Clone)]
pub struct Commit {
    at: CommitRef,
    version: CommitVersion,
    element: Element,
    children: Vec<CommitRef>,
}

impl Commit {
    /// Build the next version of the position named by `at`.
    pub(crate) fn next_version(
        at: &CommitRef,
        element: Element,
        children: Vec<CommitRef>,
    ) -> Self {
        Self {
            at: at.clone(),
            version: CommitVersion::next(),
            element,
            children,
        }
    }

    pub fn id(&self) -> CommitId {
        self.at.id
    }

    pub fn path(&self) -> &CommitPath {
        &self.at.path
    }

    pub fn to_ref(&self) -> CommitRef {
        self.at.clone()
    }

    pub fn version(&self) -> CommitVersion {
        self.version
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn children(&self) -> &[CommitRef] {
        &self.children
    }
}

impl fmt::Debug for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commit")
            .field("id", &self.at.id)
            .field("version", &self.version)
            .field("element", &self.element.kind().name())
            .field("children", &self.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Node, Props};

    #[test]
    fn child_path_appends_own_id() {
        let root = CommitRef::new_root();
        let child = CommitRef::new_child(&root);
        assert_eq!(child.path().len(), 2);
        assert_eq!(child.path().ids()[0], root.id());
        assert_eq!(child.path().ids()[1], child.id());
        assert!(child.is_under(root.id()));
        assert!(!root.is_under(child.id()));
    }

    #[test]
    fn versions_always_advance() {
        let at = CommitRef::new_root();
        let element = Element::host("x", Props::new(), Node::Empty);
        let first = Commit::next_version(&at, element.clone(), Vec::new());
        let second = Commit::next_version(&at, element, Vec::new());
        assert_eq!(first.id(), second.id());
        assert_ne!(first.version(), second.version());
    }
}
