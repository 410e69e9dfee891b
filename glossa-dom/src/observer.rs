//! Mutation observation
//!
//! Observers are notified synchronously, after the tree lock is released, with
//! the records produced by one tree operation. A callback may read or mutate
//! the document; records caused by its own writes are delivered re-entrantly.

use crate::{Document, NodeId};

/// Kind of change a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were inserted and/or removed
    ChildList,
    /// An attribute was set or removed
    Attributes,
}

/// A single observed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// Node whose child list or attribute changed
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub(crate) fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added,
            removed,
            attribute_name: None,
            old_value: None,
        }
    }

    pub(crate) fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            added: Vec::new(),
            removed: Vec::new(),
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }

    pub fn has_added_nodes(&self) -> bool {
        !self.added.is_empty()
    }
}

/// Which changes an observer wants, relative to its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub attributes: bool,
    /// Also report changes anywhere below the target
    pub subtree: bool,
}

impl ObserveOptions {
    /// Insertions and removals anywhere in the subtree, no attributes.
    pub fn subtree_child_list() -> Self {
        Self {
            child_list: true,
            attributes: false,
            subtree: true,
        }
    }

    pub(crate) fn wants(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes => self.attributes,
        }
    }
}

/// Receiver of mutation batches.
pub trait MutationObserver: Send + Sync {
    fn on_mutations(&self, records: &[MutationRecord], document: &Document);
}

impl<F> MutationObserver for F
where
    F: Fn(&[MutationRecord], &Document) + Send + Sync,
{
    fn on_mutations(&self, records: &[MutationRecord], document: &Document) {
        self(records, document)
    }
}

/// Identifies an observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// Registration handle; the observer stays connected until `disconnect`.
#[derive(Debug)]
pub struct ObserverHandle {
    pub(crate) id: ObserverId,
    pub(crate) document: Document,
}

impl ObserverHandle {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Stop delivering records to this observer.
    pub fn disconnect(self) {
        self.document.unobserve(self.id);
    }
}
