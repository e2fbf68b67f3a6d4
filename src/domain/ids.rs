//! Arena handles and the stable identity used for membership comparisons

use std::fmt;

use generational_arena::Index;

/// Handle of a node in a [`Forest`](crate::domain::Forest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) Index);

/// Handle of a structural record in a [`RecordStore`](crate::domain::RecordStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub(crate) Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "node#{}.{}", slot, generation)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "record#{}.{}", slot, generation)
    }
}

/// Value accepted by every coercing write.
///
/// A record is resolved into its mirror node; a node passes through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Node(NodeId),
    Record(RecordId),
}

impl From<NodeId> for Source {
    fn from(id: NodeId) -> Self {
        Source::Node(id)
    }
}

impl From<RecordId> for Source {
    fn from(id: RecordId) -> Self {
        Source::Record(id)
    }
}

/// Stable identity of a logical tree entry.
///
/// A node mirroring a record shares the record's identity, so a raw record
/// and the node wrapping it compare equal. Free-standing nodes are identified
/// by their own handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    Node(NodeId),
    Record(RecordId),
}
