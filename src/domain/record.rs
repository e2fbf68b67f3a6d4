//! Structural records: the externally owned tree that nodes mirror.

use std::fmt;

use generational_arena::Arena;
use tracing::instrument;

use crate::domain::error::{SyncError, SyncResult};
use crate::domain::ids::RecordId;

/// Data describing one position in the structural tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralRecord {
    /// Kind discriminator used for dispatch
    pub tag: Option<String>,
    /// Free-form content shown by displays
    pub label: Option<String>,
    pub parent: Option<RecordId>,
    pub children: Vec<RecordId>,
    pub(crate) watching: bool,
}

impl StructuralRecord {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_watching(&self) -> bool {
        self.watching
    }
}

impl fmt::Display for StructuralRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.tag, &self.label) {
            (Some(tag), Some(label)) => write!(f, "{} ({})", label, tag),
            (Some(tag), None) => write!(f, "{}", tag),
            (None, Some(label)) => write!(f, "{}", label),
            (None, None) => write!(f, "<untagged>"),
        }
    }
}

/// Arena-backed store of structural records.
///
/// Writes here are raw: they do not notify mirroring nodes. Go through
/// [`Forest::set_record_parent`](crate::domain::Forest::set_record_parent) and
/// [`Forest::set_record_children`](crate::domain::Forest::set_record_children)
/// when the change must be observed.
#[derive(Debug, Default)]
pub struct RecordStore {
    arena: Arena<StructuralRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    /// Inserts a record, appending it to `parent`'s children when given.
    #[instrument(level = "trace", skip(self, record))]
    pub fn insert(
        &mut self,
        mut record: StructuralRecord,
        parent: Option<RecordId>,
    ) -> SyncResult<RecordId> {
        if let Some(parent_id) = parent {
            if !self.arena.contains(parent_id.0) {
                return Err(SyncError::RecordNotFound(parent_id));
            }
        }
        record.parent = parent;
        let id = RecordId(self.arena.insert(record));

        if let Some(parent_id) = parent {
            if let Some(parent) = self.arena.get_mut(parent_id.0) {
                parent.children.push(id);
            }
        }
        Ok(id)
    }

    pub fn get(&self, id: RecordId) -> Option<&StructuralRecord> {
        self.arena.get(id.0)
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut StructuralRecord> {
        self.arena.get_mut(id.0)
    }

    pub fn require(&self, id: RecordId) -> SyncResult<&StructuralRecord> {
        self.get(id).ok_or(SyncError::RecordNotFound(id))
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.arena.contains(id.0)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn parent_of(&self, id: RecordId) -> SyncResult<Option<RecordId>> {
        Ok(self.require(id)?.parent)
    }

    pub fn children_of(&self, id: RecordId) -> SyncResult<Vec<RecordId>> {
        Ok(self.require(id)?.children.clone())
    }

    pub fn set_parent(&mut self, id: RecordId, parent: Option<RecordId>) -> SyncResult<()> {
        if let Some(parent_id) = parent {
            self.require(parent_id)?;
        }
        let record = self.get_mut(id).ok_or(SyncError::RecordNotFound(id))?;
        record.parent = parent;
        Ok(())
    }

    pub fn set_children(&mut self, id: RecordId, children: Vec<RecordId>) -> SyncResult<()> {
        if let Some(missing) = children.iter().find(|c| !self.contains(**c)) {
            return Err(SyncError::RecordNotFound(*missing));
        }
        let record = self.get_mut(id).ok_or(SyncError::RecordNotFound(id))?;
        record.children = children;
        Ok(())
    }

    /// Activates the record. Returns `true` only for the first activation.
    pub fn watch(&mut self, id: RecordId) -> SyncResult<bool> {
        let record = self.get_mut(id).ok_or(SyncError::RecordNotFound(id))?;
        if record.watching {
            return Ok(false);
        }
        record.watching = true;
        Ok(true)
    }

    /// Records without a parent, in insertion-slot order.
    pub fn roots(&self) -> Vec<RecordId> {
        self.arena
            .iter()
            .filter(|(_, record)| record.parent.is_none())
            .map(|(idx, _)| RecordId(idx))
            .collect()
    }

    /// Depth-first pre-order iteration starting at `root`.
    pub fn iter_from(&self, root: RecordId) -> RecordIterator<'_> {
        RecordIterator {
            store: self,
            stack: vec![root],
        }
    }
}

pub struct RecordIterator<'a> {
    store: &'a RecordStore,
    stack: Vec<RecordId>,
}

impl<'a> Iterator for RecordIterator<'a> {
    type Item = (RecordId, &'a StructuralRecord);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(record) = self.store.get(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in record.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, record));
            }
        }
        None
    }
}
