//! The live node tree: construction, dispatch, coercion and field access.
//!
//! All nodes of one tree live in a single [`Forest`] and refer to each other
//! by [`NodeId`]. Rule evaluation lives in [`sync`](crate::domain::sync),
//! activation in [`lifecycle`](crate::domain::lifecycle) and queries in
//! [`traverse`](crate::domain::traverse).

use std::collections::HashMap;
use std::rc::Rc;

use generational_arena::Arena;
use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::domain::error::{SyncError, SyncResult};
use crate::domain::ids::{Identity, NodeId, RecordId, Source};
use crate::domain::node::{default_registry, Deferred, Node, NodeClass, Phase};
use crate::domain::record::RecordStore;
use crate::domain::registry::{RegistryHost, TypeRegistry};
use crate::domain::sync::RuleMemos;

/// Depth at which a synchronization chain is considered runaway.
pub const DEFAULT_MAX_SYNC_DEPTH: usize = 256;

/// Notification emitted on lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Watching(NodeId),
    Destroyed(NodeId),
}

type Listener = Box<dyn FnMut(&LifecycleEvent)>;

pub struct Forest {
    registry: Rc<TypeRegistry<NodeClass>>,
    records: RecordStore,
    pub(crate) nodes: Arena<Node>,
    mirrors: HashMap<RecordId, NodeId>,
    listeners: Vec<Listener>,
    pub(crate) max_sync_depth: usize,
    pub(crate) sync_depth: usize,
}

impl Forest {
    pub fn new(registry: Rc<TypeRegistry<NodeClass>>, records: RecordStore) -> Self {
        Self {
            registry,
            records,
            nodes: Arena::new(),
            mirrors: HashMap::new(),
            listeners: Vec::new(),
            max_sync_depth: DEFAULT_MAX_SYNC_DEPTH,
            sync_depth: 0,
        }
    }

    /// Forest backed by the thread's [`default_registry`].
    pub fn with_default_registry(records: RecordStore) -> Self {
        Self::new(default_registry(), records)
    }

    pub fn with_max_sync_depth(mut self, depth: usize) -> Self {
        self.max_sync_depth = depth;
        self
    }

    pub fn registry(&self) -> &Rc<TypeRegistry<NodeClass>> {
        &self.registry
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Raw record access. Changes made here are not observed by nodes.
    pub fn records_mut(&mut self) -> &mut RecordStore {
        &mut self.records
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> SyncResult<&Node> {
        self.get(id).ok_or(SyncError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> SyncResult<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(SyncError::NodeNotFound(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&LifecycleEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub(crate) fn emit(&mut self, event: LifecycleEvent) {
        trace!(?event, "lifecycle event");
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    // ---------------------------------------------------------------------
    // Construction and dispatch
    // ---------------------------------------------------------------------

    /// Constructs a free-standing node of `class`. No rule is evaluated.
    #[instrument(level = "debug", skip(self, class), fields(class = %class.name()))]
    pub fn create(&mut self, class: Rc<NodeClass>) -> NodeId {
        self.construct(class, None)
    }

    fn construct(&mut self, class: Rc<NodeClass>, record: Option<RecordId>) -> NodeId {
        let mut memos = RuleMemos::default();
        let (parent, children) = match record {
            Some(_) => (Deferred::Unresolved, Deferred::Unresolved),
            None => {
                memos.watch_parent.seed(None);
                (Deferred::Resolved(None), Deferred::Resolved(Vec::new()))
            }
        };
        let index = self.nodes.insert_with(|index| Node {
            id: NodeId(index),
            class,
            record,
            parent,
            children,
            phase: Phase::Constructed,
            memos,
            element: None,
        });
        NodeId(index)
    }

    /// Returns a node unchanged, or dispatches a record to a new node of the
    /// kind registered under the record's tag.
    #[instrument(level = "debug", skip(self))]
    pub fn create_from(&mut self, source: Source) -> SyncResult<NodeId> {
        let record_id = match source {
            Source::Node(id) => {
                self.node(id)?;
                return Ok(id);
            }
            Source::Record(record_id) => record_id,
        };
        let class = self.registry.lookup(self.records.require(record_id)?)?;
        let id = self.construct(Rc::clone(&class), Some(record_id));
        if self.live_mirror(record_id).is_none() {
            self.mirrors.insert(record_id, id);
        }
        debug!(%id, %record_id, kind = %class.name(), "dispatched record");
        Ok(id)
    }

    /// Live node mirroring `record`, if any.
    pub fn mirror_of(&self, record: RecordId) -> Option<NodeId> {
        self.live_mirror(record)
    }

    fn live_mirror(&self, record: RecordId) -> Option<NodeId> {
        self.mirrors
            .get(&record)
            .copied()
            .filter(|id| self.get(*id).is_some_and(|n| !n.is_destroyed()))
    }

    /// Resolves a source to a node: pass-through, existing mirror, or a
    /// freshly dispatched node.
    pub fn resolve(&mut self, source: Source) -> SyncResult<NodeId> {
        match source {
            Source::Record(record) => match self.live_mirror(record) {
                Some(id) => Ok(id),
                None => self.create_from(source),
            },
            Source::Node(_) => self.create_from(source),
        }
    }

    pub fn identity_of(&self, source: Source) -> Identity {
        match source {
            Source::Record(record) => Identity::Record(record),
            Source::Node(id) => match self.get(id).and_then(|n| n.record) {
                Some(record) => Identity::Record(record),
                None => Identity::Node(id),
            },
        }
    }

    pub(crate) fn identity(&self, id: NodeId) -> Identity {
        self.identity_of(Source::Node(id))
    }

    /// True when `list` holds an entry with the same identity as `id`.
    pub(crate) fn contains_identity(&self, list: &[NodeId], id: NodeId) -> bool {
        let identity = self.identity(id);
        list.iter().any(|entry| self.identity(*entry) == identity)
    }

    /// Keeps the first entry of every identity, preserving order.
    pub(crate) fn dedup_by_identity(&self, list: Vec<NodeId>) -> Vec<NodeId> {
        list.into_iter()
            .unique_by(|id| self.identity(*id))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Coercion: applied uniformly to every write of `parent` and `children`
    // ---------------------------------------------------------------------

    fn coerce(&mut self, source: Source) -> SyncResult<NodeId> {
        self.resolve(source)
    }

    fn coerce_list<I>(&mut self, sources: I) -> SyncResult<Vec<NodeId>>
    where
        I: IntoIterator<Item = Source>,
    {
        let nodes = sources
            .into_iter()
            .map(|source| self.coerce(source))
            .collect::<SyncResult<Vec<_>>>()?;
        Ok(self.dedup_by_identity(nodes))
    }

    // ---------------------------------------------------------------------
    // Field access
    // ---------------------------------------------------------------------

    /// Parent of `id`, resolving it from the record on first read.
    pub fn parent(&mut self, id: NodeId) -> SyncResult<Option<NodeId>> {
        self.force_parent(id)
    }

    /// Children of `id`, resolving them from the record on first read.
    pub fn children(&mut self, id: NodeId) -> SyncResult<Vec<NodeId>> {
        self.force_children(id)
    }

    pub(crate) fn force_parent(&mut self, id: NodeId) -> SyncResult<Option<NodeId>> {
        let node = self.node(id)?;
        if let Some(parent) = node.parent.resolved() {
            return Ok(*parent);
        }
        let record = node.record.ok_or_else(|| {
            SyncError::InvariantViolation(format!("{} has a deferred parent but no record", id))
        })?;
        let record_parent = self.records.parent_of(record)?;
        let parent = match record_parent {
            Some(parent_record) => Some(self.resolve(Source::Record(parent_record))?),
            None => None,
        };
        let node = self.node_mut(id)?;
        node.parent = Deferred::Resolved(parent);
        node.memos.parent_from_record.seed(record_parent);
        node.memos.watch_parent.seed(parent);
        trace!(%id, ?parent, "resolved parent from record");
        Ok(parent)
    }

    pub(crate) fn force_children(&mut self, id: NodeId) -> SyncResult<Vec<NodeId>> {
        let node = self.node(id)?;
        if let Some(children) = node.children.resolved() {
            return Ok(children.clone());
        }
        let record = node.record.ok_or_else(|| {
            SyncError::InvariantViolation(format!("{} has deferred children but no record", id))
        })?;
        let record_children = self.records.children_of(record)?;
        let children = self.coerce_list(record_children.iter().copied().map(Source::Record))?;
        let node = self.node_mut(id)?;
        node.children = Deferred::Resolved(children.clone());
        node.memos.watch_model_children.seed(record_children);
        trace!(%id, count = children.len(), "resolved children from record");
        Ok(children)
    }

    /// Assigns the parent. Records are coerced into their mirror nodes.
    #[instrument(level = "debug", skip(self))]
    pub fn set_parent(&mut self, id: NodeId, parent: Option<Source>) -> SyncResult<()> {
        let parent = match parent {
            Some(source) => Some(self.coerce(source)?),
            None => None,
        };
        self.write_parent(id, parent)
    }

    /// Assigns the children list. Records are coerced into their mirror
    /// nodes and entries sharing an identity are collapsed to the first.
    #[instrument(level = "debug", skip(self, children))]
    pub fn set_children<I>(&mut self, id: NodeId, children: I) -> SyncResult<()>
    where
        I: IntoIterator<Item = Source>,
    {
        let children = self.coerce_list(children)?;
        self.write_children(id, children)?;
        self.watch_adopted(id)
    }

    /// Appends `child` unless an entry with its identity is already listed.
    pub fn push_child(&mut self, id: NodeId, child: Source) -> SyncResult<()> {
        let child = self.coerce(child)?;
        let mut children = self.force_children(id)?;
        if self.contains_identity(&children, child) {
            return Ok(());
        }
        children.push(child);
        self.write_children(id, children)?;
        self.watch_adopted(id)
    }

    /// Children adopted by a watching node join it in watching, so their
    /// previous parent lets go of them.
    fn watch_adopted(&mut self, id: NodeId) -> SyncResult<()> {
        if !self.node(id)?.is_watching() {
            return Ok(());
        }
        for child in self.force_children(id)? {
            if self.node(child)?.phase() == Phase::Constructed {
                self.watch(child)?;
            }
        }
        Ok(())
    }

    /// Removes every entry sharing `child`'s identity.
    pub fn remove_child(&mut self, id: NodeId, child: Source) -> SyncResult<()> {
        let identity = self.identity_of(child);
        let children = self.force_children(id)?;
        let remaining: Vec<_> = children
            .iter()
            .copied()
            .filter(|entry| self.identity(*entry) != identity)
            .collect();
        if remaining.len() == children.len() {
            return Ok(());
        }
        self.write_children(id, remaining)
    }

    // ---------------------------------------------------------------------
    // Observed record writes
    // ---------------------------------------------------------------------

    /// Changes a record's parent and lets its watching mirror follow.
    #[instrument(level = "debug", skip(self))]
    pub fn set_record_parent(
        &mut self,
        record: RecordId,
        parent: Option<RecordId>,
    ) -> SyncResult<()> {
        self.records.set_parent(record, parent)?;
        if let Some(mirror) = self.watching_mirror(record) {
            self.run_parent_from_record(mirror)?;
        }
        Ok(())
    }

    /// Replaces a record's children and lets its watching mirror follow.
    #[instrument(level = "debug", skip(self, children))]
    pub fn set_record_children(
        &mut self,
        record: RecordId,
        children: Vec<RecordId>,
    ) -> SyncResult<()> {
        self.records.set_children(record, children)?;
        if let Some(mirror) = self.watching_mirror(record) {
            self.run_watch_model_children(mirror)?;
        }
        Ok(())
    }

    fn watching_mirror(&self, record: RecordId) -> Option<NodeId> {
        self.live_mirror(record)
            .filter(|id| self.get(*id).is_some_and(Node::is_watching))
    }
}

impl RegistryHost<NodeClass> for Forest {
    fn type_registry(&self) -> &TypeRegistry<NodeClass> {
        &self.registry
    }
}
