//! Two-phase lifecycle: `Constructed → Watching`, and `→ Destroyed` from
//! either. Construction never evaluates a rule; activation is explicit.

use tracing::{debug, instrument};

use crate::domain::build::{ElementHandle, ElementSpec, Renderer};
use crate::domain::error::{SyncError, SyncResult};
use crate::domain::forest::{Forest, LifecycleEvent};
use crate::domain::ids::NodeId;
use crate::domain::node::Phase;

impl Forest {
    /// Activates a node and, recursively, its record and children.
    ///
    /// Repeat calls, and calls on destroyed nodes, are no-ops. The phase flips
    /// to `Watching` before any rule runs, so paths that lead back here while
    /// the activation is in progress return immediately.
    #[instrument(level = "debug", skip(self))]
    pub fn watch(&mut self, id: NodeId) -> SyncResult<()> {
        let node = self.node_mut(id)?;
        if node.phase != Phase::Constructed {
            return Ok(());
        }
        node.phase = Phase::Watching;
        let record = node.record;
        let behavior = node.class.behavior();

        self.force_children(id)?;
        self.run_parent_from_record(id)?;
        self.run_watch_parent(id)?;
        self.run_watch_children(id)?;
        self.run_watch_model_children(id)?;
        behavior.watch_extra(self, id)?;
        self.emit(LifecycleEvent::Watching(id));

        if let Some(record) = record {
            self.records_mut().watch(record)?;
        }
        for child in self.force_children(id)? {
            self.watch(child)?;
        }
        debug!(%id, "watching");
        Ok(())
    }

    /// Activates every node in `ids`.
    pub fn watch_all(&mut self, ids: &[NodeId]) -> SyncResult<()> {
        ids.iter().try_for_each(|id| self.watch(*id))
    }

    /// Marks a node destroyed and notifies once. Children are left alone;
    /// destroying descendants is the caller's responsibility.
    #[instrument(level = "debug", skip(self))]
    pub fn destroy(&mut self, id: NodeId) -> SyncResult<()> {
        let node = self.node_mut(id)?;
        if node.phase == Phase::Destroyed {
            return Ok(());
        }
        node.phase = Phase::Destroyed;
        self.emit(LifecycleEvent::Destroyed(id));
        debug!(%id, "destroyed");
        Ok(())
    }

    /// Builds the node's element under `parent`, then builds its children
    /// under that element. An already built node keeps its element.
    #[instrument(level = "debug", skip(self, renderer))]
    pub fn build(
        &mut self,
        id: NodeId,
        parent: Option<ElementHandle>,
        renderer: &mut dyn Renderer,
    ) -> SyncResult<ElementHandle> {
        let node = self.node(id)?;
        if node.is_destroyed() {
            return Err(SyncError::InvariantViolation(format!(
                "cannot build destroyed {}",
                id
            )));
        }
        let existing = node.element;
        let handle = match existing {
            Some(handle) => handle,
            None => {
                let behavior = node.class.behavior();
                let spec = ElementSpec {
                    node: id,
                    node_type: node.node_type(),
                    record: node.record.and_then(|r| self.records().get(r)),
                    parent,
                };
                let handle = behavior.build_element(renderer, &spec)?;
                self.node_mut(id)?.element = Some(handle);
                handle
            }
        };
        for child in self.force_children(id)? {
            self.build(child, Some(handle), renderer)?;
        }
        Ok(handle)
    }
}
