//! The four synchronization rules keeping `parent`, `children` and the
//! mirrored record in agreement.
//!
//! The rules trigger each other: a parent write runs `watch_parent`, which
//! writes children lists, which run `watch_children`, which writes parents.
//! Every rule remembers the input it last observed and does nothing when
//! re-run with an unchanged input, so a chain converges instead of looping.
//! Rules only run for watching nodes; constructed nodes accept writes
//! silently and catch up on activation.

use std::collections::HashSet;

use tracing::{instrument, trace};

use crate::domain::error::{SyncError, SyncResult};
use crate::domain::forest::Forest;
use crate::domain::ids::{NodeId, RecordId, Source};
use crate::domain::node::Deferred;

/// Last input observed by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Memo<T> {
    last: Option<T>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

/// Outcome of feeding an input to a [`Memo`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Change<T> {
    Unchanged,
    /// `previous` is `None` on the first evaluation.
    Changed { previous: Option<T> },
}

impl<T: PartialEq> Memo<T> {
    /// Sets the baseline unless the rule has already observed something.
    pub(crate) fn seed(&mut self, value: T) {
        if self.last.is_none() {
            self.last = Some(value);
        }
    }

    pub(crate) fn observe(&mut self, value: T) -> Change<T> {
        if self.last.as_ref() == Some(&value) {
            return Change::Unchanged;
        }
        Change::Changed {
            previous: self.last.replace(value),
        }
    }

    #[cfg(test)]
    pub(crate) fn previous(&self) -> Option<&T> {
        self.last.as_ref()
    }
}

#[derive(Debug, Default)]
pub(crate) struct RuleMemos {
    pub(crate) parent_from_record: Memo<Option<RecordId>>,
    pub(crate) watch_parent: Memo<Option<NodeId>>,
    pub(crate) watch_children: Memo<Vec<NodeId>>,
    pub(crate) watch_model_children: Memo<Vec<RecordId>>,
}

impl Forest {
    fn syncs(&self, id: NodeId) -> SyncResult<bool> {
        Ok(self.node(id)?.is_watching())
    }

    fn nested<T>(
        &mut self,
        rule: &'static str,
        id: NodeId,
        body: impl FnOnce(&mut Self) -> SyncResult<T>,
    ) -> SyncResult<T> {
        if self.sync_depth >= self.max_sync_depth {
            return Err(SyncError::InvariantViolation(format!(
                "synchronization did not settle: {} on {} exceeded depth {}",
                rule, id, self.max_sync_depth
            )));
        }
        self.sync_depth += 1;
        let result = body(self);
        self.sync_depth -= 1;
        result
    }

    /// Raw parent write followed by `watch_parent` when the node is watching.
    pub(crate) fn write_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> SyncResult<()> {
        let current = self.force_parent(id)?;
        if current == parent {
            return Ok(());
        }
        if let Some(new_parent) = parent {
            self.check_not_ancestor(id, new_parent)?;
        }
        let node = self.node_mut(id)?;
        node.parent = Deferred::Resolved(parent);
        trace!(%id, ?current, ?parent, "parent written");
        if self.syncs(id)? {
            self.run_watch_parent(id)?;
        }
        Ok(())
    }

    /// Raw children write followed by `watch_children` when the node is watching.
    pub(crate) fn write_children(&mut self, id: NodeId, children: Vec<NodeId>) -> SyncResult<()> {
        let current = self.force_children(id)?;
        let children = self.dedup_by_identity(children);
        if current == children {
            return Ok(());
        }
        let node = self.node_mut(id)?;
        node.children = Deferred::Resolved(children);
        trace!(%id, "children written");
        if self.syncs(id)? {
            self.run_watch_children(id)?;
        }
        Ok(())
    }

    /// Ancestors still deferred to their record are resolved on the way up.
    fn check_not_ancestor(&mut self, id: NodeId, new_parent: NodeId) -> SyncResult<()> {
        let mut cursor = Some(new_parent);
        let mut steps = 0usize;
        while let Some(current) = cursor {
            if current == id {
                return Err(SyncError::InvariantViolation(format!(
                    "{} cannot become a descendant of itself via {}",
                    id, new_parent
                )));
            }
            steps += 1;
            if steps > self.nodes.len() {
                return Err(SyncError::InvariantViolation(format!(
                    "parent chain above {} contains a cycle",
                    new_parent
                )));
            }
            cursor = self.force_parent(current)?;
        }
        Ok(())
    }

    /// parentFromRecord: follow the record's parent into `parent`.
    ///
    /// Returns the node's resulting parent.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn run_parent_from_record(&mut self, id: NodeId) -> SyncResult<Option<NodeId>> {
        let node = self.node(id)?;
        let Some(record) = node.record else {
            return Ok(node.peek_parent());
        };
        if node.is_destroyed() {
            return Ok(node.peek_parent());
        }
        // First read seeds the memo with the record parent it resolved.
        let current = self.force_parent(id)?;
        let record_parent = self.records().parent_of(record)?;
        let change = self.node_mut(id)?.memos.parent_from_record.observe(record_parent);
        if change == Change::Unchanged {
            return Ok(current);
        }
        self.nested("parent_from_record", id, |forest| {
            let target = match record_parent {
                Some(parent_record) => Some(forest.resolve(Source::Record(parent_record))?),
                None => None,
            };
            if target != current {
                forest.write_parent(id, target)?;
            }
            forest.force_parent(id)
        })
    }

    /// watchParent: move this node from the previous parent's children to
    /// the current parent's children.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn run_watch_parent(&mut self, id: NodeId) -> SyncResult<()> {
        if self.node(id)?.is_destroyed() {
            return Ok(());
        }
        let current = self.force_parent(id)?;
        let previous = match self.node_mut(id)?.memos.watch_parent.observe(current) {
            Change::Unchanged => return Ok(()),
            Change::Changed { previous } => previous.flatten(),
        };
        self.nested("watch_parent", id, |forest| {
            if let Some(old_parent) = previous.filter(|p| forest.get(*p).is_some()) {
                let siblings = forest.force_children(old_parent)?;
                if siblings.contains(&id) {
                    let remaining = siblings.into_iter().filter(|c| *c != id).collect();
                    forest.write_children(old_parent, remaining)?;
                }
            }
            if let Some(new_parent) = current {
                let mut siblings = forest.force_children(new_parent)?;
                if !forest.contains_identity(&siblings, id) {
                    siblings.push(id);
                    forest.write_children(new_parent, siblings)?;
                }
            }
            Ok(())
        })
    }

    /// watchChildren: unparent removed children still pointing here, then
    /// point every current child here.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn run_watch_children(&mut self, id: NodeId) -> SyncResult<()> {
        if self.node(id)?.is_destroyed() {
            return Ok(());
        }
        let current = self.force_children(id)?;
        let previous = match self
            .node_mut(id)?
            .memos
            .watch_children
            .observe(current.clone())
        {
            Change::Unchanged => return Ok(()),
            Change::Changed { previous } => previous.unwrap_or_default(),
        };
        self.nested("watch_children", id, |forest| {
            let kept: HashSet<_> = current.iter().map(|c| forest.identity(*c)).collect();
            for removed in previous {
                if kept.contains(&forest.identity(removed)) {
                    continue;
                }
                forest.unparent_if_owned(removed, id)?;
            }
            for child in current {
                if child == id {
                    return Err(SyncError::InvariantViolation(format!(
                        "{} lists itself as a child",
                        id
                    )));
                }
                forest.write_parent(child, Some(id))?;
                let settled = forest.node(child)?.peek_parent();
                if settled != Some(id) {
                    return Err(SyncError::InvariantViolation(format!(
                        "{} is listed by {} but points at {:?}",
                        child, id, settled
                    )));
                }
            }
            Ok(())
        })
    }

    /// watchModelChildren: rebuild `children` from the record's children.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn run_watch_model_children(&mut self, id: NodeId) -> SyncResult<()> {
        let node = self.node(id)?;
        let Some(record) = node.record else {
            return Ok(());
        };
        if node.is_destroyed() {
            return Ok(());
        }
        // First read seeds the memo with the record children it resolved.
        self.force_children(id)?;
        let record_children = self.records().children_of(record)?;
        let previous = match self
            .node_mut(id)?
            .memos
            .watch_model_children
            .observe(record_children.clone())
        {
            Change::Unchanged => return Ok(()),
            Change::Changed { previous } => previous.unwrap_or_default(),
        };
        self.nested("watch_model_children", id, |forest| {
            let kept: HashSet<_> = record_children.iter().copied().collect();
            for removed in previous.into_iter().filter(|r| !kept.contains(r)) {
                if let Some(mirror) = forest.mirror_of(removed) {
                    forest.unparent_if_owned(mirror, id)?;
                }
            }
            let mut fresh = Vec::with_capacity(record_children.len());
            let mut dispatched = Vec::new();
            for child in record_children {
                let existed = forest.mirror_of(child).is_some();
                let node = forest.resolve(Source::Record(child))?;
                if !existed {
                    dispatched.push(node);
                }
                fresh.push(node);
            }
            forest.write_children(id, fresh)?;
            // Nodes dispatched under a watching parent join it in watching.
            if forest.syncs(id)? {
                for node in dispatched {
                    forest.watch(node)?;
                }
            }
            Ok(())
        })
    }

    /// Clears `child`'s parent only if it still points at `owner`.
    fn unparent_if_owned(&mut self, child: NodeId, owner: NodeId) -> SyncResult<()> {
        let Some(node) = self.get(child) else {
            return Ok(());
        };
        if node.peek_parent() == Some(owner) {
            trace!(%child, %owner, "unparenting removed child");
            self.write_parent(child, None)?;
        }
        Ok(())
    }
}
