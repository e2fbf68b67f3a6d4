//! Depth-first queries over the live tree.
//!
//! Children are resolved as they are reached, so traversal works on a tree
//! that has not been activated yet.

use tracing::instrument;

use crate::domain::error::SyncResult;
use crate::domain::forest::Forest;
use crate::domain::ids::NodeId;
use crate::domain::node::Node;

impl Forest {
    /// Pre-order fold. `visit` receives the accumulator, the node and the
    /// node's index among its siblings (the root has index 0).
    ///
    /// A node's children are captured when the node is reached, before
    /// `visit` runs; changes `visit` makes to that list take effect on the
    /// next pass only.
    pub fn walk<A, F>(&mut self, root: NodeId, init: A, mut visit: F) -> SyncResult<A>
    where
        F: FnMut(&mut Forest, A, NodeId, usize) -> A,
    {
        let mut acc = init;
        let mut stack = vec![(root, 0)];
        while let Some((id, index)) = stack.pop() {
            let children = self.force_children(id)?;
            acc = visit(self, acc, id, index);
            stack.extend(children.into_iter().enumerate().rev().map(|(i, c)| (c, i)));
        }
        Ok(acc)
    }

    pub fn map<T, F>(&mut self, root: NodeId, mut f: F) -> SyncResult<Vec<T>>
    where
        F: FnMut(&Node, usize) -> T,
    {
        self.walk(root, Vec::new(), |forest, mut acc, id, index| {
            if let Some(node) = forest.get(id) {
                acc.push(f(node, index));
            }
            acc
        })
    }

    pub fn filter<F>(&mut self, root: NodeId, mut keep: F) -> SyncResult<Vec<NodeId>>
    where
        F: FnMut(&Node, usize) -> bool,
    {
        self.walk(root, Vec::new(), |forest, mut acc, id, index| {
            if forest.get(id).is_some_and(|node| keep(node, index)) {
                acc.push(id);
            }
            acc
        })
    }

    /// Nodes whose kind carries every one of `traits`.
    #[instrument(level = "debug", skip(self))]
    pub fn filter_traits(&mut self, root: NodeId, traits: &[&str]) -> SyncResult<Vec<NodeId>> {
        self.filter(root, |node, _| traits.iter().all(|t| node.has_trait(t)))
    }

    pub fn post_order(&mut self, root: NodeId) -> SyncResult<Vec<NodeId>> {
        let mut order = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.force_children(id)?.into_iter().rev() {
                stack.push((child, false));
            }
        }
        Ok(order)
    }

    /// Number of levels below and including `root`.
    pub fn depth(&mut self, root: NodeId) -> SyncResult<usize> {
        let mut max_depth = 0;
        let mut stack = vec![(root, 1)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            for child in self.force_children(id)? {
                stack.push((child, depth + 1));
            }
        }
        Ok(max_depth)
    }

    pub fn leaves(&mut self, root: NodeId) -> SyncResult<Vec<NodeId>> {
        self.walk(root, Vec::new(), |forest, mut acc, id, _| {
            if forest.get(id).is_some_and(|n| n.peek_children().is_empty()) {
                acc.push(id);
            }
            acc
        })
    }
}
