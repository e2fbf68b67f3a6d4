use termtree::Tree;
use tracing::instrument;

use crate::domain::forest::Forest;
use crate::domain::ids::NodeId;

pub trait TreeNodeConvert {
    fn to_tree_string(&self, root: NodeId) -> Tree<String>;
}

impl Forest {
    /// One-line description of a node: record label (or node handle) and tag.
    pub fn describe(&self, id: NodeId) -> String {
        let Some(node) = self.get(id) else {
            return format!("{} (missing)", id);
        };
        let tag = node.node_type().unwrap_or_else(|| "?".to_string());
        let label = node
            .record()
            .and_then(|r| self.records().get(r))
            .and_then(|r| r.label.clone());
        let mut text = match label {
            Some(label) => format!("{} ({})", label, tag),
            None => format!("{} ({})", id, tag),
        };
        if node.is_destroyed() {
            text.push_str(" [destroyed]");
        }
        text
    }
}

// Shows resolved children only; children still deferred to the record are not forced.
impl TreeNodeConvert for Forest {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self, root: NodeId) -> Tree<String> {
        let leaves: Vec<_> = self
            .get(root)
            .map(|node| node.peek_children().to_vec())
            .unwrap_or_default()
            .into_iter()
            .map(|child| self.to_tree_string(child))
            .collect();

        Tree::new(self.describe(root)).with_leaves(leaves)
    }
}
