//! Mirror session: a record document mirrored by a watching node tree.

use std::path::Path;

use termtree::Tree;
use tracing::{info, instrument};

use crate::application::document::RecordDocument;
use crate::application::kinds::build_registry;
use crate::application::outline::OutlineRenderer;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{Forest, NodeId, Source, TreeNodeConvert};

/// Shape of the mirrored tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub nodes: usize,
    pub depth: usize,
    pub leaves: usize,
}

pub struct MirrorSession {
    forest: Forest,
    roots: Vec<NodeId>,
}

impl MirrorSession {
    /// Loads `path`, dispatches every top-level record and activates the result.
    #[instrument(level = "debug", skip(settings))]
    pub fn open(path: &Path, settings: &Settings) -> ApplicationResult<Self> {
        let document = RecordDocument::load(path)?;
        Self::from_document(&document, settings)
    }

    pub fn from_document(document: &RecordDocument, settings: &Settings) -> ApplicationResult<Self> {
        let registry = build_registry(settings)?;
        let (records, record_roots) = document.into_store(settings.default_kind.as_deref())?;
        let mut forest =
            Forest::new(registry, records).with_max_sync_depth(settings.max_sync_depth);

        let roots = record_roots
            .into_iter()
            .map(|record| forest.create_from(Source::Record(record)))
            .collect::<Result<Vec<_>, _>>()?;
        forest.watch_all(&roots)?;

        info!(roots = roots.len(), nodes = forest.len(), "mirror session open");
        Ok(Self { forest, roots })
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn forest_mut(&mut self) -> &mut Forest {
        &mut self.forest
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn trees(&self) -> Vec<Tree<String>> {
        self.roots
            .iter()
            .map(|root| self.forest.to_tree_string(*root))
            .collect()
    }

    /// Pre-order listing, one line per node: sibling index and description,
    /// indented by depth.
    pub fn walk_lines(&mut self) -> ApplicationResult<Vec<String>> {
        let mut lines = Vec::new();
        for root in self.roots.clone() {
            lines = self.forest.walk(root, lines, |forest, mut acc, id, index| {
                let indent = "  ".repeat(level(forest, id));
                acc.push(format!("{}{}: {}", indent, index, forest.describe(id)));
                acc
            })?;
        }
        Ok(lines)
    }

    /// Descriptions of nodes carrying every trait in `traits`.
    pub fn filter_traits(&mut self, traits: &[String]) -> ApplicationResult<Vec<String>> {
        if traits.is_empty() {
            return Err(ApplicationError::Config {
                message: "at least one trait is required".to_string(),
            });
        }
        let wanted: Vec<&str> = traits.iter().map(String::as_str).collect();
        let mut matches = Vec::new();
        for root in self.roots.clone() {
            for id in self.forest.filter_traits(root, &wanted)? {
                matches.push(self.forest.describe(id));
            }
        }
        Ok(matches)
    }

    /// Builds every root with an [`OutlineRenderer`] and returns its outline.
    pub fn render(&mut self) -> ApplicationResult<Vec<String>> {
        let mut renderer = OutlineRenderer::new();
        for root in self.roots.clone() {
            self.forest.build(root, None, &mut renderer)?;
        }
        Ok(renderer.into_lines())
    }

    pub fn stats(&mut self) -> ApplicationResult<TreeStats> {
        let mut stats = TreeStats {
            nodes: 0,
            depth: 0,
            leaves: 0,
        };
        for root in self.roots.clone() {
            stats.nodes += self.forest.post_order(root)?.len();
            stats.depth = stats.depth.max(self.forest.depth(root)?);
            stats.leaves += self.forest.leaves(root)?.len();
        }
        Ok(stats)
    }
}

/// Number of resolved ancestors of `id`.
fn level(forest: &Forest, id: NodeId) -> usize {
    let mut level = 0;
    let mut current = forest.get(id).and_then(|n| n.peek_parent());
    while let Some(parent) = current {
        level += 1;
        current = forest.get(parent).and_then(|n| n.peek_parent());
    }
    level
}
