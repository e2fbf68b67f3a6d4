//! Node kinds and node instances.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::domain::build::{ElementHandle, ElementSpec, Renderer};
use crate::domain::error::{SyncError, SyncResult};
use crate::domain::forest::Forest;
use crate::domain::ids::{NodeId, RecordId};
use crate::domain::registry::{Tagged, TypeRegistry};
use crate::domain::sync::RuleMemos;

/// Per-kind behavior. Every method has a default, so kinds override only
/// what they need.
pub trait NodeBehavior {
    /// Extension hook run at the end of activation, after the four
    /// synchronization rules have been evaluated.
    fn watch_extra(&self, _forest: &mut Forest, _node: NodeId) -> SyncResult<()> {
        Ok(())
    }

    /// Creates the element for a node. Called at most once per node.
    fn build_element(
        &self,
        renderer: &mut dyn Renderer,
        spec: &ElementSpec<'_>,
    ) -> SyncResult<ElementHandle> {
        Ok(renderer.create_element(spec))
    }
}

/// Behavior used by kinds that do not supply their own.
#[derive(Debug, Default)]
pub struct PlainBehavior;

impl NodeBehavior for PlainBehavior {}

/// A node kind: the "class" half of a node.
///
/// Tag and traits are inherited from `base`; an own tag overrides the
/// inherited one.
pub struct NodeClass {
    name: String,
    tag: RefCell<Option<String>>,
    base: Option<Rc<NodeClass>>,
    traits: BTreeSet<String>,
    behavior: Option<Rc<dyn NodeBehavior>>,
}

impl NodeClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: RefCell::new(None),
            base: None,
            traits: BTreeSet::new(),
            behavior: None,
        }
    }

    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        *self.tag.borrow_mut() = Some(tag.into());
        self
    }

    pub fn extends(mut self, base: Rc<NodeClass>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_traits<I, S>(mut self, traits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.traits.extend(traits.into_iter().map(Into::into));
        self
    }

    pub fn with_behavior(mut self, behavior: Rc<dyn NodeBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&Rc<NodeClass>> {
        self.base.as_ref()
    }

    /// Own traits merged with every inherited trait.
    pub fn traits(&self) -> BTreeSet<String> {
        let mut all = self.base.as_ref().map(|b| b.traits()).unwrap_or_default();
        all.extend(self.traits.iter().cloned());
        all
    }

    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.contains(name) || self.base.as_ref().is_some_and(|b| b.has_trait(name))
    }

    /// Nearest behavior up the base chain, else [`PlainBehavior`].
    pub fn behavior(&self) -> Rc<dyn NodeBehavior> {
        match (&self.behavior, &self.base) {
            (Some(behavior), _) => Rc::clone(behavior),
            (None, Some(base)) => base.behavior(),
            (None, None) => Rc::new(PlainBehavior),
        }
    }

    /// Registers `sub`, or this kind when `sub` is omitted, in `registry`.
    ///
    /// Without an explicit `tag` the kind must declare its own tag; an
    /// inherited tag is not unique to the kind.
    pub fn register_type(
        self: &Rc<Self>,
        registry: &TypeRegistry<NodeClass>,
        tag: Option<&str>,
        sub: Option<Rc<NodeClass>>,
    ) -> SyncResult<()> {
        let class = sub.unwrap_or_else(|| Rc::clone(self));
        if tag.is_none() && class.own_tag().is_none() {
            return Err(SyncError::Configuration(match class.tag() {
                Some(inherited) => format!(
                    "{} does not declare a unique tag (inherits '{}')",
                    class.name, inherited
                ),
                None => format!("{} does not declare a tag", class.name),
            }));
        }
        registry.add(tag, class)
    }
}

impl Tagged for NodeClass {
    fn own_tag(&self) -> Option<String> {
        self.tag.borrow().clone()
    }

    fn tag(&self) -> Option<String> {
        self.own_tag()
            .or_else(|| self.base.as_ref().and_then(|b| b.tag()))
    }

    fn assign_tag(&self, tag: &str) {
        *self.tag.borrow_mut() = Some(tag.to_string());
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl fmt::Debug for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeClass")
            .field("name", &self.name)
            .field("tag", &self.tag.borrow())
            .field("base", &self.base.as_ref().map(|b| b.name.clone()))
            .field("traits", &self.traits)
            .finish()
    }
}

thread_local! {
    static DEFAULT_KINDS: Rc<TypeRegistry<NodeClass>> =
        Rc::new(TypeRegistry::new("node kinds"));
}

/// Shared registry for call sites that do not inject their own.
pub fn default_registry() -> Rc<TypeRegistry<NodeClass>> {
    DEFAULT_KINDS.with(Rc::clone)
}

/// Lifecycle phase. `Destroyed` is terminal and reachable from both others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Constructed,
    Watching,
    Destroyed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Constructed => "constructed",
            Phase::Watching => "watching",
            Phase::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// A field whose value is derived from the record on first forced read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Deferred<T> {
    Unresolved,
    Resolved(T),
}

impl<T> Deferred<T> {
    pub(crate) fn resolved(&self) -> Option<&T> {
        match self {
            Deferred::Unresolved => None,
            Deferred::Resolved(value) => Some(value),
        }
    }
}

/// A typed element of the mirrored tree.
#[derive(Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) class: Rc<NodeClass>,
    pub(crate) record: Option<RecordId>,
    pub(crate) parent: Deferred<Option<NodeId>>,
    pub(crate) children: Deferred<Vec<NodeId>>,
    pub(crate) phase: Phase,
    pub(crate) memos: RuleMemos,
    pub(crate) element: Option<ElementHandle>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn class(&self) -> &Rc<NodeClass> {
        &self.class
    }

    /// Type tag of the node's kind.
    pub fn node_type(&self) -> Option<String> {
        self.class.tag()
    }

    pub fn record(&self) -> Option<RecordId> {
        self.record
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_watching(&self) -> bool {
        self.phase == Phase::Watching
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase == Phase::Destroyed
    }

    pub fn has_trait(&self, name: &str) -> bool {
        self.class.has_trait(name)
    }

    pub fn element(&self) -> Option<ElementHandle> {
        self.element
    }

    /// Parent without forcing resolution from the record.
    pub fn peek_parent(&self) -> Option<NodeId> {
        self.parent.resolved().copied().flatten()
    }

    /// Children without forcing resolution from the record.
    pub fn peek_children(&self) -> &[NodeId] {
        self.children.resolved().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children_resolved(&self) -> bool {
        self.children.resolved().is_some()
    }
}
