//! Build hook: the core sequences element creation, a renderer performs it.

use std::fmt;

use crate::domain::ids::NodeId;
use crate::domain::record::StructuralRecord;

/// Opaque handle to an element created by a [`Renderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementHandle(pub u64);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// What a renderer needs to know to create one element.
#[derive(Debug)]
pub struct ElementSpec<'a> {
    pub node: NodeId,
    pub node_type: Option<String>,
    pub record: Option<&'a StructuralRecord>,
    pub parent: Option<ElementHandle>,
}

/// Rendering collaborator that owns element construction.
pub trait Renderer {
    fn create_element(&mut self, spec: &ElementSpec<'_>) -> ElementHandle;
}
