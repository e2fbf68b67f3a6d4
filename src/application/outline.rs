//! Renderer producing an indented text outline of built elements.

use std::collections::HashMap;

use crate::domain::{ElementHandle, ElementSpec, Renderer};

/// Creates sequential element handles and records one outline line per element.
#[derive(Debug, Default)]
pub struct OutlineRenderer {
    next: u64,
    depths: HashMap<ElementHandle, usize>,
    lines: Vec<String>,
}

impl OutlineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl Renderer for OutlineRenderer {
    fn create_element(&mut self, spec: &ElementSpec<'_>) -> ElementHandle {
        self.next += 1;
        let handle = ElementHandle(self.next);
        let depth = spec
            .parent
            .and_then(|p| self.depths.get(&p))
            .map_or(0, |d| d + 1);
        self.depths.insert(handle, depth);

        let tag = spec.node_type.as_deref().unwrap_or("?");
        let line = match spec.record.and_then(|r| r.label.as_deref()) {
            Some(label) => format!("{}<{}> {}", "  ".repeat(depth), tag, label),
            None => format!("{}<{}>", "  ".repeat(depth), tag),
        };
        self.lines.push(line);
        handle
    }
}
