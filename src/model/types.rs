//! Core types shared by model backends and the tree engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque handle to an element inside one loaded document.
///
/// Handles are process-local: they are never sent to clients directly and
/// only mean something to the document that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(u64);

impl ElementRef {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// The coarse shape of a node, sent to clients as `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An ordered collection of elements.
    Container,
    /// A value with no structure below it.
    Leaf,
    /// Anything else: a structured element with named parts.
    Object,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Container => write!(f, "container"),
            NodeKind::Leaf => write!(f, "leaf"),
            NodeKind::Object => write!(f, "object"),
        }
    }
}

/// A command a provider offers for an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub id: String,
    pub label: String,
    /// `/`-separated submenu path, e.g. `"New Child"`.
    pub group: Option<String>,
}

impl CommandDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            group: None,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}
