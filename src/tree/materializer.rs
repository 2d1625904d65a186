//! Depth-bounded tree snapshots.

use std::cell::Cell;
use tracing::{debug, warn};

use super::resolver;
use super::types::{Label, TreeNode};
use crate::error::{Result, TspError};
use crate::model::{ElementRef, ModelDocument, ProviderRegistry};

/// Builds [`TreeNode`] snapshots of one document.
///
/// Every level looks its elements up again by node id instead of reusing the
/// handles from the level above. Traversal is bounded by the requested depth
/// and, when set, by a node budget: once that many nodes exist, the rest are
/// returned collapsed. Links that fan out into the same resource grow a
/// snapshot exponentially with depth, so the budget is what bounds them.
pub struct Materializer<'a, D> {
    doc: &'a D,
    providers: &'a ProviderRegistry<D>,
    max_nodes: Option<usize>,
    emitted: Cell<usize>,
}

impl<'a, D: ModelDocument> Materializer<'a, D> {
    pub fn new(doc: &'a D, providers: &'a ProviderRegistry<D>) -> Self {
        Self {
            doc,
            providers,
            max_nodes: None,
            emitted: Cell::new(0),
        }
    }

    /// Stop expanding once `max_nodes` nodes have been built.
    pub fn with_node_limit(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    fn within_budget(&self) -> bool {
        self.max_nodes.map_or(true, |max| self.emitted.get() < max)
    }

    /// Children of `node_id`, or of the document root when it is `None` or
    /// empty, expanded `depth` levels further.
    pub fn children(&self, node_id: Option<&str>, depth: u32) -> Result<Vec<TreeNode>> {
        self.emitted.set(0);
        let nodes = match node_id.filter(|id| !id.is_empty()) {
            None => self.expand(self.doc.roots(), None, depth),
            Some(id) => {
                let parent = resolver::resolve(self.doc, id, None)
                    .ok_or_else(|| TspError::node_not_found(self.doc.uri(), id))?;
                self.expand(self.doc.children(parent), Some(parent), depth)
            }
        };
        if !self.within_budget() {
            debug!(uri = self.doc.uri(), nodes = self.emitted.get(), "node budget reached");
        }
        Ok(nodes)
    }

    fn expand(&self, elements: Vec<ElementRef>, parent: Option<ElementRef>, depth: u32) -> Vec<TreeNode> {
        elements
            .into_iter()
            .map(|element| self.node(element, parent, depth))
            .collect()
    }

    fn node(&self, element: ElementRef, parent: Option<ElementRef>, depth: u32) -> TreeNode {
        let id = resolver::id_of(self.doc, element);
        self.emitted.set(self.emitted.get() + 1);
        let children = if depth == 0 || !self.within_budget() {
            None
        } else {
            match resolver::resolve(self.doc, &id, parent) {
                Some(current) => Some(self.expand(self.doc.children(current), Some(current), depth - 1)),
                None => {
                    warn!(uri = self.doc.uri(), node = %id, "child no longer resolves, leaving it collapsed");
                    None
                }
            }
        };
        TreeNode {
            kind: self.doc.kind(element),
            semantic_type: self.doc.semantic_type(element),
            label: Label::new(self.providers.label(self.doc, element)),
            id,
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::json::{self, path_to_uri, JsonDocument};
    use crate::model::NodeKind;
    use serde_json::json;

    fn doc() -> JsonDocument {
        JsonDocument::from_value("mem.json", &json!({ "p": [1, 2], "q": true }))
    }

    fn count(nodes: &[TreeNode]) -> usize {
        nodes
            .iter()
            .map(|n| 1 + n.children.as_deref().map_or(0, count))
            .sum()
    }

    /// Drop every level below `depth`.
    fn truncate(nodes: &[TreeNode], depth: u32) -> Vec<TreeNode> {
        nodes
            .iter()
            .map(|node| TreeNode {
                children: if depth == 0 {
                    None
                } else {
                    node.children.as_ref().map(|c| truncate(c, depth - 1))
                },
                ..node.clone()
            })
            .collect()
    }

    #[test]
    fn test_roots_at_depth_zero_are_collapsed() {
        let doc = doc();
        let providers = json::providers();
        let nodes = Materializer::new(&doc, &providers).children(None, 0).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, "/p");
        assert_eq!(nodes[0].kind, NodeKind::Container);
        assert_eq!(nodes[0].label.text, "p [2]");
        assert_eq!(nodes[1].id, "/q");
        assert_eq!(nodes[1].kind, NodeKind::Leaf);
        assert!(nodes.iter().all(|n| !n.is_expanded()));

        let same = Materializer::new(&doc, &providers).children(Some(""), 0).unwrap();
        assert_eq!(same, nodes);
    }

    #[test]
    fn test_children_of_a_node() {
        let doc = doc();
        let providers = json::providers();
        let nodes = Materializer::new(&doc, &providers).children(Some("/p"), 0).unwrap();
        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["/p/0", "/p/1"]);
        assert!(nodes.iter().all(|n| n.children.is_none()));
    }

    #[test]
    fn test_depth_one_expands_one_level() {
        let doc = doc();
        let providers = json::providers();
        let nodes = Materializer::new(&doc, &providers).children(None, 1).unwrap();
        let p_children = nodes[0].children.as_ref().unwrap();
        assert_eq!(p_children.len(), 2);
        assert!(p_children.iter().all(|n| n.children.is_none()));
        // A probed leaf is expanded with nothing in it.
        assert_eq!(nodes[1].children, Some(Vec::new()));
    }

    #[test]
    fn test_depth_monotonicity() {
        let doc = JsonDocument::from_value(
            "mem.json",
            &json!({ "a": { "b": { "c": [1, { "d": null }] } }, "e": [] }),
        );
        let providers = json::providers();
        let m = Materializer::new(&doc, &providers);
        let deep = m.children(None, 4).unwrap();
        for d in 0..=4 {
            assert_eq!(truncate(&deep, d), m.children(None, d).unwrap(), "depth {d}");
        }
    }

    #[test]
    fn test_unknown_node() {
        let doc = doc();
        let providers = json::providers();
        let err = Materializer::new(&doc, &providers)
            .children(Some("/nope"), 0)
            .unwrap_err();
        assert!(matches!(err, TspError::NodeNotFound { ref node_id, .. } if node_id == "/nope"));
    }

    #[test]
    fn test_cyclic_links_are_bounded_by_depth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.json");
        std::fs::write(&path, r#"{ "again": { "$ref": "loop.json" } }"#).unwrap();
        let doc = JsonDocument::open(&path_to_uri(&path)).unwrap();
        let providers = json::providers();

        let nodes = Materializer::new(&doc, &providers).children(None, 3).unwrap();
        let mut level = &nodes;
        let mut levels = 0;
        while let Some(children) = level[0].children.as_ref() {
            assert_eq!(level[0].id, "/again");
            level = children;
            levels += 1;
        }
        assert_eq!(levels, 3);
    }

    #[test]
    fn test_fan_out_links_stop_at_node_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.json");
        std::fs::write(&path, r#"{ "a": { "$ref": "loop.json" }, "b": { "$ref": "loop.json" } }"#)
            .unwrap();
        let doc = JsonDocument::open(&path_to_uri(&path)).unwrap();
        let providers = json::providers();
        let m = Materializer::new(&doc, &providers).with_node_limit(1000);

        // Unbounded, depth 64 would be 2^65 nodes.
        let nodes = m.children(None, 64).unwrap();
        let total = count(&nodes);
        assert!(total >= 1000, "{total}");
        assert!(total <= 1000 + 2 * 65, "{total}");

        // Small snapshots are unaffected, and the budget resets per call.
        let small = m.children(None, 3).unwrap();
        assert_eq!(count(&small), 2 + 4 + 8 + 16);
        assert_eq!(small, Materializer::new(&doc, &providers).children(None, 3).unwrap());
    }
}
