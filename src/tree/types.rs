//! Wire shapes of the tree protocol.

use serde::{Deserialize, Serialize};

use crate::model::NodeKind;

/// Display text of a node or menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// An immutable snapshot of one element and, optionally, its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub semantic_type: String,
    pub label: Label,
    /// `None` means not expanded; `Some(vec![])` means expanded, no children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }
}

/// A labelled group of menu items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub label: Label,
    pub items: Vec<MenuItem>,
}

impl Menu {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Label::new(label),
            items: Vec::new(),
        }
    }
}

/// A command entry, executed with `tree/doCommand`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandItem {
    pub id: String,
    pub label: Label,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MenuItem {
    Menu(Menu),
    Command(CommandItem),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tree_node_wire_shape() {
        let node = TreeNode {
            id: "/a".to_string(),
            kind: NodeKind::Container,
            semantic_type: "json:array".to_string(),
            label: Label::new("a [0]"),
            children: None,
        };
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "id": "/a",
                "type": "container",
                "semanticType": "json:array",
                "label": { "text": "a [0]" }
            })
        );

        let expanded = TreeNode {
            children: Some(Vec::new()),
            ..node
        };
        assert_eq!(serde_json::to_value(&expanded).unwrap()["children"], json!([]));
    }

    #[test]
    fn test_menu_items_are_untagged() {
        let menu = Menu {
            label: Label::new("root"),
            items: vec![
                MenuItem::Menu(Menu::new("New Child")),
                MenuItem::Command(CommandItem {
                    id: "delete".to_string(),
                    label: Label::new("Delete"),
                }),
            ],
        };
        let value = serde_json::to_value(&menu).unwrap();
        assert_eq!(
            value,
            json!({
                "label": { "text": "root" },
                "items": [
                    { "label": { "text": "New Child" }, "items": [] },
                    { "id": "delete", "label": { "text": "Delete" } }
                ]
            })
        );
        let back: Menu = serde_json::from_value(value).unwrap();
        assert_eq!(back, menu);
    }
}
