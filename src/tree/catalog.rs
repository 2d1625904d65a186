//! Command discovery: what a node's provider offers, rendered as a menu.

use super::types::{CommandItem, Label, Menu, MenuItem};
use crate::model::{Command, CommandDescriptor, ElementRef, ModelDocument, ProviderRegistry};

/// The command menu for `element`, computed from its current state.
///
/// Elements without a provider get an empty menu.
pub fn menu_for<D: ModelDocument>(
    doc: &D,
    providers: &ProviderRegistry<D>,
    element: ElementRef,
) -> Menu {
    let mut menu = Menu::new(providers.label(doc, element));
    let descriptors = providers
        .provider_for_element(doc, element)
        .map(|provider| provider.commands(doc, element))
        .unwrap_or_default();
    for descriptor in descriptors {
        let CommandDescriptor { id, label, group } = descriptor;
        let path: Vec<&str> = group
            .as_deref()
            .map(|g| g.split('/').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        place(
            &mut menu.items,
            &path,
            CommandItem {
                id,
                label: Label::new(label),
            },
        );
    }
    menu
}

/// Put `command` under the submenu `path`, creating submenus on first use.
fn place(items: &mut Vec<MenuItem>, path: &[&str], command: CommandItem) {
    let Some((head, rest)) = path.split_first() else {
        items.push(MenuItem::Command(command));
        return;
    };
    let index = match items
        .iter()
        .position(|item| matches!(item, MenuItem::Menu(m) if m.label.text == *head))
    {
        Some(index) => index,
        None => {
            items.push(MenuItem::Menu(Menu::new(*head)));
            items.len() - 1
        }
    };
    if let Some(MenuItem::Menu(submenu)) = items.get_mut(index) {
        place(&mut submenu.items, rest, command);
    }
}

/// Build the command `command_id` for `element`, if its provider offers it.
pub fn command_for<D: ModelDocument>(
    doc: &D,
    providers: &ProviderRegistry<D>,
    element: ElementRef,
    command_id: &str,
) -> Option<Box<dyn Command<D>>> {
    providers
        .provider_for_element(doc, element)?
        .create_command(doc, element, command_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::json::{self, JsonDocument};
    use crate::model::{ItemProvider, ProviderRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn labels(items: &[MenuItem]) -> Vec<&str> {
        items
            .iter()
            .map(|item| match item {
                MenuItem::Menu(m) => m.label.text.as_str(),
                MenuItem::Command(c) => c.label.text.as_str(),
            })
            .collect()
    }

    #[test]
    fn test_groups_become_submenus() {
        let doc = JsonDocument::from_value("mem.json", &json!({ "list": [1], "flag": true }));
        let providers = json::providers();
        let list = doc.element_for_id("/list", None).unwrap();

        let menu = menu_for(&doc, &providers, list);
        assert_eq!(menu.label.text, "list [1]");
        assert_eq!(
            labels(&menu.items),
            vec!["New Child", "Duplicate", "Move Down", "Delete"]
        );
        let MenuItem::Menu(new_child) = &menu.items[0] else {
            panic!("expected a submenu");
        };
        assert_eq!(new_child.items.len(), 6);
        assert!(matches!(&new_child.items[0], MenuItem::Command(c) if c.id == "new-child/object"));
    }

    #[test]
    fn test_nested_group_paths() {
        let mut items = Vec::new();
        let item = |id: &str| CommandItem {
            id: id.to_string(),
            label: Label::new(id),
        };
        place(&mut items, &["Edit", "Insert"], item("a"));
        place(&mut items, &["Edit"], item("b"));
        place(&mut items, &["Edit", "Insert"], item("c"));
        place(&mut items, &[], item("d"));

        assert_eq!(labels(&items), vec!["Edit", "d"]);
        let MenuItem::Menu(edit) = &items[0] else {
            panic!("expected a submenu");
        };
        assert_eq!(labels(&edit.items), vec!["Insert", "b"]);
        let MenuItem::Menu(insert) = &edit.items[0] else {
            panic!("expected a submenu");
        };
        assert_eq!(labels(&insert.items), vec!["a", "c"]);
    }

    #[test]
    fn test_no_provider_means_empty_menu() {
        let doc = JsonDocument::from_value("mem.json", &json!({ "x": 1 }));
        let providers = ProviderRegistry::<JsonDocument>::new();
        let x = doc.element_for_id("/x", None).unwrap();
        let menu = menu_for(&doc, &providers, x);
        assert_eq!(menu.label.text, "x");
        assert!(menu.items.is_empty());
        assert!(command_for(&doc, &providers, x, "delete").is_none());
    }

    #[test]
    fn test_exact_provider_shadows_namespace() {
        struct ReadOnly;
        impl ItemProvider<JsonDocument> for ReadOnly {}

        let doc = JsonDocument::from_value("mem.json", &json!({ "x": 1, "y": "s" }));
        let mut providers = json::providers();
        providers.register("json:number", Arc::new(ReadOnly));

        let x = doc.element_for_id("/x", None).unwrap();
        let y = doc.element_for_id("/y", None).unwrap();
        assert!(menu_for(&doc, &providers, x).items.is_empty());
        assert!(!menu_for(&doc, &providers, y).items.is_empty());
    }
}
