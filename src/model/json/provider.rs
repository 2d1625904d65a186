//! Labels and commands for structured-data elements.

use serde_json::{json, Value};

use super::commands::{DeleteCommand, InsertCommand, MoveCommand, ToggleCommand};
use super::document::{Content, JsonDocument};
use crate::model::{Command, CommandDescriptor, ElementRef, ItemProvider, ModelDocument};

pub const DELETE: &str = "delete";
pub const DUPLICATE: &str = "duplicate";
pub const MOVE_UP: &str = "move-up";
pub const MOVE_DOWN: &str = "move-down";
pub const TOGGLE: &str = "toggle";
pub const NEW_CHILD_PREFIX: &str = "new-child/";

const NEW_CHILD_GROUP: &str = "New Child";

/// Object members whose string value names the object.
const NAME_KEYS: [&str; 3] = ["name", "id", "title"];

/// (type name, menu label, default value, key base)
fn new_child_kinds() -> [(&'static str, &'static str, Value, &'static str); 6] {
    [
        ("object", "Object", json!({}), "newObject"),
        ("array", "Array", json!([]), "newArray"),
        ("string", "String", json!(""), "newString"),
        ("number", "Number", json!(0), "newNumber"),
        ("boolean", "Boolean", json!(false), "newBoolean"),
        ("null", "Null", Value::Null, "newNull"),
    ]
}

/// Provider for every `json:*` semantic type.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonItemProvider;

impl JsonItemProvider {
    fn name_of(doc: &JsonDocument, element: ElementRef) -> Option<String> {
        let Some(Content::Object(children)) = doc.content(element) else {
            return None;
        };
        NAME_KEYS.iter().find_map(|name| {
            children
                .iter()
                .find(|c| doc.key(**c) == Some(*name))
                .and_then(|c| match doc.content(*c) {
                    Some(Content::Scalar(Value::String(s))) => Some(s.clone()),
                    _ => None,
                })
        })
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ItemProvider<JsonDocument> for JsonItemProvider {
    fn label(&self, doc: &JsonDocument, element: ElementRef) -> Option<String> {
        let member = doc.member_name(element);
        let label = match (doc.content(element)?, member) {
            (Content::Scalar(value), Some(name)) => format!("{name}: {}", render_scalar(value)),
            (Content::Scalar(value), None) => render_scalar(value),
            (Content::Array(items), name) => {
                format!("{} [{}]", name.unwrap_or_default(), items.len())
                    .trim_start()
                    .to_string()
            }
            (Content::Ref { target, .. }, name) => {
                format!("{} → {target}", name.unwrap_or_default())
                    .trim_start()
                    .to_string()
            }
            (Content::Object(_), name) => {
                let title = Self::name_of(doc, element)?;
                match name {
                    Some(name) => format!("{name} {title}"),
                    None => title,
                }
            }
        };
        Some(label)
    }

    fn commands(&self, doc: &JsonDocument, element: ElementRef) -> Vec<CommandDescriptor> {
        let mut commands = Vec::new();
        if !doc.contains(element) {
            return commands;
        }

        if matches!(
            doc.content(element),
            Some(Content::Object(_)) | Some(Content::Array(_))
        ) {
            for (kind, label, _, _) in new_child_kinds() {
                commands.push(
                    CommandDescriptor::new(format!("{NEW_CHILD_PREFIX}{kind}"), label)
                        .in_group(NEW_CHILD_GROUP),
                );
            }
        }

        if let Some(index) = doc.index_in_parent(element) {
            commands.push(CommandDescriptor::new(DUPLICATE, "Duplicate"));
            if index > 0 {
                commands.push(CommandDescriptor::new(MOVE_UP, "Move Up"));
            }
            let siblings = doc.parent(element).map(|p| doc.children(p).len()).unwrap_or(0);
            if index + 1 < siblings {
                commands.push(CommandDescriptor::new(MOVE_DOWN, "Move Down"));
            }
            commands.push(CommandDescriptor::new(DELETE, "Delete"));
        }

        if matches!(doc.content(element), Some(Content::Scalar(Value::Bool(_)))) {
            commands.push(CommandDescriptor::new(TOGGLE, "Toggle"));
        }
        commands
    }

    fn create_command(
        &self,
        doc: &JsonDocument,
        element: ElementRef,
        command_id: &str,
    ) -> Option<Box<dyn Command<JsonDocument>>> {
        if !self.commands(doc, element).iter().any(|c| c.id == command_id) {
            return None;
        }
        let command: Box<dyn Command<JsonDocument>> = match command_id {
            DELETE => Box::new(DeleteCommand::new(element)),
            DUPLICATE => Box::new(InsertCommand::duplicate(doc, element)?),
            MOVE_UP => Box::new(MoveCommand::up(element)),
            MOVE_DOWN => Box::new(MoveCommand::down(element)),
            TOGGLE => Box::new(ToggleCommand::new(element)),
            other => {
                let kind = other.strip_prefix(NEW_CHILD_PREFIX)?;
                let (_, label, value, key) = new_child_kinds()
                    .into_iter()
                    .find(|(name, ..)| *name == kind)?;
                Box::new(InsertCommand::new_child(
                    element,
                    value,
                    key,
                    format!("New {label}"),
                ))
            }
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> JsonDocument {
        JsonDocument::from_value(
            "mem.json",
            &json!({
                "title": "Cup",
                "teams": [{ "name": "red" }, { "size": 2 }],
                "open": true,
                "next": { "$ref": "next.json" }
            }),
        )
    }

    fn ids(commands: &[CommandDescriptor]) -> Vec<&str> {
        commands.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_labels() {
        let doc = doc();
        let p = JsonItemProvider;
        let label = |id: &str| p.label(&doc, doc.element_for_id(id, None).unwrap());
        assert_eq!(label("/title").as_deref(), Some("title: Cup"));
        assert_eq!(label("/teams").as_deref(), Some("teams [2]"));
        assert_eq!(label("/teams/0").as_deref(), Some("[0] red"));
        assert_eq!(label("/teams/1"), None);
        assert_eq!(label("/open").as_deref(), Some("open: true"));
        assert_eq!(label("/next").as_deref(), Some("next → next.json"));
    }

    #[test]
    fn test_commands_follow_state() {
        let doc = doc();
        let p = JsonItemProvider;
        let teams = doc.element_for_id("/teams", None).unwrap();
        let commands = p.commands(&doc, teams);
        assert_eq!(
            ids(&commands),
            vec![
                "new-child/object",
                "new-child/array",
                "new-child/string",
                "new-child/number",
                "new-child/boolean",
                "new-child/null",
                "duplicate",
                "move-up",
                "move-down",
                "delete",
            ]
        );
        assert_eq!(commands[0].group.as_deref(), Some("New Child"));

        let title = doc.element_for_id("/title", None).unwrap();
        assert_eq!(ids(&p.commands(&doc, title)), vec!["duplicate", "move-down", "delete"]);

        let open = doc.element_for_id("/open", None).unwrap();
        assert!(ids(&p.commands(&doc, open)).contains(&"toggle"));
    }

    #[test]
    fn test_create_command_only_when_offered() {
        let mut doc = doc();
        let p = JsonItemProvider;
        let title = doc.element_for_id("/title", None).unwrap();
        assert!(p.create_command(&doc, title, MOVE_UP).is_none());
        assert!(p.create_command(&doc, title, "new-child/object").is_none());
        assert!(p.create_command(&doc, title, "bogus").is_none());

        let teams = doc.element_for_id("/teams", None).unwrap();
        let mut cmd = p.create_command(&doc, teams, "new-child/number").unwrap();
        assert_eq!(cmd.label(), "New Number");
        cmd.execute(&mut doc).unwrap();
        let root = doc.element_for_id("#", None).unwrap();
        assert_eq!(doc.to_value(root).unwrap()["teams"][2], json!(0));
    }
}
