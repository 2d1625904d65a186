//! Reversible edits of a [`JsonDocument`].
//!
//! Commands hold element handles, not ids: a removed element stays in the
//! arena, so undo and redo move the very same element in and out.

use serde_json::Value;

use super::document::{Content, JsonDocument};
use crate::error::BackendError;
use crate::model::{Command, ElementRef, ModelDocument};

fn precondition(message: &str) -> BackendError {
    BackendError::Precondition(message.to_string())
}

fn is_collection(doc: &JsonDocument, element: ElementRef) -> bool {
    matches!(
        doc.content(element),
        Some(Content::Object(_)) | Some(Content::Array(_))
    )
}

/// Removes an element from its parent.
pub struct DeleteCommand {
    element: ElementRef,
    placement: Option<(ElementRef, usize)>,
}

impl DeleteCommand {
    pub fn new(element: ElementRef) -> Self {
        Self {
            element,
            placement: None,
        }
    }
}

impl Command<JsonDocument> for DeleteCommand {
    fn label(&self) -> String {
        "Delete".to_string()
    }

    fn can_execute(&self, doc: &JsonDocument) -> bool {
        doc.contains(self.element) && doc.index_in_parent(self.element).is_some()
    }

    fn execute(&mut self, doc: &mut JsonDocument) -> Result<(), BackendError> {
        if !self.can_execute(doc) {
            return Err(precondition("element is no longer in the document"));
        }
        self.placement = Some(doc.detach(self.element)?);
        Ok(())
    }

    fn undo(&mut self, doc: &mut JsonDocument) -> Result<(), BackendError> {
        let (parent, index) = self
            .placement
            .ok_or_else(|| precondition("delete was not executed"))?;
        doc.insert_child(parent, index, self.element)
    }
}

/// What an [`InsertCommand`] puts into the document.
#[derive(Debug, Clone)]
pub enum Insertion {
    /// A new value; objects get a fresh member key derived from `key`.
    Value { value: Value, key: String },
    /// A deep copy of an existing element, placed right after it.
    CopyOf(ElementRef),
}

/// Adds a new child to an object or array, or duplicates an element.
pub struct InsertCommand {
    parent: ElementRef,
    insertion: Insertion,
    label: String,
    /// Set on first execute; reused by redo.
    inserted: Option<(ElementRef, usize)>,
}

impl InsertCommand {
    /// Append `value` to `parent`.
    pub fn new_child(parent: ElementRef, value: Value, key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            parent,
            insertion: Insertion::Value {
                value,
                key: key.into(),
            },
            label: label.into(),
            inserted: None,
        }
    }

    /// Copy `element` next to itself. `None` if it has no parent.
    pub fn duplicate(doc: &JsonDocument, element: ElementRef) -> Option<Self> {
        Some(Self {
            parent: doc.parent(element)?,
            insertion: Insertion::CopyOf(element),
            label: "Duplicate".to_string(),
            inserted: None,
        })
    }

    fn create(&self, doc: &mut JsonDocument) -> Result<(ElementRef, usize), BackendError> {
        let keyed = matches!(doc.content(self.parent), Some(Content::Object(_)));
        match &self.insertion {
            Insertion::Value { value, key } => {
                let key = keyed.then(|| doc.unique_key(self.parent, key));
                let index = doc.children(self.parent).len();
                Ok((doc.create_detached(self.parent, value, key)?, index))
            }
            Insertion::CopyOf(original) => {
                let index = doc
                    .index_in_parent(*original)
                    .ok_or_else(|| precondition("element is no longer a child"))?;
                let key = match (keyed, doc.key(*original)) {
                    (true, Some(k)) => Some(doc.unique_key(self.parent, &format!("{k}Copy"))),
                    (true, None) => return Err(precondition("object member has no key")),
                    (false, _) => None,
                };
                Ok((doc.copy_detached(*original, key)?, index + 1))
            }
        }
    }
}

impl Command<JsonDocument> for InsertCommand {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn can_execute(&self, doc: &JsonDocument) -> bool {
        if !doc.contains(self.parent) || !is_collection(doc, self.parent) {
            return false;
        }
        match &self.insertion {
            Insertion::Value { .. } => true,
            Insertion::CopyOf(original) => {
                doc.contains(*original) && doc.parent(*original) == Some(self.parent)
            }
        }
    }

    fn execute(&mut self, doc: &mut JsonDocument) -> Result<(), BackendError> {
        if !self.can_execute(doc) {
            return Err(precondition("insert target is no longer available"));
        }
        let (element, index) = self.create(doc)?;
        doc.insert_child(self.parent, index, element)?;
        self.inserted = Some((element, index));
        Ok(())
    }

    fn undo(&mut self, doc: &mut JsonDocument) -> Result<(), BackendError> {
        let (element, _) = self
            .inserted
            .ok_or_else(|| precondition("insert was not executed"))?;
        doc.detach(element).map(|_| ())
    }

    fn redo(&mut self, doc: &mut JsonDocument) -> Result<(), BackendError> {
        let (element, index) = self
            .inserted
            .ok_or_else(|| precondition("insert was not executed"))?;
        doc.insert_child(self.parent, index, element)
    }
}

/// Moves an element one step among its siblings.
pub struct MoveCommand {
    element: ElementRef,
    delta: isize,
    from: Option<usize>,
}

impl MoveCommand {
    pub fn up(element: ElementRef) -> Self {
        Self {
            element,
            delta: -1,
            from: None,
        }
    }

    pub fn down(element: ElementRef) -> Self {
        Self {
            element,
            delta: 1,
            from: None,
        }
    }

    fn target(&self, doc: &JsonDocument) -> Option<usize> {
        let index = doc.index_in_parent(self.element)?;
        let siblings = doc.children(doc.parent(self.element)?).len();
        let to = index.checked_add_signed(self.delta)?;
        (to < siblings).then_some(to)
    }
}

impl Command<JsonDocument> for MoveCommand {
    fn label(&self) -> String {
        let label = if self.delta < 0 { "Move Up" } else { "Move Down" };
        label.to_string()
    }

    fn can_execute(&self, doc: &JsonDocument) -> bool {
        doc.contains(self.element) && self.target(doc).is_some()
    }

    fn execute(&mut self, doc: &mut JsonDocument) -> Result<(), BackendError> {
        let to = self
            .target(doc)
            .filter(|_| doc.contains(self.element))
            .ok_or_else(|| precondition("element cannot move further"))?;
        self.from = Some(doc.move_child(self.element, to)?);
        Ok(())
    }

    fn undo(&mut self, doc: &mut JsonDocument) -> Result<(), BackendError> {
        let from = self
            .from
            .ok_or_else(|| precondition("move was not executed"))?;
        doc.move_child(self.element, from).map(|_| ())
    }
}

/// Flips a boolean value.
pub struct ToggleCommand {
    element: ElementRef,
}

impl ToggleCommand {
    pub fn new(element: ElementRef) -> Self {
        Self { element }
    }

    fn flip(&self, doc: &mut JsonDocument) -> Result<(), BackendError> {
        let current = match doc.content(self.element) {
            Some(Content::Scalar(Value::Bool(b))) if doc.contains(self.element) => *b,
            _ => return Err(precondition("element is not a boolean in the document")),
        };
        doc.set_scalar(self.element, Value::Bool(!current)).map(|_| ())
    }
}

impl Command<JsonDocument> for ToggleCommand {
    fn label(&self) -> String {
        "Toggle".to_string()
    }

    fn can_execute(&self, doc: &JsonDocument) -> bool {
        doc.contains(self.element)
            && matches!(doc.content(self.element), Some(Content::Scalar(Value::Bool(_))))
    }

    fn execute(&mut self, doc: &mut JsonDocument) -> Result<(), BackendError> {
        self.flip(doc)
    }

    fn undo(&mut self, doc: &mut JsonDocument) -> Result<(), BackendError> {
        self.flip(doc)
    }
}
