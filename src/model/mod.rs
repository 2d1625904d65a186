//! The model backend seam.
//!
//! The tree engine never knows a document's concrete schema. It talks to a
//! [`ModelBackend`] that loads documents, to the loaded [`ModelDocument`]
//! that enumerates elements, and to [`ItemProvider`]s that describe what can
//! be done to an element. Edits are [`Command`]s, which the per-document
//! command stack executes and reverts.

pub mod json;
pub mod provider;
pub mod types;

pub use provider::{ItemProvider, ProviderRegistry};
pub use types::{CommandDescriptor, ElementRef, NodeKind};

use crate::error::BackendError;

/// Loads documents of one model family.
pub trait ModelBackend: Send + Sync + 'static {
    type Document: ModelDocument;

    /// Load the document at `uri`, including every auxiliary resource it
    /// needs. Blocking; called off the async executor.
    fn load(&self, uri: &str) -> Result<Self::Document, BackendError>;
}

/// A loaded document as the tree engine sees it.
pub trait ModelDocument: Send + 'static {
    /// URI of the primary resource.
    fn uri(&self) -> &str;

    /// Top-level elements, in document order.
    fn roots(&self) -> Vec<ElementRef>;

    /// Children of `element`, in document order.
    fn children(&self, element: ElementRef) -> Vec<ElementRef>;

    /// Whether `element` is currently part of the document structure.
    fn contains(&self, element: ElementRef) -> bool;

    fn kind(&self, element: ElementRef) -> NodeKind;

    /// Model-defined type tag, `namespace:Type`.
    fn semantic_type(&self, element: ElementRef) -> String;

    /// Plain display text; providers may supply a richer one.
    fn label(&self, element: ElementRef) -> String;

    /// A structural id that survives until the next structural edit.
    ///
    /// Backends without one return `None` and the resolver falls back to a
    /// process-local id.
    fn stable_id(&self, _element: ElementRef) -> Option<String> {
        None
    }

    /// Inverse of [`ModelDocument::stable_id`]. `context` is the element the
    /// id was issued under, for backends that resolve relative ids.
    fn element_for_id(&self, _id: &str, _context: Option<ElementRef>) -> Option<ElementRef> {
        None
    }

    /// Structural version; bumped by every edit.
    fn generation(&self) -> u64;

    /// URIs of every resource this document owns, primary first.
    fn resources(&self) -> Vec<String> {
        vec![self.uri().to_string()]
    }

    /// Write the primary resource to `target`.
    fn save(&mut self, target: &str) -> Result<(), BackendError>;

    /// Make `uri` the document's own location (after save-as).
    fn relocate(&mut self, uri: &str);

    /// Unload every resource. Returns the released URIs.
    fn release(&mut self) -> Vec<String>;
}

/// A reversible edit of a document.
pub trait Command<D>: Send {
    fn label(&self) -> String;

    /// Re-checks the command's precondition against the current state.
    fn can_execute(&self, doc: &D) -> bool;

    /// Apply the command. On error the document must be unchanged.
    fn execute(&mut self, doc: &mut D) -> Result<(), BackendError>;

    /// Revert a previous `execute` or `redo`.
    fn undo(&mut self, doc: &mut D) -> Result<(), BackendError>;

    /// Re-apply after `undo`.
    fn redo(&mut self, doc: &mut D) -> Result<(), BackendError> {
        self.execute(doc)
    }
}
