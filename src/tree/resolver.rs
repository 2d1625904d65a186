//! Node identity: element <-> node id within one document.
//!
//! Ids come from the backend's [`ModelDocument::stable_id`] when it has one.
//! Otherwise the element handle itself is used, written as `@<hex>`. Such ids
//! are process-local and not portable across snapshots; clients should not
//! persist them.

use crate::model::{ElementRef, ModelDocument};

/// Prefix of process-local fallback ids.
pub const FALLBACK_PREFIX: char = '@';

/// The node id of `element`. Deterministic for a given structural version.
pub fn id_of<D: ModelDocument>(doc: &D, element: ElementRef) -> String {
    doc.stable_id(element)
        .unwrap_or_else(|| format!("{FALLBACK_PREFIX}{element}"))
}

/// The element `node_id` names in the document's current state.
///
/// `context` is the element the id was issued under, if known. Ids that
/// name an element no longer in the document do not resolve, and neither do
/// fallback ids that [`id_of`] would not produce for that element.
pub fn resolve<D: ModelDocument>(
    doc: &D,
    node_id: &str,
    context: Option<ElementRef>,
) -> Option<ElementRef> {
    let element = match node_id.strip_prefix(FALLBACK_PREFIX) {
        Some(hex) => {
            let element = ElementRef::new(u64::from_str_radix(hex, 16).ok()?);
            if doc.stable_id(element).is_some() || id_of(doc, element) != node_id {
                return None;
            }
            element
        }
        None => doc.element_for_id(node_id, context)?,
    };
    doc.contains(element).then_some(element)
}
