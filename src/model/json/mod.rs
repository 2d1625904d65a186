//! Structured-data backend: JSON, YAML and TOML files as trees.
//!
//! Objects and arrays become structured elements, scalars become leaves and
//! `{"$ref": "other.yaml"}` links pull further files into the same document.

pub mod commands;
pub mod document;
pub mod format;
pub mod provider;

pub use document::{path_to_uri, uri_to_path, Content, JsonDocument};
pub use format::Format;
pub use provider::JsonItemProvider;

use std::sync::Arc;

use crate::error::BackendError;
use crate::model::{ModelBackend, ProviderRegistry};

/// Loads [`JsonDocument`]s from local files.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBackend;

impl ModelBackend for JsonBackend {
    type Document = JsonDocument;

    fn load(&self, uri: &str) -> Result<JsonDocument, BackendError> {
        JsonDocument::open(uri)
    }
}

/// Providers for every semantic type this backend reports.
pub fn providers() -> ProviderRegistry<JsonDocument> {
    let mut registry = ProviderRegistry::new();
    registry.register(format!("{}:*", document::NAMESPACE), Arc::new(JsonItemProvider));
    registry
}
