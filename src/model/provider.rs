//! Capability providers: labels and commands per semantic type.
//!
//! A provider is registered under a pattern: an exact semantic type
//! (`json:object`), a namespace wildcard (`json:*`) or `*`. Lookup tries
//! them in that order, so specific providers shadow general ones.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::{CommandDescriptor, ElementRef};
use super::{Command, ModelDocument};

/// What can be said about, and done to, elements of some semantic type.
pub trait ItemProvider<D>: Send + Sync {
    /// Display text, or `None` to keep the backend's plain label.
    fn label(&self, _doc: &D, _element: ElementRef) -> Option<String> {
        None
    }

    /// Commands applicable to `element` in its current state.
    fn commands(&self, _doc: &D, _element: ElementRef) -> Vec<CommandDescriptor> {
        Vec::new()
    }

    /// Build the command `command_id` for `element`, if it is offered.
    fn create_command(
        &self,
        _doc: &D,
        _element: ElementRef,
        _command_id: &str,
    ) -> Option<Box<dyn Command<D>>> {
        None
    }
}

/// Semantic type pattern -> provider.
pub struct ProviderRegistry<D> {
    providers: HashMap<String, Arc<dyn ItemProvider<D>>>,
}

impl<D> Default for ProviderRegistry<D> {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }
}

impl<D: ModelDocument> ProviderRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` for `pattern`, replacing any previous one.
    pub fn register(&mut self, pattern: impl Into<String>, provider: Arc<dyn ItemProvider<D>>) {
        self.providers.insert(pattern.into(), provider);
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// The provider responsible for `semantic_type`.
    pub fn provider_for(&self, semantic_type: &str) -> Option<&Arc<dyn ItemProvider<D>>> {
        if let Some(provider) = self.providers.get(semantic_type) {
            return Some(provider);
        }
        if let Some((namespace, _)) = semantic_type.split_once(':') {
            if let Some(provider) = self.providers.get(&format!("{namespace}:*")) {
                return Some(provider);
            }
        }
        self.providers.get("*")
    }

    /// The provider for the element's current semantic type.
    pub fn provider_for_element(
        &self,
        doc: &D,
        element: ElementRef,
    ) -> Option<&Arc<dyn ItemProvider<D>>> {
        self.provider_for(&doc.semantic_type(element))
    }

    /// Provider label if there is one, else the backend label.
    pub fn label(&self, doc: &D, element: ElementRef) -> String {
        self.provider_for_element(doc, element)
            .and_then(|provider| provider.label(doc, element))
            .unwrap_or_else(|| doc.label(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::model::NodeKind;

    /// Two leaves: element 1 is `demo:Thing`, element 2 is `other:Thing`.
    struct Fixture;

    impl ModelDocument for Fixture {
        fn uri(&self) -> &str {
            "mem://fixture"
        }
        fn roots(&self) -> Vec<ElementRef> {
            vec![ElementRef::new(1), ElementRef::new(2)]
        }
        fn children(&self, _element: ElementRef) -> Vec<ElementRef> {
            Vec::new()
        }
        fn contains(&self, element: ElementRef) -> bool {
            matches!(element.raw(), 1 | 2)
        }
        fn kind(&self, _element: ElementRef) -> NodeKind {
            NodeKind::Leaf
        }
        fn semantic_type(&self, element: ElementRef) -> String {
            match element.raw() {
                1 => "demo:Thing".to_string(),
                _ => "other:Thing".to_string(),
            }
        }
        fn label(&self, element: ElementRef) -> String {
            format!("plain {}", element.raw())
        }
        fn generation(&self) -> u64 {
            0
        }
        fn save(&mut self, _target: &str) -> Result<(), BackendError> {
            Ok(())
        }
        fn relocate(&mut self, _uri: &str) {}
        fn release(&mut self) -> Vec<String> {
            Vec::new()
        }
    }

    struct Named(&'static str);

    impl ItemProvider<Fixture> for Named {
        fn label(&self, _doc: &Fixture, _element: ElementRef) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    #[test]
    fn test_lookup_order() {
        let mut registry = ProviderRegistry::<Fixture>::new();
        registry.register("*", Arc::new(Named("global")));
        registry.register("demo:*", Arc::new(Named("namespace")));

        let doc = Fixture;
        assert_eq!(registry.label(&doc, ElementRef::new(1)), "namespace");
        assert_eq!(registry.label(&doc, ElementRef::new(2)), "global");

        registry.register("demo:Thing", Arc::new(Named("exact")));
        assert_eq!(registry.label(&doc, ElementRef::new(1)), "exact");
    }

    #[test]
    fn test_label_falls_back_to_backend() {
        let registry = ProviderRegistry::<Fixture>::new();
        assert!(registry.is_empty());
        assert_eq!(registry.label(&Fixture, ElementRef::new(2)), "plain 2");
    }
}
