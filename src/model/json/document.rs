//! Arena-backed structured-data document.
//!
//! Every JSON value becomes a slot addressed by an [`ElementRef`]. Slots are
//! never reused: an element removed by a command stays in the arena, detached,
//! so that undo can put the very same element back.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

use super::format::Format;
use crate::error::BackendError;
use crate::model::{ElementRef, ModelDocument, NodeKind};

/// Key that turns an object into a link to another resource.
pub const REF_KEY: &str = "$ref";

/// Namespace of every semantic type this backend reports.
pub const NAMESPACE: &str = "json";

/// What a slot holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Object members, in document order. Keys live on the children.
    Object(Vec<ElementRef>),
    Array(Vec<ElementRef>),
    /// `null`, boolean, number or string.
    Scalar(Value),
    /// `{"$ref": target}`; `resource` is set once the target is loaded.
    Ref {
        target: String,
        resource: Option<usize>,
    },
}

#[derive(Debug, Clone)]
struct Slot {
    resource: usize,
    parent: Option<ElementRef>,
    /// Member name when the parent is an object.
    key: Option<String>,
    content: Content,
}

#[derive(Debug, Clone)]
struct Resource {
    uri: String,
    path: PathBuf,
    format: Format,
    root: ElementRef,
}

/// A loaded document plus every resource reachable through `$ref` links.
#[derive(Debug)]
pub struct JsonDocument {
    uri: String,
    /// Index 0 is the primary resource.
    resources: Vec<Resource>,
    slots: HashMap<ElementRef, Slot>,
    next_key: u64,
    generation: u64,
}

impl JsonDocument {
    /// Load the document at `uri` and, transitively, every resource it links.
    pub fn open(uri: &str) -> Result<Self, BackendError> {
        let path = uri_to_path(uri)?;
        let path = std::fs::canonicalize(&path)?;
        let format = Format::from_path(&path);
        let text = std::fs::read_to_string(&path)?;
        let value = format.parse(&text)?;

        let mut doc = Self::empty(uri);
        doc.add_resource(uri.to_string(), path, format, &value);
        doc.load_links();
        debug!(uri, resources = doc.resources.len(), slots = doc.slots.len(), "document loaded");
        Ok(doc)
    }

    /// Build a document from an in-memory value. Links are left unresolved.
    pub fn from_value(uri: &str, value: &Value) -> Self {
        let path = uri_to_path(uri).unwrap_or_else(|_| PathBuf::from(uri));
        let format = Format::from_path(&path);
        let mut doc = Self::empty(uri);
        doc.add_resource(uri.to_string(), path, format, value);
        doc
    }

    fn empty(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            resources: Vec::new(),
            slots: HashMap::new(),
            next_key: 1,
            generation: 0,
        }
    }

    fn add_resource(&mut self, uri: String, path: PathBuf, format: Format, value: &Value) -> usize {
        let index = self.resources.len();
        let root = self.alloc(value, index, None, None);
        self.resources.push(Resource {
            uri,
            path,
            format,
            root,
        });
        index
    }

    fn alloc(
        &mut self,
        value: &Value,
        resource: usize,
        parent: Option<ElementRef>,
        key: Option<String>,
    ) -> ElementRef {
        let element = ElementRef::new(self.next_key);
        self.next_key += 1;

        let content = match value {
            Value::Object(map) => match link_target(map) {
                Some(target) => Content::Ref {
                    target: target.to_string(),
                    resource: None,
                },
                None => Content::Object(
                    map.iter()
                        .map(|(k, v)| self.alloc(v, resource, Some(element), Some(k.clone())))
                        .collect(),
                ),
            },
            Value::Array(items) => Content::Array(
                items
                    .iter()
                    .map(|v| self.alloc(v, resource, Some(element), None))
                    .collect(),
            ),
            scalar => Content::Scalar(scalar.clone()),
        };

        self.slots.insert(
            element,
            Slot {
                resource,
                parent,
                key,
                content,
            },
        );
        element
    }

    /// Resolve `$ref` links breadth-first over resources, loading each target
    /// file once. Targets that cannot be loaded stay unresolved.
    fn load_links(&mut self) {
        let mut next = 0;
        while next < self.resources.len() {
            let base = self.resources[next].path.clone();
            for element in self.links_in(self.resources[next].root) {
                let Some(Content::Ref { target, .. }) = self.content(element).cloned() else {
                    continue;
                };
                match self.link_resource(&base, &target) {
                    Ok(index) => {
                        if let Some(Content::Ref { resource, .. }) =
                            self.slots.get_mut(&element).map(|slot| &mut slot.content)
                        {
                            *resource = Some(index);
                        }
                    }
                    Err(e) => {
                        warn!(from = %base.display(), link = %target, error = %e, "unresolved $ref");
                    }
                }
            }
            next += 1;
        }
    }

    fn link_resource(&mut self, base: &Path, target: &str) -> Result<usize, BackendError> {
        let joined = base
            .parent()
            .map(|dir| dir.join(target))
            .unwrap_or_else(|| PathBuf::from(target));
        let path = std::fs::canonicalize(joined)?;
        if let Some(index) = self.resources.iter().position(|r| r.path == path) {
            return Ok(index);
        }
        let format = Format::from_path(&path);
        let value = format.parse(&std::fs::read_to_string(&path)?)?;
        let uri = path_to_uri(&path);
        debug!(uri, "loading linked resource");
        Ok(self.add_resource(uri, path, format, &value))
    }

    /// Link elements under `root`, in document order. Does not follow links.
    fn links_in(&self, root: ElementRef) -> Vec<ElementRef> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(element) = stack.pop() {
            match self.content(element) {
                Some(Content::Object(children)) | Some(Content::Array(children)) => {
                    stack.extend(children.iter().rev().copied());
                }
                Some(Content::Ref { .. }) => found.push(element),
                _ => {}
            }
        }
        found
    }

    fn next_generation(&mut self) {
        self.generation += 1;
    }

    // ─── Read Access ────────────────────────────────────────────

    pub fn content(&self, element: ElementRef) -> Option<&Content> {
        self.slots.get(&element).map(|slot| &slot.content)
    }

    pub fn parent(&self, element: ElementRef) -> Option<ElementRef> {
        self.slots.get(&element).and_then(|slot| slot.parent)
    }

    /// Member key, if the element sits in an object.
    pub fn key(&self, element: ElementRef) -> Option<&str> {
        self.slots.get(&element).and_then(|slot| slot.key.as_deref())
    }

    /// Position among the parent's children, if attached to a parent.
    pub fn index_in_parent(&self, element: ElementRef) -> Option<usize> {
        let parent = self.parent(element)?;
        self.child_slots(parent)?.iter().position(|c| *c == element)
    }

    /// `key` for object members, `[i]` for array items.
    pub fn member_name(&self, element: ElementRef) -> Option<String> {
        let parent = self.parent(element)?;
        match self.content(parent)? {
            Content::Object(children) if children.contains(&element) => {
                self.key(element).map(str::to_string)
            }
            Content::Array(children) => children
                .iter()
                .position(|c| *c == element)
                .map(|i| format!("[{i}]")),
            _ => None,
        }
    }

    /// Direct object/array children, without following links.
    fn child_slots(&self, element: ElementRef) -> Option<&Vec<ElementRef>> {
        match self.content(element)? {
            Content::Object(children) | Content::Array(children) => Some(children),
            _ => None,
        }
    }

    fn resource_roots(&self, index: usize) -> Vec<ElementRef> {
        let Some(resource) = self.resources.get(index) else {
            return Vec::new();
        };
        match self.child_slots(resource.root) {
            Some(children) => children.clone(),
            None => vec![resource.root],
        }
    }

    fn resource_index(&self, uri: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.uri == uri)
    }

    /// Path segments from the element's resource root, or `None` if the
    /// element is detached.
    fn segments(&self, element: ElementRef) -> Option<Vec<String>> {
        let mut segments = Vec::new();
        let mut current = element;
        loop {
            let slot = self.slots.get(&current)?;
            let Some(parent) = slot.parent else {
                let resource = self.resources.get(slot.resource)?;
                if resource.root != current {
                    return None;
                }
                break;
            };
            let segment = match self.content(parent)? {
                Content::Object(children) if children.contains(&current) => slot.key.clone()?,
                Content::Array(children) => children.iter().position(|c| *c == current)?.to_string(),
                _ => return None,
            };
            segments.push(segment);
            current = parent;
        }
        segments.reverse();
        Some(segments)
    }

    /// RFC 6901 pointer of the element within its resource.
    pub fn pointer(&self, element: ElementRef) -> Option<String> {
        self.segments(element).map(|segments| {
            segments
                .iter()
                .map(|s| format!("/{}", escape_segment(s)))
                .collect()
        })
    }

    fn walk(&self, resource: usize, pointer: &str) -> Option<ElementRef> {
        let mut current = self.resources.get(resource)?.root;
        if pointer.is_empty() {
            return Some(current);
        }
        let rest = pointer.strip_prefix('/')?;
        for raw in rest.split('/') {
            let segment = unescape_segment(raw);
            current = match self.content(current)? {
                Content::Object(children) => *children
                    .iter()
                    .find(|c| self.key(**c) == Some(segment.as_str()))?,
                Content::Array(children) => *children.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Rebuild the JSON value of an element.
    pub fn to_value(&self, element: ElementRef) -> Option<Value> {
        Some(match self.content(element)? {
            Content::Object(children) => {
                let mut map = Map::new();
                for child in children {
                    let key = self.key(*child)?.to_string();
                    map.insert(key, self.to_value(*child)?);
                }
                Value::Object(map)
            }
            Content::Array(children) => Value::Array(
                children
                    .iter()
                    .map(|c| self.to_value(*c))
                    .collect::<Option<Vec<_>>>()?,
            ),
            Content::Scalar(value) => value.clone(),
            Content::Ref { target, .. } => {
                let mut map = Map::new();
                map.insert(REF_KEY.to_string(), Value::String(target.clone()));
                Value::Object(map)
            }
        })
    }

    /// A sibling key based on `base` that is not used in `parent`.
    pub fn unique_key(&self, parent: ElementRef, base: &str) -> String {
        let taken = |key: &str| {
            self.child_slots(parent)
                .map(|children| children.iter().any(|c| self.key(*c) == Some(key)))
                .unwrap_or(false)
        };
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    // ─── Mutation ───────────────────────────────────────────────

    /// Allocate a detached element in `parent`'s resource.
    pub fn create_detached(
        &mut self,
        parent: ElementRef,
        value: &Value,
        key: Option<String>,
    ) -> Result<ElementRef, BackendError> {
        let resource = self
            .slots
            .get(&parent)
            .map(|slot| slot.resource)
            .ok_or_else(|| BackendError::Precondition("parent no longer exists".to_string()))?;
        Ok(self.alloc(value, resource, None, key))
    }

    /// Allocate a detached deep copy of `element`, keeping resolved links.
    pub fn copy_detached(
        &mut self,
        element: ElementRef,
        key: Option<String>,
    ) -> Result<ElementRef, BackendError> {
        let slot = self
            .slots
            .get(&element)
            .cloned()
            .ok_or_else(|| BackendError::Precondition("element no longer exists".to_string()))?;
        let copy = ElementRef::new(self.next_key);
        self.next_key += 1;
        let content = match &slot.content {
            Content::Object(children) | Content::Array(children) => {
                let mut copies = Vec::with_capacity(children.len());
                for child in children {
                    let child_key = self.key(*child).map(str::to_string);
                    let child_copy = self.copy_detached(*child, child_key)?;
                    if let Some(s) = self.slots.get_mut(&child_copy) {
                        s.parent = Some(copy);
                    }
                    copies.push(child_copy);
                }
                match slot.content {
                    Content::Object(_) => Content::Object(copies),
                    _ => Content::Array(copies),
                }
            }
            other => other.clone(),
        };
        self.slots.insert(
            copy,
            Slot {
                resource: slot.resource,
                parent: None,
                key,
                content,
            },
        );
        Ok(copy)
    }

    /// Attach a detached `child` under `parent` at `index`.
    pub fn insert_child(
        &mut self,
        parent: ElementRef,
        index: usize,
        child: ElementRef,
    ) -> Result<(), BackendError> {
        if !self.contains(parent) {
            return Err(BackendError::Precondition("parent is not in the document".to_string()));
        }
        if self.contains(child) {
            return Err(BackendError::Precondition("element is already attached".to_string()));
        }
        let child_key = self.key(child).map(str::to_string);
        let clash = match (self.content(parent), &child_key) {
            (Some(Content::Object(_)), Some(key)) => self.unique_key(parent, key) != *key,
            (Some(Content::Object(_)), None) => {
                return Err(BackendError::Precondition("object member needs a key".to_string()))
            }
            (Some(Content::Array(_)), _) => false,
            _ => {
                return Err(BackendError::Precondition("parent cannot hold children".to_string()))
            }
        };
        if clash {
            return Err(BackendError::Precondition("duplicate member key".to_string()));
        }
        let children = match self.slots.get_mut(&parent).map(|slot| &mut slot.content) {
            Some(Content::Object(children)) | Some(Content::Array(children)) => children,
            _ => return Err(BackendError::Precondition("parent cannot hold children".to_string())),
        };
        if index > children.len() {
            return Err(BackendError::Precondition("insert position out of range".to_string()));
        }
        children.insert(index, child);
        if let Some(slot) = self.slots.get_mut(&child) {
            slot.parent = Some(parent);
        }
        self.next_generation();
        Ok(())
    }

    /// Detach `element` from its parent. Returns where it was.
    pub fn detach(&mut self, element: ElementRef) -> Result<(ElementRef, usize), BackendError> {
        if !self.contains(element) {
            return Err(BackendError::Precondition("element is not in the document".to_string()));
        }
        let parent = self
            .parent(element)
            .ok_or_else(|| BackendError::Precondition("cannot remove a resource root".to_string()))?;
        let index = self
            .index_in_parent(element)
            .ok_or_else(|| BackendError::Precondition("element is not a child".to_string()))?;
        if let Some(Content::Object(children)) | Some(Content::Array(children)) =
            self.slots.get_mut(&parent).map(|slot| &mut slot.content)
        {
            children.remove(index);
        }
        self.next_generation();
        Ok((parent, index))
    }

    /// Move an attached element to `to` among its siblings.
    pub fn move_child(&mut self, element: ElementRef, to: usize) -> Result<usize, BackendError> {
        if !self.contains(element) {
            return Err(BackendError::Precondition("element is not in the document".to_string()));
        }
        let (parent, from) = match (self.parent(element), self.index_in_parent(element)) {
            (Some(parent), Some(from)) => (parent, from),
            _ => return Err(BackendError::Precondition("element is not a child".to_string())),
        };
        if let Some(Content::Object(children)) | Some(Content::Array(children)) =
            self.slots.get_mut(&parent).map(|slot| &mut slot.content)
        {
            if to >= children.len() {
                return Err(BackendError::Precondition("move position out of range".to_string()));
            }
            let moved = children.remove(from);
            children.insert(to, moved);
        }
        self.next_generation();
        Ok(from)
    }

    /// Replace a scalar value. Returns the previous value.
    pub fn set_scalar(&mut self, element: ElementRef, value: Value) -> Result<Value, BackendError> {
        if value.is_object() || value.is_array() {
            return Err(BackendError::Precondition("not a scalar value".to_string()));
        }
        match self.slots.get_mut(&element).map(|slot| &mut slot.content) {
            Some(Content::Scalar(current)) => {
                let previous = std::mem::replace(current, value);
                self.next_generation();
                Ok(previous)
            }
            _ => Err(BackendError::Precondition("element is not a scalar".to_string())),
        }
    }
}

impl ModelDocument for JsonDocument {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn roots(&self) -> Vec<ElementRef> {
        self.resource_roots(0)
    }

    fn children(&self, element: ElementRef) -> Vec<ElementRef> {
        match self.content(element) {
            Some(Content::Object(children)) | Some(Content::Array(children)) => children.clone(),
            Some(Content::Ref {
                resource: Some(index),
                ..
            }) => self.resource_roots(*index),
            _ => Vec::new(),
        }
    }

    fn contains(&self, element: ElementRef) -> bool {
        self.segments(element).is_some()
    }

    fn kind(&self, element: ElementRef) -> NodeKind {
        match self.content(element) {
            Some(Content::Array(_)) => NodeKind::Container,
            Some(Content::Scalar(_)) | None => NodeKind::Leaf,
            Some(Content::Object(_)) | Some(Content::Ref { .. }) => NodeKind::Object,
        }
    }

    fn semantic_type(&self, element: ElementRef) -> String {
        let name = match self.content(element) {
            Some(Content::Object(_)) => "object",
            Some(Content::Array(_)) => "array",
            Some(Content::Ref { .. }) => "ref",
            Some(Content::Scalar(Value::String(_))) => "string",
            Some(Content::Scalar(Value::Number(_))) => "number",
            Some(Content::Scalar(Value::Bool(_))) => "boolean",
            Some(Content::Scalar(_)) | None => "null",
        };
        format!("{NAMESPACE}:{name}")
    }

    fn label(&self, element: ElementRef) -> String {
        if let Some(name) = self.member_name(element) {
            return name;
        }
        match self.content(element) {
            Some(Content::Scalar(Value::String(s))) => s.clone(),
            Some(Content::Scalar(value)) => value.to_string(),
            _ => self
                .slots
                .get(&element)
                .and_then(|slot| self.resources.get(slot.resource))
                .and_then(|r| r.path.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }

    fn stable_id(&self, element: ElementRef) -> Option<String> {
        let resource = self.slots.get(&element)?.resource;
        let pointer = self.pointer(element)?;
        Some(match (resource, pointer.is_empty()) {
            (0, true) => "#".to_string(),
            (0, false) => pointer,
            (index, _) => format!("{}#{}", self.resources.get(index)?.uri, pointer),
        })
    }

    fn element_for_id(&self, id: &str, _context: Option<ElementRef>) -> Option<ElementRef> {
        if id == "#" {
            return self.walk(0, "");
        }
        if id.starts_with('/') {
            return self.walk(0, id);
        }
        let (uri, pointer) = id.split_once('#')?;
        self.walk(self.resource_index(uri)?, pointer)
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn resources(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.uri.clone()).collect()
    }

    fn save(&mut self, target: &str) -> Result<(), BackendError> {
        let root = self
            .resources
            .first()
            .map(|r| r.root)
            .ok_or_else(|| BackendError::Other("document is released".to_string()))?;
        let value = self
            .to_value(root)
            .ok_or_else(|| BackendError::Other("document structure is inconsistent".to_string()))?;
        let path = uri_to_path(target)?;
        let text = Format::from_path(&path).render(&value)?;
        std::fs::write(&path, text)?;
        debug!(uri = %self.uri, to = %target, "document written");
        Ok(())
    }

    fn relocate(&mut self, uri: &str) {
        self.uri = uri.to_string();
        if let Some(primary) = self.resources.first_mut() {
            primary.uri = uri.to_string();
            if let Ok(path) = uri_to_path(uri) {
                primary.format = Format::from_path(&path);
                primary.path = std::fs::canonicalize(&path).unwrap_or(path);
            }
        }
    }

    fn release(&mut self) -> Vec<String> {
        let released = self.resources.drain(..).map(|r| r.uri).collect();
        self.slots.clear();
        self.next_generation();
        released
    }
}

/// The `$ref` target if `map` is a link object.
fn link_target(map: &Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    map.get(REF_KEY).and_then(Value::as_str)
}

/// Accepts `file://` URLs and plain paths.
pub fn uri_to_path(uri: &str) -> Result<PathBuf, BackendError> {
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| BackendError::Unsupported(format!("not a local file: {uri}"))),
        // One-letter schemes are Windows drive letters.
        Ok(url) if url.scheme().len() > 1 => Err(BackendError::Unsupported(format!(
            "unsupported scheme: {}",
            url.scheme()
        ))),
        _ => Ok(PathBuf::from(uri)),
    }
}

pub fn path_to_uri(path: &Path) -> String {
    Url::from_file_path(path)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
