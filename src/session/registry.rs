//! Open documents, keyed by URI.
//!
//! The map is behind a short-lived `RwLock`; each session has its own async
//! mutex held for the whole of a request, so requests on one document are
//! serialized while different documents proceed in parallel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use super::stack::{CommandStack, CommandStackError, EditListener};
use crate::error::{FailureReason, Result, TspError};
use crate::model::{Command, ModelBackend, ModelDocument};

/// Shared handle to one open document.
pub type SessionHandle<D> = Arc<Mutex<DocumentSession<D>>>;

/// Where `save` writes the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    /// The document's own URI.
    InPlace,
    /// A new URI that becomes the document's own.
    As(String),
    /// A new URI; the session keeps its current one.
    Copy(String),
}

/// Snapshot of a session's state for `document/getDocumentInfo`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub document_uri: String,
    pub dirty: bool,
    pub undo_count: usize,
    pub redo_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redo_label: Option<String>,
    pub generation: u64,
    pub opened_at: DateTime<Utc>,
    pub resources: Vec<String>,
}

/// One open document with its command stack.
#[derive(Debug)]
pub struct DocumentSession<D> {
    uri: String,
    document: D,
    stack: CommandStack<D>,
    opened_at: DateTime<Utc>,
    closed: bool,
}

impl<D: ModelDocument> DocumentSession<D> {
    pub fn new(uri: impl Into<String>, document: D, stack: CommandStack<D>) -> Self {
        Self {
            uri: uri.into(),
            document,
            stack,
            opened_at: Utc::now(),
            closed: false,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn stack(&self) -> &CommandStack<D> {
        &self.stack
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run `command` through the stack, reporting failures against `node_id`.
    pub fn execute(
        &mut self,
        node_id: &str,
        command_id: &str,
        command: Box<dyn Command<D>>,
    ) -> Result<()> {
        self.stack
            .execute(&mut self.document, command)
            .map_err(|e| lift(e, &self.uri, node_id, command_id))
    }

    pub fn undo(&mut self, count: usize) -> Result<()> {
        self.stack
            .undo(&mut self.document, count)
            .map_err(|e| lift(e, &self.uri, "", "undo"))
    }

    pub fn redo(&mut self, count: usize) -> Result<()> {
        self.stack
            .redo(&mut self.document, count)
            .map_err(|e| lift(e, &self.uri, "", "redo"))
    }

    pub fn info(&self) -> DocumentInfo {
        DocumentInfo {
            document_uri: self.uri.clone(),
            dirty: self.stack.is_dirty(),
            undo_count: self.stack.undo_count(),
            redo_count: self.stack.redo_count(),
            undo_label: self.stack.undo_label(),
            redo_label: self.stack.redo_label(),
            generation: self.document.generation(),
            opened_at: self.opened_at,
            resources: self.document.resources(),
        }
    }

    /// Write the document to `target` without touching session state.
    fn write(&mut self, target: &str) -> Result<()> {
        self.document.save(target).map_err(|e| {
            warn!(uri = %self.uri, to = target, error = %e, "save failed");
            TspError::SaveFailed {
                uri: self.uri.clone(),
                reason: e.reason(),
            }
        })
    }

    fn relocate(&mut self, uri: &str) {
        self.document.relocate(uri);
        self.uri = uri.to_string();
    }

    fn close(&mut self) -> Vec<String> {
        self.closed = true;
        self.document.release()
    }
}

/// Attach document, node and command context to a stack failure.
fn lift(err: CommandStackError, uri: &str, node_id: &str, command_id: &str) -> TspError {
    match err {
        CommandStackError::NothingToUndo {
            requested,
            available,
        } => TspError::NothingToUndo {
            uri: uri.to_string(),
            requested,
            available,
        },
        CommandStackError::NothingToRedo {
            requested,
            available,
        } => TspError::NothingToRedo {
            uri: uri.to_string(),
            requested,
            available,
        },
        CommandStackError::Rejected => TspError::CommandFailed {
            uri: uri.to_string(),
            node_id: node_id.to_string(),
            command_id: command_id.to_string(),
            reason: FailureReason::Precondition,
        },
        CommandStackError::Failed(e) => {
            warn!(uri, node = node_id, command = command_id, error = %e, "command failed");
            TspError::CommandFailed {
                uri: uri.to_string(),
                node_id: node_id.to_string(),
                command_id: command_id.to_string(),
                reason: e.reason(),
            }
        }
    }
}

/// Owns every open document.
pub struct SessionRegistry<B: ModelBackend> {
    backend: Arc<B>,
    sessions: RwLock<HashMap<String, SessionHandle<B::Document>>>,
    undo_limit: Option<usize>,
    listener: Option<Arc<dyn EditListener>>,
}

impl<B: ModelBackend> SessionRegistry<B> {
    pub fn new(backend: B, undo_limit: Option<usize>) -> Self {
        Self {
            backend: Arc::new(backend),
            sessions: RwLock::new(HashMap::new()),
            undo_limit,
            listener: None,
        }
    }

    /// Install the listener given to every session opened from now on.
    pub fn with_listener(mut self, listener: Arc<dyn EditListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    fn map_poisoned<T>(_: T) -> TspError {
        TspError::Internal("session registry lock poisoned".to_string())
    }

    pub fn is_open(&self, uri: &str) -> bool {
        self.sessions
            .read()
            .map(|sessions| sessions.contains_key(uri))
            .unwrap_or(false)
    }

    /// URIs of every open document, sorted.
    pub fn open_uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self
            .sessions
            .read()
            .map(|sessions| sessions.keys().cloned().collect())
            .unwrap_or_default();
        uris.sort();
        uris
    }

    /// Load `uri` and register it. A second open without a close in between
    /// is rejected; a failed load registers nothing.
    pub async fn open(&self, uri: &str) -> Result<()> {
        if self.is_open(uri) {
            return Err(TspError::AlreadyOpen {
                uri: uri.to_string(),
            });
        }

        let backend = Arc::clone(&self.backend);
        let target = uri.to_string();
        let loaded = tokio::task::spawn_blocking(move || backend.load(&target))
            .await
            .map_err(|e| TspError::Internal(format!("load task failed: {e}")))?;
        let mut document = loaded.map_err(|e| {
            warn!(uri, error = %e, "load failed");
            TspError::LoadFailed {
                uri: uri.to_string(),
                reason: e.reason(),
            }
        })?;

        let mut stack = CommandStack::new(self.undo_limit);
        if let Some(listener) = &self.listener {
            stack.set_listener(Arc::clone(listener));
        }
        let resources = document.resources().len();

        let mut sessions = self.sessions.write().map_err(Self::map_poisoned)?;
        if sessions.contains_key(uri) {
            // Lost a race with a concurrent open of the same URI.
            document.release();
            return Err(TspError::AlreadyOpen {
                uri: uri.to_string(),
            });
        }
        let session = DocumentSession::new(uri, document, stack);
        sessions.insert(uri.to_string(), Arc::new(Mutex::new(session)));
        info!(uri, resources, "document opened");
        Ok(())
    }

    pub fn get(&self, uri: &str) -> Result<SessionHandle<B::Document>> {
        self.sessions
            .read()
            .map_err(Self::map_poisoned)?
            .get(uri)
            .cloned()
            .ok_or_else(|| TspError::document_not_found(uri))
    }

    /// Lock the session for `uri` for the duration of a request.
    ///
    /// Fails if the session was closed or renamed while waiting for the lock.
    pub async fn lock(&self, uri: &str) -> Result<OwnedMutexGuard<DocumentSession<B::Document>>> {
        let handle = self.get(uri)?;
        let session = Arc::clone(&handle).lock_owned().await;
        if session.is_closed() || session.uri() != uri || !self.is_registered(uri, &handle) {
            return Err(TspError::document_not_found(uri));
        }
        Ok(session)
    }

    /// Whether `uri` still maps to `handle`.
    fn is_registered(&self, uri: &str, handle: &SessionHandle<B::Document>) -> bool {
        self.sessions
            .read()
            .map(|sessions| sessions.get(uri).map_or(false, |h| Arc::ptr_eq(h, handle)))
            .unwrap_or(false)
    }

    /// Unregister `uri` and release every resource it owns.
    pub async fn close(&self, uri: &str) -> Result<()> {
        let handle = self
            .sessions
            .write()
            .map_err(Self::map_poisoned)?
            .remove(uri)
            .ok_or_else(|| TspError::document_not_found(uri))?;
        let released = handle.lock().await.close();
        info!(uri, released = released.len(), "document closed");
        Ok(())
    }

    /// Save the document at `uri`. A failed save leaves the session as it was.
    pub async fn save(&self, uri: &str, target: SaveTarget) -> Result<()> {
        let session = self.lock(uri).await?;

        // Save-as claims the new URI before writing anything.
        let mut reserved = None;
        let destination = match &target {
            SaveTarget::InPlace => uri.to_string(),
            SaveTarget::As(new_uri) => {
                if new_uri != uri {
                    reserved = Some(self.reserve(uri, new_uri)?);
                }
                new_uri.clone()
            }
            SaveTarget::Copy(new_uri) => new_uri.clone(),
        };

        let written_to = destination.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let mut session = session;
            let written = session.write(&written_to);
            (session, written)
        })
        .await;
        let (mut session, written) = match joined {
            Ok(done) => done,
            Err(e) => {
                if let Some(handle) = &reserved {
                    self.unregister(&destination, handle);
                }
                return Err(TspError::Internal(format!("save task failed: {e}")));
            }
        };
        if let Err(e) = written {
            if let Some(handle) = &reserved {
                self.unregister(&destination, handle);
            }
            return Err(e);
        }

        match target {
            SaveTarget::InPlace => session.stack.mark_saved(),
            SaveTarget::As(new_uri) => {
                if let Some(handle) = &reserved {
                    self.unregister(uri, handle);
                    session.relocate(&new_uri);
                }
                session.stack.mark_saved();
            }
            SaveTarget::Copy(_) => {}
        }
        info!(uri, to = %destination, "document saved");
        Ok(())
    }

    /// Register the session of `old` under `new` as well.
    fn reserve(&self, old: &str, new: &str) -> Result<SessionHandle<B::Document>> {
        let mut sessions = self.sessions.write().map_err(Self::map_poisoned)?;
        if sessions.contains_key(new) {
            return Err(TspError::AlreadyOpen {
                uri: new.to_string(),
            });
        }
        let handle = sessions
            .get(old)
            .cloned()
            .ok_or_else(|| TspError::document_not_found(old))?;
        sessions.insert(new.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Drop `uri` if it still maps to `handle`.
    fn unregister(&self, uri: &str, handle: &SessionHandle<B::Document>) {
        if let Ok(mut sessions) = self.sessions.write() {
            if sessions.get(uri).map_or(false, |h| Arc::ptr_eq(h, handle)) {
                sessions.remove(uri);
            }
        }
    }
}
