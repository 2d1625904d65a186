//! Per-document linear undo/redo history.
//!
//! The stack keeps every executed command in order with a pointer `top` to
//! the number currently applied. Entries above `top` are redoable until the
//! next execute discards them.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::error::BackendError;
use crate::model::{Command, ModelDocument};

/// What a stack mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackChange {
    Executed,
    Undone(usize),
    Redone(usize),
}

/// Receives one call per stack mutation, after the document changed.
pub trait EditListener: Send + Sync {
    fn document_edited(&self, uri: &str, change: StackChange);
}

#[derive(Debug, Error)]
pub enum CommandStackError {
    #[error("cannot undo {requested} edit(s), {available} available")]
    NothingToUndo { requested: usize, available: usize },

    #[error("cannot redo {requested} edit(s), {available} available")]
    NothingToRedo { requested: usize, available: usize },

    #[error("command cannot execute in the current state")]
    Rejected,

    #[error("command failed: {0}")]
    Failed(#[source] BackendError),
}

pub struct CommandStack<D> {
    entries: Vec<Box<dyn Command<D>>>,
    top: usize,
    limit: Option<usize>,
    /// `top` at the last save; `None` once that state is unreachable.
    save_point: Option<usize>,
    listener: Option<Arc<dyn EditListener>>,
}

impl<D> fmt::Debug for CommandStack<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandStack")
            .field("entries", &self.entries.len())
            .field("top", &self.top)
            .field("limit", &self.limit)
            .field("save_point", &self.save_point)
            .finish()
    }
}

impl<D: ModelDocument> CommandStack<D> {
    /// A stack keeping at most `limit` undoable entries, or all of them.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            top: 0,
            limit,
            save_point: Some(0),
            listener: None,
        }
    }

    pub fn set_listener(&mut self, listener: Arc<dyn EditListener>) {
        self.listener = Some(listener);
    }

    pub fn undo_count(&self) -> usize {
        self.top
    }

    pub fn redo_count(&self) -> usize {
        self.entries.len() - self.top
    }

    pub fn undo_label(&self) -> Option<String> {
        self.top
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(|c| c.label())
    }

    pub fn redo_label(&self) -> Option<String> {
        self.entries.get(self.top).map(|c| c.label())
    }

    /// Whether the document differs from its last saved state.
    pub fn is_dirty(&self) -> bool {
        self.save_point != Some(self.top)
    }

    pub fn mark_saved(&mut self) {
        self.save_point = Some(self.top);
    }

    /// Execute `command` and push it. On failure nothing changes.
    pub fn execute(
        &mut self,
        doc: &mut D,
        mut command: Box<dyn Command<D>>,
    ) -> Result<(), CommandStackError> {
        if !command.can_execute(doc) {
            return Err(CommandStackError::Rejected);
        }
        command.execute(doc).map_err(CommandStackError::Failed)?;

        self.entries.truncate(self.top);
        if self.save_point.map_or(false, |p| p > self.top) {
            self.save_point = None;
        }
        self.entries.push(command);
        self.top += 1;
        self.trim();
        self.notify(doc, StackChange::Executed);
        Ok(())
    }

    /// Revert the top `count` entries, newest first.
    pub fn undo(&mut self, doc: &mut D, count: usize) -> Result<(), CommandStackError> {
        if count > self.top {
            return Err(CommandStackError::NothingToUndo {
                requested: count,
                available: self.top,
            });
        }
        for done in 0..count {
            if let Err(e) = self.entries[self.top - 1].undo(doc) {
                self.notify_partial(doc, StackChange::Undone(done));
                return Err(CommandStackError::Failed(e));
            }
            self.top -= 1;
        }
        self.notify_partial(doc, StackChange::Undone(count));
        Ok(())
    }

    /// Re-apply the next `count` undone entries, oldest first.
    pub fn redo(&mut self, doc: &mut D, count: usize) -> Result<(), CommandStackError> {
        let available = self.redo_count();
        if count > available {
            return Err(CommandStackError::NothingToRedo {
                requested: count,
                available,
            });
        }
        for done in 0..count {
            if let Err(e) = self.entries[self.top].redo(doc) {
                self.notify_partial(doc, StackChange::Redone(done));
                return Err(CommandStackError::Failed(e));
            }
            self.top += 1;
        }
        self.notify_partial(doc, StackChange::Redone(count));
        Ok(())
    }

    /// Drop the oldest entries beyond the limit.
    fn trim(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };
        let excess = self.entries.len().saturating_sub(limit);
        if excess == 0 {
            return;
        }
        self.entries.drain(..excess);
        self.top -= excess;
        self.save_point = self.save_point.and_then(|p| p.checked_sub(excess));
    }

    fn notify_partial(&self, doc: &D, change: StackChange) {
        let processed = match change {
            StackChange::Undone(n) | StackChange::Redone(n) => n,
            StackChange::Executed => 1,
        };
        if processed > 0 {
            self.notify(doc, change);
        }
    }

    fn notify(&self, doc: &D, change: StackChange) {
        if let Some(listener) = &self.listener {
            listener.document_edited(doc.uri(), change);
        }
    }
}
