//! Error types for the TSP server.
//!
//! `TspError` is what a protocol request can fail with; every variant maps to
//! a JSON-RPC error code and carries enough context (document, node, command)
//! for a client to show an actionable message. `BackendError` is what a model
//! backend reports; the protocol front classifies it into a `FailureReason`
//! so that backend internals never reach the wire.

use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// JSON-RPC error codes used on the wire.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const DOCUMENT_NOT_FOUND: i64 = -32001;
    pub const NODE_NOT_FOUND: i64 = -32002;
    pub const ALREADY_OPEN: i64 = -32003;
    pub const LOAD_FAILED: i64 = -32004;
    pub const SAVE_FAILED: i64 = -32005;
    pub const COMMAND_FAILED: i64 = -32006;
    pub const NOTHING_TO_UNDO: i64 = -32007;
    pub const NOTHING_TO_REDO: i64 = -32008;
}

/// Client-safe category of a backend or command failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The document (or a resource it links to) does not exist.
    Missing,
    /// The document could not be parsed.
    Malformed,
    /// The document format is not supported by the backend.
    Unsupported,
    /// The command's precondition no longer holds.
    Precondition,
    /// The command id is not offered for the node.
    UnknownCommand,
    /// Reading or writing storage failed.
    Io,
    /// Anything else the backend reported.
    Backend,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Missing => write!(f, "document not found"),
            FailureReason::Malformed => write!(f, "malformed document"),
            FailureReason::Unsupported => write!(f, "unsupported document format"),
            FailureReason::Precondition => write!(f, "precondition no longer holds"),
            FailureReason::UnknownCommand => write!(f, "command not applicable"),
            FailureReason::Io => write!(f, "i/o error"),
            FailureReason::Backend => write!(f, "backend error"),
        }
    }
}

/// Errors reported by a model backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("not found: {0}")]
    Missing(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("unsupported document: {0}")]
    Unsupported(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error(transparent)]
    Io(std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            BackendError::Missing(err.to_string())
        } else {
            BackendError::Io(err)
        }
    }
}

impl BackendError {
    /// The category a client is allowed to see.
    pub fn reason(&self) -> FailureReason {
        match self {
            BackendError::Missing(_) => FailureReason::Missing,
            BackendError::Malformed(_) => FailureReason::Malformed,
            BackendError::Unsupported(_) => FailureReason::Unsupported,
            BackendError::Precondition(_) => FailureReason::Precondition,
            BackendError::Io(_) => FailureReason::Io,
            BackendError::Other(_) => FailureReason::Backend,
        }
    }
}

/// Errors returned by protocol operations.
#[derive(Debug, Error)]
pub enum TspError {
    #[error("document not found: {uri}")]
    DocumentNotFound { uri: String },

    #[error("node '{node_id}' not found in {uri}")]
    NodeNotFound { uri: String, node_id: String },

    #[error("document already open: {uri}")]
    AlreadyOpen { uri: String },

    #[error("failed to load {uri}: {reason}")]
    LoadFailed { uri: String, reason: FailureReason },

    #[error("failed to save {uri}: {reason}")]
    SaveFailed { uri: String, reason: FailureReason },

    #[error("command '{command_id}' failed on node '{node_id}' in {uri}: {reason}")]
    CommandFailed {
        uri: String,
        node_id: String,
        command_id: String,
        reason: FailureReason,
    },

    #[error("cannot undo {requested} edit(s) in {uri}: {available} available")]
    NothingToUndo {
        uri: String,
        requested: usize,
        available: usize,
    },

    #[error("cannot redo {requested} edit(s) in {uri}: {available} available")]
    NothingToRedo {
        uri: String,
        requested: usize,
        available: usize,
    },

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TspError {
    pub fn document_not_found(uri: impl Into<String>) -> Self {
        TspError::DocumentNotFound { uri: uri.into() }
    }

    pub fn node_not_found(uri: impl Into<String>, node_id: impl Into<String>) -> Self {
        TspError::NodeNotFound {
            uri: uri.into(),
            node_id: node_id.into(),
        }
    }

    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i64 {
        match self {
            TspError::DocumentNotFound { .. } => codes::DOCUMENT_NOT_FOUND,
            TspError::NodeNotFound { .. } => codes::NODE_NOT_FOUND,
            TspError::AlreadyOpen { .. } => codes::ALREADY_OPEN,
            TspError::LoadFailed { .. } => codes::LOAD_FAILED,
            TspError::SaveFailed { .. } => codes::SAVE_FAILED,
            TspError::CommandFailed { .. } => codes::COMMAND_FAILED,
            TspError::NothingToUndo { .. } => codes::NOTHING_TO_UNDO,
            TspError::NothingToRedo { .. } => codes::NOTHING_TO_REDO,
            TspError::InvalidParams(_) => codes::INVALID_PARAMS,
            TspError::MethodNotFound(_) => codes::METHOD_NOT_FOUND,
            TspError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Stable machine-readable kind, sent as `data.kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            TspError::DocumentNotFound { .. } => "documentNotFound",
            TspError::NodeNotFound { .. } => "nodeNotFound",
            TspError::AlreadyOpen { .. } => "alreadyOpen",
            TspError::LoadFailed { .. } => "loadFailed",
            TspError::SaveFailed { .. } => "saveFailed",
            TspError::CommandFailed { .. } => "commandFailed",
            TspError::NothingToUndo { .. } => "nothingToUndo",
            TspError::NothingToRedo { .. } => "nothingToRedo",
            TspError::InvalidParams(_) => "invalidParams",
            TspError::MethodNotFound(_) => "methodNotFound",
            TspError::Internal(_) => "internal",
        }
    }

    /// Structured error payload for the JSON-RPC `data` field.
    pub fn data(&self) -> Value {
        let mut data = json!({ "kind": self.kind() });
        let fields = match self {
            TspError::DocumentNotFound { uri }
            | TspError::AlreadyOpen { uri }
            | TspError::NothingToUndo { uri, .. }
            | TspError::NothingToRedo { uri, .. } => json!({ "documentUri": uri }),
            TspError::LoadFailed { uri, reason } | TspError::SaveFailed { uri, reason } => {
                json!({ "documentUri": uri, "reason": reason.to_string() })
            }
            TspError::NodeNotFound { uri, node_id } => {
                json!({ "documentUri": uri, "nodeId": node_id })
            }
            TspError::CommandFailed {
                uri,
                node_id,
                command_id,
                reason,
            } => json!({
                "documentUri": uri,
                "nodeId": node_id,
                "commandId": command_id,
                "reason": reason.to_string(),
            }),
            TspError::InvalidParams(_) | TspError::MethodNotFound(_) | TspError::Internal(_) => {
                Value::Null
            }
        };
        if let (Value::Object(target), Value::Object(extra)) = (&mut data, fields) {
            target.extend(extra);
        }
        data
    }
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, TspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_missing() {
        let err: BackendError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.reason(), FailureReason::Missing);

        let err: BackendError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert_eq!(err.reason(), FailureReason::Io);
    }

    #[test]
    fn test_error_data_carries_context() {
        let err = TspError::CommandFailed {
            uri: "file:///a.json".to_string(),
            node_id: "/x".to_string(),
            command_id: "delete".to_string(),
            reason: FailureReason::Precondition,
        };
        assert_eq!(err.code(), codes::COMMAND_FAILED);
        let data = err.data();
        assert_eq!(data["kind"], "commandFailed");
        assert_eq!(data["documentUri"], "file:///a.json");
        assert_eq!(data["nodeId"], "/x");
        assert_eq!(data["commandId"], "delete");
        assert_eq!(data["reason"], "precondition no longer holds");
    }

    #[test]
    fn test_load_failure_hides_backend_detail() {
        let backend = BackendError::Malformed("expected value at line 3 column 7".to_string());
        let err = TspError::LoadFailed {
            uri: "doc.json".to_string(),
            reason: backend.reason(),
        };
        assert!(!err.to_string().contains("line 3"));
        assert_eq!(err.to_string(), "failed to load doc.json: malformed document");
    }
}
