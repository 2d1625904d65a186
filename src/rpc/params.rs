//! Request and notification parameters, as sent on the wire.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TspError};

// Document methods
pub const OPEN_DOCUMENT: &str = "document/openDocument";
pub const CLOSE_DOCUMENT: &str = "document/closeDocument";
pub const SAVE_DOCUMENT: &str = "document/saveDocument";
pub const UNDO_EDITS: &str = "document/undoEdits";
pub const REDO_EDITS: &str = "document/redoEdits";
pub const GET_DOCUMENT_INFO: &str = "document/getDocumentInfo";
pub const DOCUMENT_EDITED: &str = "document/edited";

// Tree methods
pub const GET_CHILDREN: &str = "tree/getChildren";
pub const GET_COMMAND_MENU: &str = "tree/getCommandMenu";
pub const DO_COMMAND: &str = "tree/doCommand";

// Lifecycle
pub const INITIALIZE: &str = "initialize";
pub const PING: &str = "ping";
pub const SHUTDOWN: &str = "shutdown";
pub const EXIT: &str = "exit";

/// Decode `params` into `T`, reporting failures as invalid params.
pub fn parse<T: DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| TspError::InvalidParams(e.to_string()))
}

fn one() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentParams {
    pub document_uri: String,
}

/// Also the result of `tree/doCommand`, `document/undoEdits` and
/// `document/redoEdits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEditedParams {
    pub document_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUri {
    pub new_uri: String,
    /// `true` re-keys the session to `new_uri`; `false` writes a copy.
    pub use_new_uri: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDocumentParams {
    pub document_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_uri: Option<NewUri>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCountParams {
    pub document_uri: String,
    #[serde(default = "one")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetChildrenParams {
    pub document_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_node_id: Option<String>,
    #[serde(default)]
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNodeParams {
    pub document_uri: String,
    pub tree_node_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoCommandParams {
    pub document_uri: String,
    pub tree_node_id: String,
    pub command_id: String,
}
