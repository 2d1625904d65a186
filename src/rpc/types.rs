//! JSON-RPC 2.0 message structures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TspError;

// ─── JSON-RPC 2.0 Base Types ────────────────────────────────────

/// An incoming request, or a notification when `id` is absent.
#[derive(Debug, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// An outgoing JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    /// Always present; `null` when the request id could not be read.
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// Error response carrying the error's code and structured data.
    pub fn from_error(id: Value, err: &TspError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code: err.code(),
                message: err.to_string(),
                data: Some(err.data()),
            }),
        }
    }
}

/// A server-to-client notification.
#[derive(Debug, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

// ─── TSP Handshake Types ────────────────────────────────────────

/// `initialize` result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// What this server supports.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    pub tree: bool,
    pub commands: bool,
    pub undo_redo: bool,
    pub save: bool,
    pub max_depth: u32,
}

/// Server identity.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_without_id() {
        let message: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"exit"}"#).unwrap();
        assert!(message.id.is_none());
        assert_eq!(message.params, Value::Null);
    }

    #[test]
    fn test_error_response_shape() {
        let err = TspError::document_not_found("file:///x.json");
        let response = JsonRpcResponse::from_error(json!(4), &err);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], 4);
        assert_eq!(value["error"]["code"], -32001);
        assert_eq!(value["error"]["data"]["kind"], "documentNotFound");
        assert_eq!(value["error"]["data"]["documentUri"], "file:///x.json");
        assert!(value.get("result").is_none());

        let parse = JsonRpcResponse::error(Value::Null, -32700, "Parse error".to_string());
        let value = serde_json::to_value(&parse).unwrap();
        assert_eq!(value["id"], Value::Null);
        assert!(value["error"].get("data").is_none());
    }
}
