//! The outgoing side of the connection.
//!
//! Everything written to the client, responses and notifications alike,
//! goes through one unbounded channel drained by a single writer, so
//! messages leave in the order they were sent.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::params::{DocumentEditedParams, DOCUMENT_EDITED};
use super::types::JsonRpcNotification;
use crate::session::{EditListener, StackChange};

/// Cheap, cloneable sender of messages to the client.
#[derive(Debug, Clone)]
pub struct Client {
    tx: mpsc::UnboundedSender<Value>,
}

/// Receiving end of a [`Client`].
#[derive(Debug)]
pub struct Outbox {
    rx: mpsc::UnboundedReceiver<Value>,
}

impl Client {
    pub fn channel() -> (Client, Outbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Client { tx }, Outbox { rx })
    }

    /// Queue a message. Dropped with a log line if the writer is gone.
    pub fn send(&self, message: impl Serialize) {
        let value = match serde_json::to_value(message) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "failed to serialize outgoing message");
                return;
            }
        };
        if self.tx.send(value).is_err() {
            debug!("client connection closed, dropping message");
        }
    }

    pub fn notify(&self, method: &str, params: impl Serialize) {
        match serde_json::to_value(params) {
            Ok(params) => self.send(JsonRpcNotification::new(method, params)),
            Err(e) => error!(method, error = %e, "failed to serialize notification"),
        }
    }
}

impl EditListener for Client {
    fn document_edited(&self, uri: &str, change: StackChange) {
        debug!(uri, ?change, "document edited");
        self.notify(
            DOCUMENT_EDITED,
            DocumentEditedParams {
                document_uri: uri.to_string(),
            },
        );
    }
}

impl Outbox {
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// A queued message, without waiting.
    pub fn try_recv(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }

    /// Every message queued so far.
    pub fn drain(&mut self) -> Vec<Value> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
