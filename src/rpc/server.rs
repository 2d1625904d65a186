//! The protocol front: JSON-RPC dispatch over a framed byte stream.
//!
//! Requests are read one frame at a time and each is handled on its own task,
//! so a slow request on one document never holds up another. Per-document
//! ordering comes from the session lock, not from the reader.

use serde::Serialize;
use serde_json::Value;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::client::{Client, Outbox};
use super::codec::{FrameReader, Framing};
use super::params::{self, *};
use super::types::*;
use crate::config::{ServerConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES};
use crate::error::{codes, FailureReason, Result, TspError};
use crate::model::{ModelBackend, ProviderRegistry};
use crate::session::{DocumentInfo, SaveTarget, SessionRegistry};
use crate::tree::{self, Materializer, Menu, TreeNode};

/// Runtime knobs of a [`TreeServer`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServerOptions {
    pub framing: Framing,
    /// `tree/getChildren` depth is clamped to this.
    pub max_depth: u32,
    /// Node budget of one `tree/getChildren` snapshot.
    pub max_nodes: usize,
    /// Undoable edits kept per document; `None` keeps all.
    pub undo_limit: Option<usize>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            framing: Framing::ContentLength,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
            undo_limit: None,
        }
    }
}

impl From<&ServerConfig> for ServerOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            framing: config.server.framing,
            max_depth: config.server.max_depth,
            max_nodes: config.server.max_nodes,
            undo_limit: config.undo_limit(),
        }
    }
}

/// Serves documents of one model backend.
pub struct TreeServer<B: ModelBackend> {
    registry: SessionRegistry<B>,
    providers: Arc<ProviderRegistry<B::Document>>,
    client: Client,
    options: ServerOptions,
}

impl<B: ModelBackend> TreeServer<B> {
    /// Edit notifications and responses go to `client`.
    pub fn new(
        backend: B,
        providers: ProviderRegistry<B::Document>,
        options: ServerOptions,
        client: Client,
    ) -> Self {
        let registry = SessionRegistry::new(backend, options.undo_limit)
            .with_listener(Arc::new(client.clone()));
        Self {
            registry,
            providers: Arc::new(providers),
            client,
            options,
        }
    }

    pub fn registry(&self) -> &SessionRegistry<B> {
        &self.registry
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    // ─── Operations ─────────────────────────────────────────────

    pub async fn open_document(&self, uri: &str) -> Result<()> {
        self.registry.open(uri).await
    }

    pub async fn close_document(&self, uri: &str) -> Result<()> {
        self.registry.close(uri).await
    }

    pub async fn save_document(&self, uri: &str, new_uri: Option<NewUri>) -> Result<()> {
        let target = match new_uri {
            None => SaveTarget::InPlace,
            Some(NewUri {
                new_uri,
                use_new_uri: true,
            }) => SaveTarget::As(new_uri),
            Some(NewUri {
                new_uri,
                use_new_uri: false,
            }) => SaveTarget::Copy(new_uri),
        };
        self.registry.save(uri, target).await
    }

    pub async fn get_children(
        &self,
        uri: &str,
        node_id: Option<&str>,
        depth: u32,
    ) -> Result<Vec<TreeNode>> {
        let depth = if depth > self.options.max_depth {
            debug!(uri, requested = depth, max = self.options.max_depth, "clamping depth");
            self.options.max_depth
        } else {
            depth
        };
        let session = self.registry.lock(uri).await?;
        let providers = Arc::clone(&self.providers);
        let node_id = node_id.map(str::to_string);
        let max_nodes = self.options.max_nodes;
        // Snapshots can be large; build them on the blocking pool.
        tokio::task::spawn_blocking(move || {
            Materializer::new(session.document(), &providers)
                .with_node_limit(max_nodes)
                .children(node_id.as_deref(), depth)
        })
        .await
        .map_err(|e| TspError::Internal(format!("snapshot task failed: {e}")))?
    }

    pub async fn get_command_menu(&self, uri: &str, node_id: &str) -> Result<Menu> {
        let session = self.registry.lock(uri).await?;
        let doc = session.document();
        let element = tree::resolve(doc, node_id, None)
            .ok_or_else(|| TspError::node_not_found(uri, node_id))?;
        Ok(tree::menu_for(doc, &self.providers, element))
    }

    pub async fn do_command(
        &self,
        uri: &str,
        node_id: &str,
        command_id: &str,
    ) -> Result<DocumentEditedParams> {
        let mut session = self.registry.lock(uri).await?;
        let doc = session.document();
        let element = tree::resolve(doc, node_id, None)
            .ok_or_else(|| TspError::node_not_found(uri, node_id))?;
        let command = tree::command_for(doc, &self.providers, element, command_id).ok_or_else(
            || TspError::CommandFailed {
                uri: uri.to_string(),
                node_id: node_id.to_string(),
                command_id: command_id.to_string(),
                reason: FailureReason::UnknownCommand,
            },
        )?;
        debug!(uri, node = node_id, command = command_id, "executing command");
        session.execute(node_id, command_id, command)?;
        Ok(DocumentEditedParams {
            document_uri: session.uri().to_string(),
        })
    }

    pub async fn undo_edits(&self, uri: &str, count: usize) -> Result<DocumentEditedParams> {
        if count == 0 {
            return Err(TspError::InvalidParams("count must be at least 1".to_string()));
        }
        let mut session = self.registry.lock(uri).await?;
        session.undo(count)?;
        Ok(DocumentEditedParams {
            document_uri: session.uri().to_string(),
        })
    }

    pub async fn redo_edits(&self, uri: &str, count: usize) -> Result<DocumentEditedParams> {
        if count == 0 {
            return Err(TspError::InvalidParams("count must be at least 1".to_string()));
        }
        let mut session = self.registry.lock(uri).await?;
        session.redo(count)?;
        Ok(DocumentEditedParams {
            document_uri: session.uri().to_string(),
        })
    }

    pub async fn document_info(&self, uri: &str) -> Result<DocumentInfo> {
        Ok(self.registry.lock(uri).await?.info())
    }

    // ─── Dispatch ───────────────────────────────────────────────

    /// Run one request and return its result value.
    pub async fn handle(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            INITIALIZE => {
                info!("client initializing");
                to_value(InitializeResult {
                    capabilities: ServerCapabilities {
                        tree: true,
                        commands: !self.providers.is_empty(),
                        undo_redo: true,
                        save: true,
                        max_depth: self.options.max_depth,
                    },
                    server_info: ServerInfo {
                        name: "tsp-server".to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                    },
                })
            }

            PING => Ok(Value::Object(Default::default())),

            SHUTDOWN => {
                info!(open = self.registry.open_uris().len(), "shutdown requested");
                Ok(Value::Null)
            }

            OPEN_DOCUMENT => {
                let p: DocumentParams = params::parse(params)?;
                self.open_document(&p.document_uri).await?;
                Ok(Value::Null)
            }

            CLOSE_DOCUMENT => {
                let p: DocumentParams = params::parse(params)?;
                self.close_document(&p.document_uri).await?;
                Ok(Value::Null)
            }

            SAVE_DOCUMENT => {
                let p: SaveDocumentParams = params::parse(params)?;
                self.save_document(&p.document_uri, p.new_uri).await?;
                Ok(Value::Null)
            }

            GET_DOCUMENT_INFO => {
                let p: DocumentParams = params::parse(params)?;
                to_value(self.document_info(&p.document_uri).await?)
            }

            UNDO_EDITS => {
                let p: EditCountParams = params::parse(params)?;
                to_value(self.undo_edits(&p.document_uri, p.count).await?)
            }

            REDO_EDITS => {
                let p: EditCountParams = params::parse(params)?;
                to_value(self.redo_edits(&p.document_uri, p.count).await?)
            }

            GET_CHILDREN => {
                let p: GetChildrenParams = params::parse(params)?;
                let nodes = self
                    .get_children(&p.document_uri, p.tree_node_id.as_deref(), p.depth)
                    .await?;
                to_value(nodes)
            }

            GET_COMMAND_MENU => {
                let p: TreeNodeParams = params::parse(params)?;
                to_value(self.get_command_menu(&p.document_uri, &p.tree_node_id).await?)
            }

            DO_COMMAND => {
                let p: DoCommandParams = params::parse(params)?;
                let edited = self
                    .do_command(&p.document_uri, &p.tree_node_id, &p.command_id)
                    .await?;
                to_value(edited)
            }

            other => Err(TspError::MethodNotFound(other.to_string())),
        }
    }

    async fn handle_request(&self, id: Value, method: &str, params: Value) -> JsonRpcResponse {
        match self.handle(method, params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                match &e {
                    TspError::Internal(_) => error!(method, error = %e, "request failed"),
                    TspError::MethodNotFound(_) => warn!(method, "unknown method"),
                    _ => debug!(method, error = %e, "request rejected"),
                }
                JsonRpcResponse::from_error(id, &e)
            }
        }
    }

    // ─── Connection Loop ────────────────────────────────────────

    /// Serve one connection until end of input or an `exit` notification.
    ///
    /// `outbox` must belong to the [`Client`] the server was built with.
    /// Requests still running when input ends are completed and their
    /// responses flushed before this returns.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W, outbox: Outbox) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let framing = self.options.framing;
        info!(%framing, "TSP server starting");

        let (stop_tx, stop_rx) = oneshot::channel();
        let writer_task = tokio::spawn(write_loop(writer, outbox, framing, stop_rx));
        let mut frames = FrameReader::new(BufReader::new(reader), framing);
        let mut tasks = JoinSet::new();

        loop {
            let frame = match frames.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    warn!(error = %e, "invalid frame");
                    self.client.send(JsonRpcResponse::error(
                        Value::Null,
                        codes::PARSE_ERROR,
                        format!("Parse error: {e}"),
                    ));
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "failed to read input");
                    break;
                }
            };

            debug!(request = %frame, "received message");

            let message: JsonRpcMessage = match serde_json::from_str(&frame) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "invalid JSON-RPC message");
                    self.client.send(JsonRpcResponse::error(
                        Value::Null,
                        codes::PARSE_ERROR,
                        format!("Parse error: {e}"),
                    ));
                    continue;
                }
            };

            let JsonRpcMessage {
                id, method, params, ..
            } = message;
            match id {
                Some(id) => {
                    let server = Arc::clone(&self);
                    tasks.spawn(async move {
                        let response = server.handle_request(id, &method, params).await;
                        server.client.send(response);
                    });
                }
                None if method == EXIT => {
                    info!("exit notification received");
                    break;
                }
                None => debug!(method = %method, "ignoring notification"),
            }

            while let Some(done) = tasks.try_join_next() {
                log_join(done);
            }
        }

        while let Some(done) = tasks.join_next().await {
            log_join(done);
        }
        let _ = stop_tx.send(());
        writer_task
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;

        info!("TSP server stopped");
        Ok(())
    }
}

fn to_value(value: impl Serialize) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| TspError::Internal(e.to_string()))
}

fn log_join(done: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = done {
        error!(error = %e, "request task failed");
    }
}

/// Write queued messages until `stop` fires, then flush what is left.
async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut outbox: Outbox,
    framing: Framing,
    mut stop: oneshot::Receiver<()>,
) -> io::Result<()> {
    loop {
        tokio::select! {
            biased;
            message = outbox.recv() => match message {
                Some(message) => write_message(&mut writer, framing, &message).await?,
                None => break,
            },
            _ = &mut stop => {
                for message in outbox.drain() {
                    write_message(&mut writer, framing, &message).await?;
                }
                break;
            }
        }
    }
    writer.flush().await
}

async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    framing: Framing,
    message: &Value,
) -> io::Result<()> {
    let json = message.to_string();
    debug!(response = %json, "sending message");
    writer.write_all(&framing.encode(&json)).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::json::{self, path_to_uri, JsonBackend};
    use serde_json::json;
    use std::path::Path;
    use std::time::Duration;
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    fn server() -> (TreeServer<JsonBackend>, Outbox) {
        let (client, outbox) = Client::channel();
        let server = TreeServer::new(JsonBackend, json::providers(), ServerOptions::default(), client);
        (server, outbox)
    }

    fn write(dir: &Path, name: &str, text: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path_to_uri(&path)
    }

    #[tokio::test]
    async fn test_scenario_traverse_then_edit() {
        let dir = tempfile::tempdir().unwrap();
        let uri = write(dir.path(), "doc1.json", r#"{ "p": ["x", "y"], "q": 1 }"#);
        let (server, mut outbox) = server();
        server.open_document(&uri).await.unwrap();

        let top = server.get_children(&uri, None, 0).await.unwrap();
        assert_eq!(top.len(), 2);
        assert!(top.iter().all(|n| n.children.is_none()));

        let p = server.get_children(&uri, Some(&top[0].id), 0).await.unwrap();
        assert_eq!(p.len(), 2);

        let deeper = server.get_children(&uri, None, 1).await.unwrap();
        assert_eq!(deeper[0].children.as_ref().map(Vec::len), Some(2));
        assert_eq!(deeper[1].children, Some(Vec::new()));

        let edited = server.do_command(&uri, "/p/0", "delete").await.unwrap();
        assert_eq!(edited.document_uri, uri);
        assert_eq!(outbox.drain().len(), 1);

        server.undo_edits(&uri, 1).await.unwrap();
        assert_eq!(outbox.drain().len(), 1);
        assert_eq!(server.get_children(&uri, Some("/p"), 0).await.unwrap(), p);

        let err = server.undo_edits(&uri, 1).await.unwrap_err();
        assert!(matches!(err, TspError::NothingToUndo { .. }));
        assert!(outbox.drain().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_stale_requests() {
        let dir = tempfile::tempdir().unwrap();
        let uri = write(dir.path(), "doc.json", r#"{ "flag": true }"#);
        let (server, _outbox) = server();

        assert!(matches!(
            server.get_children(&uri, None, 0).await,
            Err(TspError::DocumentNotFound { .. })
        ));
        server.open_document(&uri).await.unwrap();
        assert!(matches!(
            server.get_command_menu(&uri, "/nope").await,
            Err(TspError::NodeNotFound { .. })
        ));
        assert!(matches!(
            server.do_command(&uri, "/flag", "move-up").await,
            Err(TspError::CommandFailed {
                reason: FailureReason::UnknownCommand,
                ..
            })
        ));
        assert!(matches!(
            server.undo_edits(&uri, 0).await,
            Err(TspError::InvalidParams(_))
        ));

        server.close_document(&uri).await.unwrap();
        assert!(matches!(
            server.document_info(&uri).await,
            Err(TspError::DocumentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_ids_never_issued_do_not_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.json", r#"{ "x": 1 }"#);
        let b = write(dir.path(), "b.json", r#"{ "secret": true, "y": false }"#);
        let (server, mut outbox) = server();
        server.open_document(&a).await.unwrap();
        server.open_document(&b).await.unwrap();

        let issued = server.get_children(&a, None, 0).await.unwrap();
        assert_eq!(issued[0].id, "/x");

        for id in ["@0", "@1", "@2", "@3", "@4"] {
            assert!(
                matches!(
                    server.get_children(&b, Some(id), 0).await,
                    Err(TspError::NodeNotFound { .. })
                ),
                "{id}"
            );
            assert!(matches!(
                server.do_command(&b, id, "toggle").await,
                Err(TspError::NodeNotFound { .. })
            ));
        }
        assert!(outbox.drain().is_empty());
        assert!(!server.document_info(&b).await.unwrap().dirty);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_documents_are_locked_independently() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.json", r#"{ "x": 1 }"#);
        let b = write(dir.path(), "b.json", r#"{ "y": 2 }"#);
        let (server, _outbox) = server();
        let server = Arc::new(server);
        server.open_document(&a).await.unwrap();
        server.open_document(&b).await.unwrap();

        let held = server.registry().lock(&a).await.unwrap();
        let other = tokio::time::timeout(Duration::from_secs(5), server.get_children(&b, None, 0))
            .await
            .expect("other document waited on a foreign lock")
            .unwrap();
        assert_eq!(other[0].id, "/y");
        assert!(
            tokio::time::timeout(Duration::from_millis(100), server.get_children(&a, None, 0))
                .await
                .is_err()
        );

        // A request queued behind the lock sees the close that overtook it.
        let waiter = {
            let server = Arc::clone(&server);
            let a = a.clone();
            tokio::spawn(async move { server.get_children(&a, None, 0).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let closer = {
            let server = Arc::clone(&server);
            let a = a.clone();
            tokio::spawn(async move { server.close_document(&a).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);

        assert!(matches!(
            waiter.await.unwrap(),
            Err(TspError::DocumentNotFound { .. })
        ));
        closer.await.unwrap().unwrap();
        assert!(server.get_children(&b, None, 0).await.is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_is_bounded_by_node_limit() {
        let dir = tempfile::tempdir().unwrap();
        let uri = write(
            dir.path(),
            "loop.json",
            r#"{ "a": { "$ref": "loop.json" }, "b": { "$ref": "loop.json" } }"#,
        );
        let (client, _outbox) = Client::channel();
        let options = ServerOptions {
            max_nodes: 200,
            ..ServerOptions::default()
        };
        let server = TreeServer::new(JsonBackend, json::providers(), options, client);
        server.open_document(&uri).await.unwrap();

        fn count(nodes: &[TreeNode]) -> usize {
            nodes
                .iter()
                .map(|n| 1 + n.children.as_deref().map_or(0, count))
                .sum()
        }
        let nodes = server.get_children(&uri, None, 64).await.unwrap();
        let total = count(&nodes);
        assert!((200..=200 + 2 * 65).contains(&total), "{total}");
    }

    #[tokio::test]
    async fn test_depth_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let uri = write(dir.path(), "deep.json", r#"{ "a": { "b": { "c": {} } } }"#);
        let (client, _outbox) = Client::channel();
        let options = ServerOptions {
            max_depth: 1,
            ..ServerOptions::default()
        };
        let server = TreeServer::new(JsonBackend, json::providers(), options, client);
        server.open_document(&uri).await.unwrap();

        let nodes = server.get_children(&uri, None, 10).await.unwrap();
        let b = &nodes[0].children.as_ref().unwrap()[0];
        assert_eq!(b.id, "/a/b");
        assert!(b.children.is_none());
    }

    #[tokio::test]
    async fn test_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let uri = write(dir.path(), "doc.json", r#"{ "flag": true }"#);
        let (server, _outbox) = server();

        let init = server.handle(INITIALIZE, json!({})).await.unwrap();
        assert_eq!(init["serverInfo"]["name"], "tsp-server");
        assert_eq!(init["capabilities"]["commands"], true);

        server
            .handle(OPEN_DOCUMENT, json!({ "documentUri": uri }))
            .await
            .unwrap();
        let menu = server
            .handle(GET_COMMAND_MENU, json!({ "documentUri": uri, "treeNodeId": "/flag" }))
            .await
            .unwrap();
        assert_eq!(menu["label"]["text"], "flag: true");

        let info = server
            .handle(GET_DOCUMENT_INFO, json!({ "documentUri": uri }))
            .await
            .unwrap();
        assert_eq!(info["dirty"], false);
        assert_eq!(info["undoCount"], 0);

        assert!(matches!(
            server.handle("tree/bogus", Value::Null).await,
            Err(TspError::MethodNotFound(_))
        ));
        assert!(matches!(
            server.handle(DO_COMMAND, json!({ "documentUri": uri })).await,
            Err(TspError::InvalidParams(_))
        ));
    }

    // ─── Connection ─────────────────────────────────────────────

    struct Peer {
        framing: Framing,
        frames: FrameReader<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl Peer {
        async fn send(&mut self, message: Value) {
            let bytes = self.framing.encode(&message.to_string());
            self.writer.write_all(&bytes).await.unwrap();
        }

        async fn send_raw(&mut self, body: &str) {
            let bytes = self.framing.encode(body);
            self.writer.write_all(&bytes).await.unwrap();
        }

        async fn next(&mut self) -> Value {
            let frame = self.frames.next_frame().await.unwrap().unwrap();
            serde_json::from_str(&frame).unwrap()
        }

        async fn call(&mut self, id: u64, method: &str, params: Value) -> Value {
            self.send(json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
                .await;
            self.next().await
        }
    }

    fn connect(framing: Framing) -> (Peer, tokio::task::JoinHandle<io::Result<()>>) {
        let (client, outbox) = Client::channel();
        let options = ServerOptions {
            framing,
            ..ServerOptions::default()
        };
        let server = Arc::new(TreeServer::new(JsonBackend, json::providers(), options, client));

        let (ours, theirs) = tokio::io::duplex(64 * 1024);
        let (server_reader, server_writer) = tokio::io::split(theirs);
        let handle = tokio::spawn(server.serve(server_reader, server_writer, outbox));

        let (reader, writer) = tokio::io::split(ours);
        let peer = Peer {
            framing,
            frames: FrameReader::new(BufReader::new(reader), framing),
            writer,
        };
        (peer, handle)
    }

    #[tokio::test]
    async fn test_serve_content_length_session() {
        let dir = tempfile::tempdir().unwrap();
        let uri = write(dir.path(), "doc.json", r#"{ "flag": false, "list": [1] }"#);
        let (mut peer, handle) = connect(Framing::ContentLength);

        let init = peer.call(1, INITIALIZE, json!({})).await;
        assert_eq!(init["id"], 1);
        assert_eq!(init["result"]["capabilities"]["undoRedo"], true);

        let opened = peer.call(2, OPEN_DOCUMENT, json!({ "documentUri": uri })).await;
        assert_eq!(opened["result"], Value::Null);
        assert!(opened.get("error").is_none());

        let nodes = peer
            .call(3, GET_CHILDREN, json!({ "documentUri": uri, "depth": 1 }))
            .await;
        assert_eq!(nodes["result"][0]["label"]["text"], "flag: false");
        assert_eq!(nodes["result"][1]["children"][0]["id"], "/list/0");

        peer.send(json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": DO_COMMAND,
            "params": { "documentUri": uri, "treeNodeId": "/flag", "commandId": "toggle" }
        }))
        .await;
        let notification = peer.next().await;
        assert_eq!(notification["method"], DOCUMENT_EDITED);
        assert_eq!(notification["params"]["documentUri"], uri.as_str());
        assert!(notification.get("id").is_none());
        let response = peer.next().await;
        assert_eq!(response["id"], 4);
        assert_eq!(response["result"]["documentUri"], uri.as_str());

        let undone = peer.call(5, UNDO_EDITS, json!({ "documentUri": uri, "count": 2 })).await;
        assert_eq!(undone["error"]["code"], codes::NOTHING_TO_UNDO);
        assert_eq!(undone["error"]["data"]["kind"], "nothingToUndo");

        let missing = peer
            .call(6, GET_CHILDREN, json!({ "documentUri": "file:///nowhere.json" }))
            .await;
        assert_eq!(missing["error"]["code"], codes::DOCUMENT_NOT_FOUND);

        let unknown = peer.call(7, "tree/bogus", json!({})).await;
        assert_eq!(unknown["error"]["code"], codes::METHOD_NOT_FOUND);

        peer.send(json!({ "jsonrpc": "2.0", "method": EXIT })).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_serve_newline_framing_and_parse_errors() {
        let (mut peer, handle) = connect(Framing::Newline);

        peer.send_raw("{ not json").await;
        let error = peer.next().await;
        assert_eq!(error["id"], Value::Null);
        assert_eq!(error["error"]["code"], codes::PARSE_ERROR);

        // The connection survives a bad message.
        let pong = peer.call(1, PING, Value::Null).await;
        assert_eq!(pong["result"], json!({}));

        // Notifications other than exit get no reply.
        peer.send(json!({ "jsonrpc": "2.0", "method": "window/focus" })).await;
        let shutdown = peer.call(2, SHUTDOWN, Value::Null).await;
        assert_eq!(shutdown["id"], 2);

        peer.send(json!({ "jsonrpc": "2.0", "method": EXIT })).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_serve_stops_at_end_of_input() {
        let (peer, handle) = connect(Framing::ContentLength);
        drop(peer);
        handle.await.unwrap().unwrap();
    }
}
