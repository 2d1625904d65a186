//! TSP server: browse and edit tree-shaped documents over JSON-RPC.
//!
//! Usage:
//!   tsp-server [serve] [--framing content-length|newline] [--undo-limit N]
//!   tsp-server tree <uri> [--depth N]
//!
//! The protocol runs on stdin/stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tsp::cli::{render_tree, Cli, Commands};
use tsp::config::ServerConfig;
use tsp::model::json::{self, JsonBackend};
use tsp::model::ModelBackend;
use tsp::rpc::{Client, TreeServer};
use tsp::tree::Materializer;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = ServerConfig::try_load(&cli.config);
    let config = loaded.as_ref().ok().cloned().flatten().unwrap_or_default();

    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_filter(&config))),
        )
        .init();

    if let Err(e) = &loaded {
        warn!(path = %cli.config.display(), error = %e, "invalid config file, using defaults");
    }

    match cli.command() {
        Commands::Serve { .. } => serve(&cli, &config),
        Commands::Tree { uri, depth } => print_tree(&uri, depth),
    }
}

fn serve(cli: &Cli, config: &ServerConfig) -> Result<()> {
    let options = cli.server_options(config);
    info!(
        framing = %options.framing,
        max_depth = options.max_depth,
        max_nodes = options.max_nodes,
        undo_limit = ?options.undo_limit,
        "TSP server ready, waiting for JSON-RPC on stdin"
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
    runtime.block_on(async {
        let (client, outbox) = Client::channel();
        let server = Arc::new(TreeServer::new(JsonBackend, json::providers(), options, client));
        server
            .serve(tokio::io::stdin(), tokio::io::stdout(), outbox)
            .await
            .context("connection failed")
    })
}

fn print_tree(uri: &str, depth: u32) -> Result<()> {
    let doc = JsonBackend
        .load(uri)
        .with_context(|| format!("failed to load {uri}"))?;
    let providers = json::providers();
    let nodes = Materializer::new(&doc, &providers).children(None, depth)?;
    print!("{}", render_tree(&nodes));
    Ok(())
}
