//! Command line interface for `tsp-server`.
//!
//! Commands:
//! - serve (default): speak the protocol on stdin/stdout
//! - tree: print a document's tree and exit

use clap::{Parser, Subcommand};
use std::fmt::Write;
use std::path::PathBuf;

use crate::config::ServerConfig;
use crate::rpc::{Framing, ServerOptions};
use crate::tree::TreeNode;

#[derive(Parser, Debug)]
#[command(name = "tsp-server")]
#[command(version, about = "Tree Structure Protocol server")]
pub struct Cli {
    /// Config file (default: .tsp/config.toml)
    #[arg(short, long, global = true, default_value = ".tsp/config.toml")]
    pub config: PathBuf,

    /// Log filter, e.g. "debug" or "tsp=trace" (RUST_LOG wins)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Serve the protocol on stdin/stdout
    Serve {
        /// Message framing (overrides the config file)
        #[arg(long, value_enum)]
        framing: Option<Framing>,

        /// Undoable edits kept per document, 0 for unbounded
        #[arg(long)]
        undo_limit: Option<usize>,
    },

    /// Print the tree of a document and exit
    Tree {
        /// File path or file:// URL
        uri: String,

        /// Levels to expand below the top-level nodes
        #[arg(short, long, default_value = "2")]
        depth: u32,
    },
}

impl Cli {
    /// The subcommand, `serve` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve {
            framing: None,
            undo_limit: None,
        })
    }

    /// Log filter from the flag, else from the config file.
    pub fn log_filter(&self, config: &ServerConfig) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config.log.filter.clone())
    }

    /// Server options from the config file with command line overrides.
    pub fn server_options(&self, config: &ServerConfig) -> ServerOptions {
        let mut options = ServerOptions::from(config);
        if let Some(Commands::Serve {
            framing,
            undo_limit,
        }) = &self.command
        {
            if let Some(framing) = framing {
                options.framing = *framing;
            }
            if let Some(limit) = undo_limit {
                options.undo_limit = (*limit > 0).then_some(*limit);
            }
        }
        options
    }
}

/// Indented text rendering of a tree, one node per line.
pub fn render_tree(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    render_level(&mut out, nodes, 0);
    out
}

fn render_level(out: &mut String, nodes: &[TreeNode], indent: usize) {
    for node in nodes {
        let more = match &node.children {
            None => " …",
            Some(_) => "",
        };
        let _ = writeln!(
            out,
            "{:indent$}{}{more}  [{} {}] {}",
            "",
            node.label.text,
            node.kind,
            node.semantic_type,
            node.id,
            indent = indent * 2
        );
        if let Some(children) = &node.children {
            render_level(out, children, indent + 1);
        }
    }
}
