//! # TSP
//!
//! A Tree Structure Protocol server. Editors browse and edit tree-shaped
//! documents through it without knowing the document's schema.
//!
//! ## Key Features
//!
//! - **Generic**: any model plugs in through [`model::ModelBackend`]
//! - **Lazy**: `tree/getChildren` expands only as deep as asked
//! - **Reversible**: every edit goes through a per-document undo/redo stack
//! - **Concurrent**: requests on different documents never wait on each other
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tsp::model::json::{self, JsonBackend};
//! use tsp::model::ModelBackend;
//! use tsp::tree::Materializer;
//!
//! // Load a JSON, YAML or TOML file and print its top two levels
//! let doc = JsonBackend.load("config.yaml").unwrap();
//! let providers = json::providers();
//! let nodes = Materializer::new(&doc, &providers).children(None, 1).unwrap();
//! print!("{}", tsp::cli::render_tree(&nodes));
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod rpc;
pub mod session;
pub mod tree;

// Re-exports for convenience
pub use error::{BackendError, FailureReason, Result, TspError};

pub use model::json::{JsonBackend, JsonDocument};
pub use model::{Command, ItemProvider, ModelBackend, ModelDocument, ProviderRegistry};
pub use rpc::{Client, Framing, ServerOptions, TreeServer};
pub use session::{CommandStack, DocumentInfo, SessionRegistry};
pub use tree::{Materializer, Menu, MenuItem, TreeNode};
