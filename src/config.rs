//! Server configuration loaded from `.tsp/config.toml`.
//!
//! Every key is optional. A missing file yields the defaults; a file that
//! fails to parse is reported and ignored.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::rpc::codec::Framing;

/// Default upper bound for `tree/getChildren` depth.
pub const DEFAULT_MAX_DEPTH: u32 = 64;

/// Default number of nodes one `tree/getChildren` snapshot may expand.
pub const DEFAULT_MAX_NODES: usize = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub history: HistorySection,
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Message framing on stdin/stdout.
    pub framing: Framing,
    /// Requests asking for a deeper traversal are clamped to this.
    pub max_depth: u32,
    /// Once a snapshot holds this many nodes, nothing more is expanded.
    pub max_nodes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            framing: Framing::ContentLength,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Maximum number of undoable edits per document; 0 means unbounded.
    pub undo_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load the config at `path`, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config file, using defaults");
                Self::default()
            }
        }
    }

    /// `Ok(None)` when there is no readable file at `path`.
    pub fn try_load(path: &Path) -> Result<Option<Self>, toml::de::Error> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map(Some),
            Err(_) => Ok(None),
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// The undo limit as the command stack expects it.
    pub fn undo_limit(&self) -> Option<usize> {
        match self.history.undo_limit {
            0 => None,
            n => Some(n),
        }
    }
}
