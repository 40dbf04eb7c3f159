//! Configuration types.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default port for the HTTP API.
pub const DEFAULT_PORT: u16 = 31995;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub board: BoardConfig,
}

/// Storage and HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Port the HTTP API listens on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            port: default_port(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("taskboard/boards.db")
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Board defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Owner used when a command or request does not name one.
    #[serde(default = "default_owner")]
    pub default_owner: String,

    /// Columns created with every new board, in order.
    #[serde(default = "default_columns")]
    pub default_columns: Vec<String>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            default_owner: default_owner(),
            default_columns: default_columns(),
        }
    }
}

fn default_owner() -> String {
    "local".to_string()
}

fn default_columns() -> Vec<String> {
    ["To Do", "In Progress", "Done"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Config {
    /// Load a single configuration file without tier merging.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        // An empty or comment-only file parses as null.
        let config: Option<Config> = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config.unwrap_or_default())
    }
}
