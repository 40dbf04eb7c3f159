//! CLI command definitions for taskboard.
//!
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Parser, Subcommand};

/// Kanban task boards with drag-and-drop reordering
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (overrides all config tiers)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON HTTP API
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List boards of an owner
    Boards {
        /// Owner (default: board.default_owner from config)
        #[arg(short, long)]
        owner: Option<String>,

        /// Output format: markdown or json
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },

    /// Create a board with the configured default columns
    CreateBoard {
        title: String,

        #[arg(short, long)]
        owner: Option<String>,
    },

    /// Show a board with its columns and tasks
    Show {
        board: String,

        /// Output format: markdown or json
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },

    /// Append a column to a board
    AddColumn { board: String, title: String },

    /// Append a task to a column
    AddTask {
        board: String,
        column: String,
        title: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Drag a column onto another column
    MoveColumn {
        board: String,
        column: String,
        /// Column to drop onto
        over: String,
    },

    /// Drag a task onto another task or a column
    MoveTask {
        board: String,
        task: String,
        /// Task or column to drop onto
        over: String,
    },

    /// Create, list and attach tags
    #[command(subcommand)]
    Tag(TagCommand),
}

#[derive(Subcommand, Debug)]
pub enum TagCommand {
    /// Create a tag
    Create {
        name: String,
        /// Hex color, e.g. #ff8800
        color: String,
    },

    /// List all tags
    List,

    /// Attach a tag to a task
    Attach {
        board: String,
        task: String,
        /// Tag id or name
        tag: String,
    },

    /// Remove a tag from a task
    Detach {
        board: String,
        task: String,
        /// Tag id or name
        tag: String,
    },
}
