//! CLI module for Pensum.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Pensum - Course Materials Assistant
///
/// Index course documents and ask questions about them. The assistant
/// searches the materials with tools before it answers.
#[derive(Parser, Debug)]
#[command(name = "pensum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Index every course document in a folder
    Ingest {
        /// Folder with course documents (defaults to general.docs_dir)
        dir: Option<String>,

        /// Remove all indexed courses first
        #[arg(long)]
        clear: bool,
    },

    /// Ask a question about the course materials
    Ask {
        /// The question to ask
        question: String,

        /// Maximum number of tool rounds before the assistant must answer
        #[arg(short, long)]
        rounds: Option<usize>,
    },

    /// Start an interactive chat session
    Chat {
        /// Maximum number of tool rounds per question
        #[arg(short, long)]
        rounds: Option<usize>,
    },

    /// Search course content without asking the model
    Search {
        /// Search query
        query: String,

        /// Restrict to a course (partial names work)
        #[arg(long)]
        course: Option<String>,

        /// Restrict to a lesson number
        #[arg(short, long)]
        lesson: Option<u32>,
    },

    /// Show a course's lessons
    Outline {
        /// Course title (partial names work)
        course: String,
    },

    /// List indexed courses
    Courses,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "assistant.max_rounds")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
