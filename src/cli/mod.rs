//! CLI module for course-rag.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// course-rag - Course Materials Assistant
///
/// Answers questions about indexed course materials, letting the model search
/// lesson content and course outlines before it responds.
#[derive(Parser, Debug)]
#[command(name = "course-rag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
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
    /// Ask a single question about the course materials
    Ask {
        /// The question to ask
        question: String,
    },

    /// Start an interactive chat session
    Chat,

    /// Index course bundles (*.json) from a directory
    Index {
        /// Directory holding the bundles (defaults to ingest.docs_dir)
        dir: Option<String>,

        /// Remove all indexed courses first
        #[arg(long)]
        clear: bool,
    },

    /// List indexed courses
    Courses,

    /// Show the outline of a course
    Outline {
        /// Course title or partial name
        course: String,
    },

    /// Search course content without asking the model
    Search {
        /// Search query
        query: String,

        /// Restrict to a course (partial names work)
        #[arg(long)]
        course: Option<String>,

        /// Restrict to a lesson number
        #[arg(long)]
        lesson: Option<i64>,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
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

    /// Show configuration file path
    Path,
}
