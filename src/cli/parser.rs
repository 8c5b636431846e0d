//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::storage::DEFAULT_DB_PATH;

/// Default directory holding `<id>.json` documents.
pub const DEFAULT_DOCS_DIR: &str = "documents";

/// Pressroom: multi-agent editorial analysis of news articles.
///
/// A dispatch editor picks specialist analysts for an article, protocol
/// rules add the ones its content demands, the analysts run concurrently,
/// and an editor writes the final verdict.
#[derive(Parser, Debug)]
#[command(name = "pressroom")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the analysis database file.
    ///
    /// Defaults to `.pressroom/analyses.db` in the current directory.
    #[arg(short, long, env = "PRESSROOM_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Database path, falling back to the default location.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a document with the agent desk.
    ///
    /// Fetches `<docs-dir>/<id>.json`, runs dispatch, the selected agents
    /// and the editor, prints the analysis and stores it.
    #[command(after_help = r#"Examples:
  pressroom analyze housing-fund-2024                   # Analyze documents/housing-fund-2024.json
  pressroom analyze fund --docs-dir ./articles          # Custom document directory
  pressroom analyze fund --no-search --no-persist       # Offline dry run
  pressroom --format json analyze fund | jq '.final_verdict'
"#)]
    Analyze(AnalyzeArgs),

    /// List the agent catalog.
    Agents,

    /// List stored analyses, newest first.
    History {
        /// Maximum number of analyses to list.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show a stored analysis.
    Show {
        /// Analysis id as printed by `history`.
        id: i64,
    },

    /// Write the default prompt templates for editing.
    ///
    /// Existing files are left untouched.
    InitPrompts {
        /// Target directory (defaults to `~/.config/pressroom/prompts`).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// Arguments of the `analyze` command.
#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Document identifier.
    pub id: String,

    /// Directory containing `<id>.json` documents.
    #[arg(long, env = "PRESSROOM_DOCS_DIR", default_value = DEFAULT_DOCS_DIR)]
    pub docs_dir: PathBuf,

    /// Do not store the analysis.
    #[arg(long)]
    pub no_persist: bool,

    /// Disable web search for tool-using agents.
    #[arg(long)]
    pub no_search: bool,

    /// Model for the dispatch manager.
    #[arg(long)]
    pub dispatch_model: Option<String>,

    /// Model for specialist agents.
    #[arg(long)]
    pub agent_model: Option<String>,

    /// Model for vision agents.
    #[arg(long)]
    pub vision_model: Option<String>,

    /// Model for the editor.
    #[arg(long)]
    pub editor_model: Option<String>,

    /// Maximum concurrently running agents.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-call timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Search rounds per tool-using agent (1 or 2).
    #[arg(long)]
    pub max_tool_rounds: Option<usize>,

    /// Directory containing prompt template files.
    #[arg(long)]
    pub prompt_dir: Option<PathBuf>,
}
