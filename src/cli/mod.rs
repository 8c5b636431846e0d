//! CLI layer for pressroom.
//!
//! Provides the command-line interface using clap, with commands for
//! analyzing documents, listing the catalog, and browsing stored analyses.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{AnalyzeArgs, Cli, Commands};
