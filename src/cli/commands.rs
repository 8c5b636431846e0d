//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Async work runs on a
//! tokio runtime created per command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::agent::catalog;
use crate::agent::client::create_gateway;
use crate::agent::config::AgentConfig;
use crate::agent::orchestrator::Orchestrator;
use crate::agent::prompt::PromptSet;
use crate::agent::search::{DisabledSearch, DuckDuckGoSearch, SearchCapability};
use crate::cli::output::{OutputFormat, format_analysis, format_catalog, format_history};
use crate::cli::parser::{AnalyzeArgs, Cli, Commands};
use crate::document::DirectorySource;
use crate::error::{CommandError, Result};
use crate::storage::SqliteReportSink;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Analyze(args) => cmd_analyze(&db_path, args, format),
        Commands::Agents => Ok(format_catalog(catalog::catalog(), format)),
        Commands::History { limit } => cmd_history(&db_path, *limit, format),
        Commands::Show { id } => cmd_show(&db_path, *id, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
        })
}

/// Builds agent configuration from env + CLI overrides.
fn build_config(args: &AnalyzeArgs) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder().from_env();
    if let Some(model) = &args.dispatch_model {
        builder = builder.dispatch_model(model);
    }
    if let Some(model) = &args.agent_model {
        builder = builder.agent_model(model);
    }
    if let Some(model) = &args.vision_model {
        builder = builder.vision_model(model);
    }
    if let Some(model) = &args.editor_model {
        builder = builder.editor_model(model);
    }
    if let Some(n) = args.concurrency {
        builder = builder.max_concurrency(n);
    }
    if let Some(secs) = args.timeout {
        builder = builder.call_timeout(Duration::from_secs(secs));
    }
    if let Some(rounds) = args.max_tool_rounds {
        builder = builder.max_tool_rounds(rounds);
    }
    if let Some(dir) = &args.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    Ok(builder.build()?)
}

fn cmd_analyze(db_path: &Path, args: &AnalyzeArgs, format: OutputFormat) -> Result<String> {
    let config = build_config(args)?;
    let gateway = create_gateway(&config)?;
    let search: Arc<dyn SearchCapability> = if args.no_search {
        Arc::new(DisabledSearch)
    } else {
        Arc::new(DuckDuckGoSearch::new(config.call_timeout)?)
    };
    let source = Arc::new(DirectorySource::new(&args.docs_dir));

    let mut orchestrator = Orchestrator::new(gateway, search, source, config);
    if !args.no_persist {
        orchestrator = orchestrator.with_sink(Arc::new(SqliteReportSink::new(db_path)));
    }

    let stored = runtime()?.block_on(orchestrator.analyze_stored(&args.id))?;
    Ok(format_analysis(&stored.analysis, stored.stored_id, format))
}

fn cmd_history(db_path: &Path, limit: usize, format: OutputFormat) -> Result<String> {
    let sink = SqliteReportSink::new(db_path);
    let summaries = runtime()?.block_on(sink.list(limit))?;
    Ok(format_history(&summaries, format))
}

fn cmd_show(db_path: &Path, id: i64, format: OutputFormat) -> Result<String> {
    let sink = SqliteReportSink::new(db_path);
    let analysis = runtime()?.block_on(sink.get(id))?;
    Ok(format_analysis(&analysis, Some(id), format))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str("  ");
                output.push_str(
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown"),
                );
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn run(args: &[&str]) -> Result<String> {
        let cli = Cli::try_parse_from(args).unwrap_or_else(|e| panic!("{e}"));
        execute(&cli)
    }

    #[test]
    fn test_agents_command() {
        let out = run(&["pressroom", "agents"]).unwrap_or_else(|e| panic!("{e}"));
        for spec in catalog::catalog() {
            assert!(out.contains(spec.name));
        }
    }

    #[test]
    fn test_history_on_fresh_database() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let db = dir.path().join("a.db");
        let out = run(&["pressroom", "--db-path", db.to_str().unwrap_or_default(), "history"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out, "No analyses stored.\n");
    }

    #[test]
    fn test_show_missing_analysis() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let db = dir.path().join("a.db");
        let result = run(&["pressroom", "--db-path", db.to_str().unwrap_or_default(), "show", "3"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_init_prompts_writes_templates() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let target = dir.path().join("prompts");
        let out = run(&[
            "pressroom",
            "--format",
            "json",
            "init-prompts",
            "--dir",
            target.to_str().unwrap_or_default(),
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        let json: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(json["count"], catalog::catalog().len() + 2);
        assert!(target.join("dispatch.md").exists());
    }
}
