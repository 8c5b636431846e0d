//! Output formatting for CLI commands.
//!
//! Every command renders either human-readable text or JSON. `ndjson`
//! prints one compact JSON object per line for list outputs.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::catalog::AgentSpec;
use crate::agent::report::{AgentStatus, Analysis};
use crate::storage::AnalysisSummary;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// Newline-delimited compact JSON.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name, defaulting to text for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes a value according to the format.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let rendered = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        let mut out = rendered.unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
        out.push('\n');
        out
    }
}

/// Renders the agent catalog.
#[must_use]
pub fn format_catalog(catalog: &[AgentSpec], format: OutputFormat) -> String {
    let rows: Vec<_> = catalog
        .iter()
        .map(|spec| {
            serde_json::json!({
                "name": spec.name,
                "icon": spec.icon,
                "capability": spec.capability,
                "role": spec.role.as_str(),
                "description": spec.description,
            })
        })
        .collect();

    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for spec in catalog {
                let _ = writeln!(
                    out,
                    "{icon}  {name:<20} {capability:<11} {role:<18} {description}",
                    icon = spec.icon,
                    name = spec.name,
                    capability = spec.capability.as_str(),
                    role = spec.role.as_str(),
                    description = spec.description,
                );
            }
            out
        }
        OutputFormat::Json => format.to_json(&rows),
        OutputFormat::Ndjson => rows.iter().map(|row| format.to_json(row)).collect(),
    }
}

/// Renders a finished analysis.
#[must_use]
pub fn format_analysis(analysis: &Analysis, stored_id: Option<i64>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json | OutputFormat::Ndjson => {
            let mut value = serde_json::to_value(analysis).unwrap_or_default();
            if let (Some(id), Some(obj)) = (stored_id, value.as_object_mut()) {
                obj.insert("id".to_string(), id.into());
            }
            format.to_json(&value)
        }
        OutputFormat::Text => format_analysis_text(analysis, stored_id),
    }
}

fn format_analysis_text(analysis: &Analysis, stored_id: Option<i64>) -> String {
    let mut out = format!("# {}\n", analysis.title);
    if !analysis.source_url.is_empty() {
        let _ = writeln!(out, "{}", analysis.source_url);
    }
    if let Some(id) = stored_id {
        let _ = writeln!(out, "Analysis #{id}");
    }

    let roster: Vec<&str> = analysis.final_roster.iter().map(String::as_str).collect();
    let _ = writeln!(out, "\nRoster: {}", roster.join(", "));
    if !analysis.rationale.is_empty() {
        let _ = writeln!(out, "Dispatch: {}", analysis.rationale);
    }
    for o in &analysis.overrides {
        let _ = writeln!(out, "  + {}: {}", o.agent_name, o.trigger_reason);
    }
    for e in &analysis.exclusions {
        let _ = writeln!(out, "  - {}: {}", e.agent_name, e.reason);
    }

    for report in &analysis.reports {
        let _ = write!(
            out,
            "\n## {} {} [{}]\n\n{}\n",
            report.icon, report.agent_name, report.status, report.content
        );
        if report.status == AgentStatus::Failed
            && let Some(error) = &report.error
        {
            let _ = writeln!(out, "\n> {error}");
        }
    }

    let _ = write!(out, "\n## Verdict\n\n{}\n", analysis.final_verdict);

    let _ = write!(
        out,
        "\n---\nAgents: {} completed, {} failed | Tokens: {} | Time: {:.1}s\n",
        analysis.agents_completed,
        analysis.agents_failed,
        analysis.total_tokens,
        std::time::Duration::from_millis(analysis.elapsed_ms).as_secs_f64(),
    );
    let failed: Vec<&str> = analysis
        .failed_reports()
        .map(|r| r.agent_name.as_str())
        .collect();
    if !failed.is_empty() {
        let _ = writeln!(out, "Failed: {}", failed.join(", "));
    }
    out
}

/// Renders the analysis history.
#[must_use]
pub fn format_history(summaries: &[AnalysisSummary], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if summaries.is_empty() {
                return "No analyses stored.\n".to_string();
            }
            let mut out = String::new();
            for s in summaries {
                let _ = writeln!(
                    out,
                    "{id:>5}  {created}  {ok}/{total} ok  {doc:<24} {title}",
                    id = s.id,
                    created = s.created_at.format("%Y-%m-%d %H:%M"),
                    ok = s.agents_completed,
                    total = s.agents_completed + s.agents_failed,
                    doc = s.document_id,
                    title = s.title,
                );
            }
            out
        }
        OutputFormat::Json => format.to_json(summaries),
        OutputFormat::Ndjson => summaries.iter().map(|s| format.to_json(s)).collect(),
    }
}
