//! Output formatting helpers for CLI commands

use crate::pipeline::{AnalysisOutcome, PipelineState, SuggestionKind};
use crate::scoring::PerformanceRecord;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// View model for one persisted statistics row
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordView {
    pub backend: String,
    pub task: String,
    pub requests: u64,
    pub success_rate: f64,
    pub avg_latency_ms: u64,
    pub last_used: String,
}

impl From<&PerformanceRecord> for RecordView {
    fn from(record: &PerformanceRecord) -> Self {
        Self {
            backend: record.backend.clone(),
            task: record.task_type.clone(),
            requests: record.usage_count,
            success_rate: record.success_rate,
            avg_latency_ms: record.avg_response_time_ms.round() as u64,
            last_used: record.last_used.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

fn success_cell(rate: f64) -> String {
    let text = format!("{:.0}%", rate * 100.0);
    if rate >= 0.9 {
        text.green().to_string()
    } else if rate >= 0.5 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

/// Format statistics as a table
pub fn format_records_table(records: &[RecordView]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Backend", "Task", "Requests", "Success", "Latency", "Last Used",
    ]);

    for r in records {
        table.add_row(vec![
            Cell::new(&r.backend),
            Cell::new(&r.task),
            Cell::new(r.requests),
            Cell::new(success_cell(r.success_rate)),
            Cell::new(format!("{}ms", r.avg_latency_ms)),
            Cell::new(&r.last_used),
        ]);
    }

    table.to_string()
}

/// Format statistics as JSON
pub fn format_records_json(path: &str, records: &[RecordView]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "path": path,
        "records": records
    }))
}

/// Get icon for a suggestion kind
pub fn kind_icon(kind: SuggestionKind) -> &'static str {
    match kind {
        SuggestionKind::Error => "✗",
        SuggestionKind::Warning => "!",
        SuggestionKind::Suggestion => "→",
        SuggestionKind::Info => "i",
    }
}

fn kind_label(kind: SuggestionKind) -> String {
    let label = format!("{} {}", kind_icon(kind), kind);
    match kind {
        SuggestionKind::Error => label.red().to_string(),
        SuggestionKind::Warning => label.yellow().to_string(),
        SuggestionKind::Suggestion => label.cyan().to_string(),
        SuggestionKind::Info => label.normal().to_string(),
    }
}

fn state_label(state: PipelineState) -> String {
    match state {
        PipelineState::Completed => "Completed".green().to_string(),
        PipelineState::TimedOut => "Timed out".red().to_string(),
        _ => "Failed".red().to_string(),
    }
}

/// Format an analysis outcome as pretty text
pub fn format_outcome_pretty(outcome: &AnalysisOutcome) -> String {
    let mut lines = vec![
        format!("Status: {}", state_label(outcome.state)),
        format!("Task: {}", outcome.task),
    ];
    if outcome.served_by == outcome.routed_to {
        lines.push(format!("Backend: {}", outcome.served_by));
    } else {
        lines.push(format!(
            "Backend: {} (routed to {})",
            outcome.served_by, outcome.routed_to
        ));
    }
    lines.push(format!("Elapsed: {}ms", outcome.elapsed_ms));
    lines.push(String::new());

    match &outcome.result {
        Ok(result) => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Kind", "Line", "Description", "Confidence"]);
            for s in &result.suggestions {
                table.add_row(vec![
                    Cell::new(kind_label(s.kind)),
                    Cell::new(s.line_number.map(|n| n.to_string()).unwrap_or_default()),
                    Cell::new(&s.description),
                    Cell::new(format!("{:.2}", s.confidence)),
                ]);
            }
            lines.push(table.to_string());

            for s in result.suggestions.iter().filter(|s| s.fixed_code.is_some()) {
                let line = s
                    .line_number
                    .map(|n| format!(" (line {})", n))
                    .unwrap_or_default();
                lines.push(String::new());
                lines.push(format!("Suggested fix{}:", line).bold().to_string());
                lines.push(s.fixed_code.clone().unwrap_or_default());
            }
        }
        Err(e) => lines.push(format!("Error: {}", e.user_message()).red().to_string()),
    }

    lines.join("\n")
}

/// Format an analysis outcome as JSON
pub fn format_outcome_json(outcome: &AnalysisOutcome) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(outcome)
}
