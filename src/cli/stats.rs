//! Stats command implementation

use crate::cli::output::{format_records_json, format_records_table, RecordView};
use crate::cli::{load_config, StatsArgs};
use crate::store::PerformanceStore;

/// Handle `lens stats` command
pub fn handle_stats(args: &StatsArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    let store = PerformanceStore::new(config.persistence.resolve_path());
    render_stats(&store, args.json)
}

/// Render the records in `store`, most used first.
pub fn render_stats(store: &PerformanceStore, json: bool) -> Result<String, Box<dyn std::error::Error>> {
    let mut records = store.load()?;
    records.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| a.backend.cmp(&b.backend))
            .then_with(|| a.task_type.cmp(&b.task_type))
    });
    let views: Vec<RecordView> = records.iter().map(RecordView::from).collect();

    if json {
        return Ok(format_records_json(&store.path().display().to_string(), &views)?);
    }
    if views.is_empty() {
        return Ok(format!(
            "No statistics recorded yet ({})",
            store.path().display()
        ));
    }
    Ok(format_records_table(&views))
}
