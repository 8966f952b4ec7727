//! Presentation of a calculated store.

mod table;

pub use table::render_table_report;

use crate::model::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    #[default]
    Table,
    Json,
}

pub fn render_report(report: &Report<'_>, format: Format) -> anyhow::Result<String> {
    if report.stale {
        tracing::warn!("rendering stale results: records were tracked after the last calculation");
    }

    match format {
        Format::Table => Ok(render_table_report(report)),
        Format::Json => render_json_report(report),
    }
}

/// Pretty-printed JSON; the stale flag is a field rather than a banner.
pub fn render_json_report(report: &Report<'_>) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    Ok(json)
}
