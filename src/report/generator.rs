//! Dashboard rendering.
//!
//! This module turns a `DashboardState` into terminal text, Markdown, or a
//! JSON snapshot. All renderers follow the same precedence: a pending fetch
//! shows the loading line, otherwise a status message replaces the charts and
//! table, otherwise the full dashboard is drawn.

use crate::analysis::{bar_chart, pie_chart, Aggregates, ChartData, FrequencyTable};
use crate::cli::OutputFormat;
use crate::dashboard::DashboardState;
use crate::models::{RowKey, SearchQuery, TableRow};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

const TITLE: &str = "Data Visualization Dashboard";
const LOADING: &str = "Loading dynamic data...";
const MAX_CELL_WIDTH: usize = 28;

/// Options shared by the renderers.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Width of the longest bar in the text bar chart.
    pub chart_width: usize,
    pub show_charts: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            chart_width: 40,
            show_charts: true,
        }
    }
}

/// Where and how the dashboard is rendered.
#[derive(Debug, Clone, Default)]
pub struct ViewTarget {
    pub format: OutputFormat,
    pub options: RenderOptions,
    /// Stdout when unset.
    pub output: Option<PathBuf>,
}

impl ViewTarget {
    /// Render the state and write it out, replacing any previous file contents.
    pub fn emit(&self, state: &DashboardState) -> Result<()> {
        let content = render(state, self.format, &self.options)?;

        match self.output {
            Some(ref path) => std::fs::write(path, &content)
                .with_context(|| format!("Failed to write dashboard to {}", path.display())),
            None => {
                println!("{}", content);
                Ok(())
            }
        }
    }
}

/// Render the dashboard in the requested format.
pub fn render(state: &DashboardState, format: OutputFormat, options: &RenderOptions) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(generate_text_view(state, options)),
        OutputFormat::Markdown => Ok(generate_markdown_view(state, options)),
        OutputFormat::Json => generate_json_snapshot(state, options),
    }
}

/// What the body of the view should show.
enum ViewBody {
    Loading,
    Message(String),
    Dashboard,
}

fn view_body(state: &DashboardState) -> ViewBody {
    if state.is_loading() {
        ViewBody::Loading
    } else if let Some(message) = state.message() {
        ViewBody::Message(message.to_string())
    } else {
        ViewBody::Dashboard
    }
}

fn search_line(query: &SearchQuery) -> String {
    format!(
        "Search: [{}] \"{}\"",
        query.field.label(),
        query.term.trim()
    )
}

/// Generate the terminal text view.
pub fn generate_text_view(state: &DashboardState, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", TITLE));
    output.push_str(&format!("{}\n", "=".repeat(TITLE.len())));
    output.push_str(&format!("{}\n\n", search_line(state.form())));

    match view_body(state) {
        ViewBody::Loading => output.push_str(&format!("{}\n", LOADING)),
        ViewBody::Message(message) => output.push_str(&format!("⚠️  {}\n", message)),
        ViewBody::Dashboard => {
            if options.show_charts {
                let aggregates = state.aggregate();
                output.push_str(&generate_text_bar_chart(
                    &aggregates.by_sector,
                    options.chart_width,
                ));
                output.push_str(&generate_text_pie_legend(&aggregates.by_region));
            }
            output.push_str(&generate_text_table(&state.rows()));
        }
    }

    output
}

/// Horizontal bars scaled so the largest count spans `width` columns.
fn generate_text_bar_chart(by_sector: &FrequencyTable, width: usize) -> String {
    let mut section = String::from("Sector Breakdown\n");

    if by_sector.is_empty() {
        section.push_str("  (no sector data)\n\n");
        return section;
    }

    let chart = bar_chart(by_sector);
    let label_width = chart
        .labels
        .iter()
        .map(|l| l.chars().count().min(MAX_CELL_WIDTH))
        .max()
        .unwrap_or(0);
    let max = by_sector.max_count().max(1);

    for (label, count) in chart.labels.iter().zip(&chart.data) {
        let bar_len = ((count * width) as f64 / max as f64).ceil() as usize;
        section.push_str(&format!(
            "  {} {} {}\n",
            pad(&fit(label, MAX_CELL_WIDTH), label_width),
            "█".repeat(bar_len.max(1)),
            count
        ));
    }
    section.push('\n');

    section
}

/// Region counts with share and slice colour.
fn generate_text_pie_legend(by_region: &FrequencyTable) -> String {
    let mut section = String::from("Regional Distribution\n");

    if by_region.is_empty() {
        section.push_str("  (no region data)\n\n");
        return section;
    }

    let chart = pie_chart(by_region);
    let total = by_region.total();
    let label_width = chart
        .labels
        .iter()
        .map(|l| l.chars().count().min(MAX_CELL_WIDTH))
        .max()
        .unwrap_or(0);

    for ((label, count), color) in chart.labels.iter().zip(&chart.data).zip(&chart.colors) {
        section.push_str(&format!(
            "  {} {:>3} ({:>5.1}%) {}\n",
            pad(&fit(label, MAX_CELL_WIDTH), label_width),
            count,
            share(*count, total),
            color
        ));
    }
    section.push('\n');

    section
}

fn generate_text_table(rows: &[TableRow]) -> String {
    let mut section = format!("Latest Records ({})\n", rows.len());

    let header = [
        "ID",
        "Sector",
        "Topic",
        "Region",
        "Intensity",
        "PEST",
        "Details",
    ];
    let cells: Vec<[String; 7]> = rows.iter().map(row_cells).collect();

    let mut widths = header.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header_line: Vec<String> = header
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w))
        .collect();
    section.push_str(&format!("  {}\n", header_line.join(" | ")));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    section.push_str(&format!("  {}\n", rule.join("-+-")));

    for (row, row_cells) in rows.iter().zip(&cells) {
        let line: Vec<String> = row_cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad(c, *w))
            .collect();
        section.push_str(&format!("  {}\n", line.join(" | ").trim_end()));

        if let Some(ref details) = row.details {
            if details.is_empty() {
                section.push_str("      (no fields)\n");
            }
            for entry in details {
                section.push_str(&format!(
                    "      {}: {}\n",
                    single_line(&entry.key),
                    single_line(&entry.value)
                ));
            }
        }
    }

    section
}

fn row_cells(row: &TableRow) -> [String; 7] {
    [
        fit(&single_line(&row.id), MAX_CELL_WIDTH),
        fit(&single_line(&row.sector), MAX_CELL_WIDTH),
        fit(&single_line(&row.topics), MAX_CELL_WIDTH),
        fit(&single_line(&row.region), MAX_CELL_WIDTH),
        fit(&single_line(&row.intensity), MAX_CELL_WIDTH),
        fit(&single_line(&row.pest), MAX_CELL_WIDTH),
        toggle_label(row.expanded).to_string(),
    ]
}

fn toggle_label(expanded: bool) -> &'static str {
    if expanded {
        "Hide"
    } else {
        "Show"
    }
}

/// Generate the Markdown view.
pub fn generate_markdown_view(state: &DashboardState, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", TITLE));
    output.push_str(&format!("**{}**\n\n", escape_cell(&search_line(state.form()))));

    match view_body(state) {
        ViewBody::Loading => output.push_str(&format!("*{}*\n", LOADING)),
        ViewBody::Message(message) => output.push_str(&format!("> ⚠️ {}\n", message)),
        ViewBody::Dashboard => {
            if options.show_charts {
                output.push_str(&generate_markdown_charts(&state.aggregate()));
            }
            output.push_str(&generate_markdown_table(&state.rows()));
        }
    }

    output
}

fn generate_markdown_charts(aggregates: &Aggregates) -> String {
    let mut section = String::new();

    section.push_str("## Sector Breakdown\n\n");
    if aggregates.by_sector.is_empty() {
        section.push_str("No sector data.\n\n");
    } else {
        section.push_str("| Sector | Records |\n");
        section.push_str("|:---|:---:|\n");
        for entry in aggregates.by_sector.entries() {
            section.push_str(&format!(
                "| {} | {} |\n",
                escape_cell(&entry.category),
                entry.count
            ));
        }
        section.push('\n');
    }

    section.push_str("## Regional Distribution\n\n");
    if aggregates.by_region.is_empty() {
        section.push_str("No region data.\n\n");
    } else {
        let chart = pie_chart(&aggregates.by_region);
        let total = aggregates.by_region.total();
        section.push_str("| Region | Records | Share | Colour |\n");
        section.push_str("|:---|:---:|:---:|:---:|\n");
        for ((label, count), color) in chart.labels.iter().zip(&chart.data).zip(&chart.colors) {
            section.push_str(&format!(
                "| {} | {} | {:.1}% | `{}` |\n",
                escape_cell(label),
                count,
                share(*count, total),
                color
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_markdown_table(rows: &[TableRow]) -> String {
    let mut section = format!("## Latest Records ({})\n\n", rows.len());

    section.push_str("| ID | Sector | Topic | Region | Intensity | PEST | Details |\n");
    section.push_str("|:---|:---|:---|:---|:---:|:---|:---:|\n");
    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            escape_cell(&row.id),
            escape_cell(&row.sector),
            escape_cell(&row.topics),
            escape_cell(&row.region),
            escape_cell(&row.intensity),
            escape_cell(&row.pest),
            toggle_label(row.expanded)
        ));
    }
    section.push('\n');

    for row in rows {
        if let Some(ref details) = row.details {
            section.push_str(&format!("### Record {}\n\n", row.key));
            if details.is_empty() {
                section.push_str("*No fields.*\n");
            }
            for entry in details {
                section.push_str(&format!(
                    "- **{}:** {}\n",
                    escape_cell(&entry.key),
                    escape_cell(&entry.value)
                ));
            }
            section.push('\n');
        }
    }

    section
}

/// Serializable view of the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub search: SearchQuery,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<RowKey>,
    pub aggregates: Aggregates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts: Option<Charts>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Charts {
    pub sector: ChartData,
    pub region: ChartData,
}

impl DashboardSnapshot {
    pub fn capture(state: &DashboardState, options: &RenderOptions) -> Self {
        let aggregates = state.aggregate();
        let charts = options.show_charts.then(|| Charts {
            sector: bar_chart(&aggregates.by_sector),
            region: pie_chart(&aggregates.by_region),
        });

        Self {
            generated_at: Utc::now(),
            search: state.form().clone(),
            loading: state.is_loading(),
            message: state.message().map(|m| m.to_string()),
            expanded: state.expansion().current().cloned(),
            aggregates,
            charts,
            rows: state.rows(),
        }
    }
}

/// Generate a JSON snapshot.
pub fn generate_json_snapshot(state: &DashboardState, options: &RenderOptions) -> Result<String> {
    let snapshot = DashboardSnapshot::capture(state, options);
    serde_json::to_string_pretty(&snapshot).map_err(Into::into)
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
fn fit(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}

fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

fn escape_cell(text: &str) -> String {
    single_line(text).replace('|', "\\|")
}
