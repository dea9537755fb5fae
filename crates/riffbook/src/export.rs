//! CSV export and printable reports.
//!
//! Every report starts from the same row derivation: one [`ReportRow`] per
//! recorded value, with plan, technique and metric resolved to display
//! names through the plans and the catalog.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::catalog;
use crate::error::{Error, Result};
use crate::model::UserData;
use crate::stats::{format_with_unit, series_for, SeriesPoint};

/// Plan name shown for entries whose plan no longer exists.
pub const UNKNOWN_PLAN: &str = "Unknown Plan";

/// CSV header line.
pub const CSV_HEADER: &str = "date,plan_name,technique_name,metric_name,value,unit";

/// Title of the printable statistics table.
pub const TABLE_TITLE: &str = "All Recorded Statistics";

/// Title of the printable graph set.
pub const GRAPHS_TITLE: &str = "All Technique Progress Graphs";

const BAR_WIDTH: usize = 40;

/// One recorded value, resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Day the value was logged.
    pub date: NaiveDate,
    /// Plan name, or [`UNKNOWN_PLAN`].
    pub plan_name: String,
    /// Technique display name.
    pub technique_name: String,
    /// Metric display label.
    pub metric_label: String,
    /// The logged value.
    pub value: f64,
    /// Unit suffix, possibly empty.
    pub unit: String,
    /// False when the technique/metric pair is not in the catalog.
    #[serde(skip)]
    pub resolved: bool,
}

/// Derive one row per recorded value, in stored entry order.
///
/// Values whose pair is not in the catalog are kept, named by their
/// `{technique}_{metric}` key with label `value` and no unit.
#[must_use]
pub fn to_csv_rows(data: &UserData) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    for entry in &data.progress {
        let plan_name = data
            .plan(&entry.plan_id)
            .map_or(UNKNOWN_PLAN, |p| p.plan_name.as_str());

        for (tech_id, metric_id, value) in entry.metrics.iter() {
            let (technique_name, metric_label, unit, resolved) =
                match catalog::metric(tech_id, metric_id) {
                    Some((tech, metric)) => (
                        tech.name.to_string(),
                        metric.label.to_string(),
                        metric.unit.to_string(),
                        true,
                    ),
                    None => (
                        format!("{tech_id}_{metric_id}"),
                        "value".to_string(),
                        String::new(),
                        false,
                    ),
                };
            rows.push(ReportRow {
                date: entry.date,
                plan_name: plan_name.to_string(),
                technique_name,
                metric_label,
                value,
                unit,
                resolved,
            });
        }
    }
    rows
}

/// Quote a CSV field if it contains a quote, comma, space, or line break.
#[must_use]
pub fn csv_escape(field: &str) -> String {
    if field.contains(['"', ',', ' ', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render rows as CSV text with a header line.
#[must_use]
pub fn render_csv(rows: &[ReportRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CSV_HEADER.to_string());
    for row in rows {
        let fields = [
            row.date.to_string(),
            row.plan_name.clone(),
            row.technique_name.clone(),
            row.metric_label.clone(),
            row.value.to_string(),
            row.unit.clone(),
        ];
        lines.push(
            fields
                .iter()
                .map(|f| csv_escape(f))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}

/// Export file name for a user on a date.
#[must_use]
pub fn export_file_name(label: &str, date: NaiveDate) -> String {
    format!("guitar_tracker_export_{label}_{}.csv", date.format("%Y-%m-%d"))
}

/// Write the user's CSV export into `dir`.
///
/// Returns the path of the written file.
///
/// # Errors
///
/// Returns `NoDataToExport` if nothing is recorded, or an I/O error if the
/// directory or file cannot be written.
pub fn write_csv(dir: &Path, label: &str, date: NaiveDate, data: &UserData) -> Result<PathBuf> {
    if data.progress.is_empty() {
        return Err(Error::NoDataToExport);
    }

    fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })?;

    let rows = to_csv_rows(data);
    let path = dir.join(export_file_name(label, date));
    fs::write(&path, render_csv(&rows))?;

    info!(path = %path.display(), rows = rows.len(), "CSV export written");
    Ok(path)
}

/// A titled table of resolved rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintableTable {
    /// Report title.
    pub title: String,
    /// Resolved rows in stored entry order.
    pub rows: Vec<ReportRow>,
}

impl PrintableTable {
    /// Render as an aligned text table.
    #[must_use]
    pub fn render(&self) -> String {
        let header = ["Date", "Plan", "Technique", "Metric", "Value"];
        let cells: Vec<[String; 5]> = self
            .rows
            .iter()
            .map(|r| {
                [
                    r.date.to_string(),
                    r.plan_name.clone(),
                    r.technique_name.clone(),
                    r.metric_label.clone(),
                    format_with_unit(r.value, &r.unit),
                ]
            })
            .collect();

        let mut widths = header.map(str::len);
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out);
        push_row(&mut out, &header.map(String::from), &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", rule.join("  "));
        for row in &cells {
            push_row(&mut out, row, &widths);
        }
        out
    }
}

fn push_row(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", padded.join("  ").trim_end());
}

/// Build the statistics table. Rows without a catalog match are left out.
///
/// # Errors
///
/// Returns `NoDataToExport` if nothing is recorded.
pub fn to_printable_table(data: &UserData) -> Result<PrintableTable> {
    if data.progress.is_empty() {
        return Err(Error::NoDataToExport);
    }
    Ok(PrintableTable {
        title: TABLE_TITLE.to_string(),
        rows: to_csv_rows(data).into_iter().filter(|r| r.resolved).collect(),
    })
}

/// One chart: the series of a catalog metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSeries {
    /// Technique display name.
    pub technique_name: String,
    /// Metric display label.
    pub metric_label: String,
    /// Unit suffix, possibly empty.
    pub unit: String,
    /// Points in date order; never empty.
    pub points: Vec<SeriesPoint>,
}

impl GraphSeries {
    /// Render as a horizontal bar chart, one bar per point.
    #[must_use]
    pub fn render(&self) -> String {
        let max = self.points.iter().map(|p| p.value).fold(0.0_f64, f64::max);
        let mut out = String::new();
        let _ = writeln!(out, "{} - {}", self.technique_name, self.metric_label);
        for point in &self.points {
            let _ = writeln!(
                out,
                "  {} | {:<BAR_WIDTH$} {}",
                point.date,
                "#".repeat(bar_length(point.value, max)),
                format_with_unit(point.value, &self.unit)
            );
        }
        out
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn bar_length(value: f64, max: f64) -> usize {
    if max <= 0.0 || value <= 0.0 {
        return 0;
    }
    ((value / max) * BAR_WIDTH as f64).round() as usize
}

/// A titled set of charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSet {
    /// Report title.
    pub title: String,
    /// One chart per catalog metric with data.
    pub graphs: Vec<GraphSeries>,
}

impl GraphSet {
    /// Render every chart under the title.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        for graph in &self.graphs {
            let _ = writeln!(out);
            out.push_str(&graph.render());
        }
        out
    }
}

/// Build one chart per catalog metric that has data, in catalog order.
///
/// # Errors
///
/// Returns `NoDataToExport` if nothing is recorded.
pub fn to_printable_graph_set(data: &UserData) -> Result<GraphSet> {
    if data.progress.is_empty() {
        return Err(Error::NoDataToExport);
    }
    let graphs = catalog::metric_pairs()
        .filter_map(|(tech, metric)| {
            let points = series_for(&data.progress, tech.id, metric.id);
            (!points.is_empty()).then(|| GraphSeries {
                technique_name: tech.name.to_string(),
                metric_label: metric.label.to_string(),
                unit: metric.unit.to_string(),
                points,
            })
        })
        .collect();
    Ok(GraphSet {
        title: GRAPHS_TITLE.to_string(),
        graphs,
    })
}
