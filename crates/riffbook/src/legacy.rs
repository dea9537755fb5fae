//! Import of documents in the flat-key format.
//!
//! Older documents store an entry's metrics as a flat map keyed by
//! `{techniqueId}_{metricId}`, e.g. `{"legato_speed": 120}`. Keys are
//! resolved against the catalog; keys the catalog does not know are split
//! at the first underscore.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::catalog;
use crate::error::{Error, Result};
use crate::model::{
    generate_id, parse_date, MetricValues, PartialUpdate, Plan, ProgressEntry, UserData,
};
use crate::tracker::Tracker;

#[derive(Debug, Deserialize)]
struct LegacyDocument {
    #[serde(default)]
    plans: Vec<Plan>,
    #[serde(default)]
    progress: Vec<LegacyEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyEntry {
    #[serde(default)]
    id: Option<String>,
    plan_id: String,
    date: String,
    #[serde(default)]
    metrics: BTreeMap<String, Value>,
}

/// What an import converted and what it dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Plans imported.
    pub plans: usize,
    /// Entries imported.
    pub entries: usize,
    /// Values imported across all entries.
    pub values: usize,
    /// Values that were not numbers, e.g. `null`.
    pub skipped_values: usize,
    /// Entries dropped for repeating a `(plan, date)` or having no values.
    pub skipped_entries: usize,
    /// Technique ids dropped for repeating within a plan.
    pub skipped_techniques: usize,
}

/// Split a flat key into `(technique id, metric id)`.
#[must_use]
pub fn split_composite_key(key: &str) -> (String, String) {
    if let Some((tech, metric)) = catalog::resolve_composite_key(key) {
        return (tech.id.to_string(), metric.id.to_string());
    }
    let (tech, metric) = key.split_once('_').unwrap_or((key, "value"));
    (tech.to_string(), metric.to_string())
}

/// Convert a flat-key JSON document.
///
/// # Errors
///
/// Returns a JSON error if the text is not a document, or `InvalidDate` if
/// an entry's date does not parse.
pub fn convert(json: &str) -> Result<(UserData, ImportSummary)> {
    let document: LegacyDocument = serde_json::from_str(json)?;
    let mut summary = ImportSummary {
        plans: document.plans.len(),
        ..ImportSummary::default()
    };

    let plans: Vec<Plan> = document
        .plans
        .into_iter()
        .map(|plan| {
            let (plan, dropped) = dedup_techniques(plan);
            if dropped > 0 {
                warn!(plan_id = %plan.id, dropped, "Dropping repeated technique ids");
            }
            summary.skipped_techniques += dropped;
            plan
        })
        .collect();

    let mut progress: Vec<ProgressEntry> = Vec::with_capacity(document.progress.len());
    for legacy in document.progress {
        let date = parse_date(&legacy.date)?;
        if progress
            .iter()
            .any(|e| e.plan_id == legacy.plan_id && e.date == date)
        {
            warn!(plan_id = %legacy.plan_id, %date, "Skipping repeated entry");
            summary.skipped_entries += 1;
            continue;
        }

        let mut metrics = MetricValues::new();
        for (key, value) in &legacy.metrics {
            match value.as_f64() {
                Some(v) if v.is_finite() => {
                    let (tech, metric) = split_composite_key(key);
                    metrics.insert(tech, metric, v);
                }
                _ => summary.skipped_values += 1,
            }
        }
        if metrics.is_empty() {
            summary.skipped_entries += 1;
            continue;
        }

        summary.values += metrics.len();
        progress.push(ProgressEntry {
            id: legacy.id.unwrap_or_else(|| generate_id("entry")),
            plan_id: legacy.plan_id,
            date,
            metrics,
        });
    }
    summary.entries = progress.len();

    Ok((
        UserData { plans, progress },
        summary,
    ))
}

/// Keep the first occurrence of each technique id. Returns the number dropped.
fn dedup_techniques(mut plan: Plan) -> (Plan, usize) {
    let ids = std::mem::take(&mut plan.technique_ids);
    let total = ids.len();
    for id in &ids {
        plan.add_technique(id);
    }
    let dropped = total - plan.technique_ids.len();
    (plan, dropped)
}

/// Import a flat-key document file, replacing the user's plans and progress.
///
/// # Errors
///
/// Returns `NoDataToSave` if the file holds no plans and no entries, a
/// conversion error, or `StoreUnavailable` if the write fails.
pub async fn import_file(tracker: &mut Tracker, path: &Path) -> Result<ImportSummary> {
    let json = fs::read_to_string(path)?;
    let (data, summary) = convert(&json)?;
    if data.plans.is_empty() && data.progress.is_empty() {
        return Err(Error::NoDataToSave);
    }

    info!(
        path = %path.display(),
        plans = summary.plans,
        entries = summary.entries,
        "Importing document"
    );
    tracker
        .apply(PartialUpdate::plans(data.plans).with_progress(data.progress))
        .await?;
    Ok(summary)
}
