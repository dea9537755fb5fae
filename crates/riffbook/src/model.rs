//! Core data model for riffbook.
//!
//! A user's whole persisted state is one [`UserData`] document holding their
//! plans and progress entries. Writes are expressed as [`PartialUpdate`]s
//! that replace whole top-level fields.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A named set of techniques practised together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Unique id, generated at creation.
    pub id: String,
    /// Display name.
    pub plan_name: String,
    /// Technique ids in insertion order, without duplicates.
    pub technique_ids: Vec<String>,
}

/// Recorded metric values, keyed by technique id then metric id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricValues(BTreeMap<String, BTreeMap<String, f64>>);

impl MetricValues {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value recorded for a technique metric.
    #[must_use]
    pub fn get(&self, technique_id: &str, metric_id: &str) -> Option<f64> {
        self.0.get(technique_id)?.get(metric_id).copied()
    }

    /// Record a value, replacing any previous one.
    pub fn insert(
        &mut self,
        technique_id: impl Into<String>,
        metric_id: impl Into<String>,
        value: f64,
    ) {
        self.0
            .entry(technique_id.into())
            .or_default()
            .insert(metric_id.into(), value);
    }

    /// Remove a value. Empty technique maps are dropped.
    pub fn remove(&mut self, technique_id: &str, metric_id: &str) -> Option<f64> {
        let metrics = self.0.get_mut(technique_id)?;
        let removed = metrics.remove(metric_id);
        if metrics.is_empty() {
            self.0.remove(technique_id);
        }
        removed
    }

    /// Number of recorded values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    /// True when no value is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }

    /// Iterate `(technique id, metric id, value)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> + '_ {
        self.0.iter().flat_map(|(tech, metrics)| {
            metrics
                .iter()
                .map(move |(metric, value)| (tech.as_str(), metric.as_str(), *value))
        })
    }
}

impl FromIterator<(String, String, f64)> for MetricValues {
    fn from_iter<I: IntoIterator<Item = (String, String, f64)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (tech, metric, value) in iter {
            values.insert(tech, metric, value);
        }
        values
    }
}

/// One day's recorded values for one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    /// Unique id, generated at creation.
    pub id: String,
    /// The plan the values were logged against.
    pub plan_id: String,
    /// Calendar date; at most one entry per `(plan_id, date)`.
    pub date: NaiveDate,
    /// Never empty once persisted.
    pub metrics: MetricValues,
}

impl ProgressEntry {
    /// Create an entry with a generated id.
    #[must_use]
    pub fn new(plan_id: impl Into<String>, date: NaiveDate, metrics: MetricValues) -> Self {
        Self {
            id: generate_id("entry"),
            plan_id: plan_id.into(),
            date,
            metrics,
        }
    }
}

/// A user's complete persisted state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserData {
    /// The user's plans.
    pub plans: Vec<Plan>,
    /// The user's progress entries.
    pub progress: Vec<ProgressEntry>,
}

impl UserData {
    /// Look up a plan by id.
    #[must_use]
    pub fn plan(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    /// Look up the entry logged for a plan on a date.
    #[must_use]
    pub fn entry_for(&self, plan_id: &str, date: NaiveDate) -> Option<&ProgressEntry> {
        self.progress
            .iter()
            .find(|e| e.plan_id == plan_id && e.date == date)
    }

    /// Merge a partial update: every present field replaces the local one.
    pub fn apply(&mut self, update: &PartialUpdate) {
        if let Some(plans) = &update.plans {
            self.plans.clone_from(plans);
        }
        if let Some(progress) = &update.progress {
            self.progress.clone_from(progress);
        }
    }
}

/// A write against the user document.
///
/// Each present field wholesale-replaces the corresponding array; absent
/// fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialUpdate {
    /// Replacement plans, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plans: Option<Vec<Plan>>,
    /// Replacement progress, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Vec<ProgressEntry>>,
}

impl PartialUpdate {
    /// An update that replaces only `plans`.
    #[must_use]
    pub fn plans(plans: Vec<Plan>) -> Self {
        Self {
            plans: Some(plans),
            progress: None,
        }
    }

    /// An update that replaces only `progress`.
    #[must_use]
    pub fn progress(progress: Vec<ProgressEntry>) -> Self {
        Self {
            plans: None,
            progress: Some(progress),
        }
    }

    /// Also replace `plans`.
    #[must_use]
    pub fn with_plans(mut self, plans: Vec<Plan>) -> Self {
        self.plans = Some(plans);
        self
    }

    /// Also replace `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Vec<ProgressEntry>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// True when the update touches no field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_none() && self.progress.is_none()
    }
}

/// Generate a unique id with a readable prefix, e.g. `plan_1b4e...`.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Parse a `YYYY-MM-DD` calendar date.
///
/// # Errors
///
/// Returns `InvalidDate` if the text is not a valid date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate {
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn plan(id: &str) -> Plan {
        Plan {
            id: id.to_string(),
            plan_name: format!("Plan {id}"),
            technique_ids: vec!["legato".to_string()],
        }
    }

    #[test]
    fn test_metric_values_insert_and_get() {
        let mut values = MetricValues::new();
        values.insert("legato", "speed", 120.0);
        values.insert("legato", "accuracy", 90.0);
        values.insert("divebombs", "return_pitch", 75.0);

        assert_eq!(values.get("legato", "speed"), Some(120.0));
        assert_eq!(values.get("legato", "stamina"), None);
        assert_eq!(values.get("nope", "speed"), None);
        assert_eq!(values.len(), 3);
        assert!(!values.is_empty());
    }

    #[test]
    fn test_metric_values_remove_drops_empty_technique() {
        let mut values = MetricValues::new();
        values.insert("legato", "speed", 120.0);

        assert_eq!(values.remove("legato", "speed"), Some(120.0));
        assert!(values.is_empty());
        assert_eq!(values, MetricValues::new());
        assert_eq!(values.remove("legato", "speed"), None);
    }

    #[test]
    fn test_metric_values_do_not_collide_on_underscores() {
        // These would share the flat key "shred_legato_speed"
        let mut values = MetricValues::new();
        values.insert("shred_legato", "speed", 200.0);
        values.insert("shred", "legato_speed", 1.0);

        assert_eq!(values.get("shred_legato", "speed"), Some(200.0));
        assert_eq!(values.get("shred", "legato_speed"), Some(1.0));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_metric_values_iter_order() {
        let values: MetricValues = vec![
            ("legato".to_string(), "speed".to_string(), 1.0),
            ("divebombs".to_string(), "return_pitch".to_string(), 2.0),
            ("legato".to_string(), "accuracy".to_string(), 3.0),
        ]
        .into_iter()
        .collect();

        let flat: Vec<_> = values.iter().collect();
        assert_eq!(
            flat,
            vec![
                ("divebombs", "return_pitch", 2.0),
                ("legato", "accuracy", 3.0),
                ("legato", "speed", 1.0),
            ]
        );
    }

    #[test]
    fn test_metric_values_serialize_nested() {
        let mut values = MetricValues::new();
        values.insert("legato", "speed", 120.0);
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"{"legato":{"speed":120.0}}"#);
    }

    #[test]
    fn test_entry_serializes_camel_case_and_iso_date() {
        let mut metrics = MetricValues::new();
        metrics.insert("legato", "speed", 120.0);
        let entry = ProgressEntry {
            id: "e1".to_string(),
            plan_id: "p1".to_string(),
            date: date("2024-03-01"),
            metrics,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["planId"], "p1");
        assert_eq!(json["date"], "2024-03-01");
        assert_eq!(json["metrics"]["legato"]["speed"], 120.0);
    }

    #[test]
    fn test_user_data_deserialize_missing_fields() {
        let data: UserData = serde_json::from_str("{}").unwrap();
        assert!(data.plans.is_empty());
        assert!(data.progress.is_empty());
    }

    #[test]
    fn test_user_data_lookups() {
        let mut metrics = MetricValues::new();
        metrics.insert("legato", "speed", 100.0);
        let data = UserData {
            plans: vec![plan("p1")],
            progress: vec![ProgressEntry::new("p1", date("2024-03-01"), metrics)],
        };

        assert!(data.plan("p1").is_some());
        assert!(data.plan("p2").is_none());
        assert!(data.entry_for("p1", date("2024-03-01")).is_some());
        assert!(data.entry_for("p1", date("2024-03-02")).is_none());
        assert!(data.entry_for("p2", date("2024-03-01")).is_none());
    }

    #[test]
    fn test_apply_replaces_only_present_fields() {
        let mut metrics = MetricValues::new();
        metrics.insert("legato", "speed", 100.0);
        let mut data = UserData {
            plans: vec![plan("p1")],
            progress: vec![ProgressEntry::new("p1", date("2024-03-01"), metrics)],
        };

        data.apply(&PartialUpdate::plans(vec![plan("p2"), plan("p3")]));
        assert_eq!(data.plans.len(), 2);
        assert_eq!(data.progress.len(), 1);

        data.apply(&PartialUpdate::progress(Vec::new()));
        assert_eq!(data.plans.len(), 2);
        assert!(data.progress.is_empty());

        data.apply(&PartialUpdate::default());
        assert_eq!(data.plans.len(), 2);
    }

    #[test]
    fn test_partial_update_builders() {
        assert!(PartialUpdate::default().is_empty());

        let update = PartialUpdate::plans(Vec::new()).with_progress(Vec::new());
        assert!(update.plans.is_some());
        assert!(update.progress.is_some());
        assert!(!update.is_empty());

        let json = serde_json::to_string(&PartialUpdate::plans(Vec::new())).unwrap();
        assert_eq!(json, r#"{"plans":[]}"#);
    }

    #[test]
    fn test_generate_id_unique_and_prefixed() {
        let a = generate_id("plan");
        let b = generate_id("plan");
        assert!(a.starts_with("plan_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(matches!(
            parse_date("2024-02-30"),
            Err(Error::InvalidDate { .. })
        ));
        assert!(parse_date("03/01/2024").is_err());
    }
}
