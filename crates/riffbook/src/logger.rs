//! Progress logger.
//!
//! A [`ProgressLogger`] holds the editable text fields for one
//! `(plan, date)` selection. Selecting loads any existing entry; saving
//! parses the fields and writes the resulting entry, or removes the entry
//! when every field is empty.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Weekday};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{MetricValues, PartialUpdate, Plan, ProgressEntry, UserData};
use crate::plans::plan_techniques;
use crate::tracker::Tracker;

/// Raw field text keyed by technique id then metric id.
pub type Fields = BTreeMap<String, BTreeMap<String, String>>;

/// What a save did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// An entry was written.
    Saved,
    /// All fields were empty and the existing entry was removed.
    Cleared,
    /// All fields were empty and there was no entry to remove.
    NothingToSave,
}

/// Editable state for one plan on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLogger {
    plan_id: String,
    date: NaiveDate,
    fields: Fields,
}

impl ProgressLogger {
    /// Load the fields for a plan and date.
    ///
    /// Every metric of the plan's techniques gets a field, empty unless the
    /// existing entry records a value for it. Values the entry records
    /// outside the plan's current techniques are kept as fields too.
    #[must_use]
    pub fn select(data: &UserData, plan: &Plan, date: NaiveDate) -> Self {
        let mut fields = Fields::new();
        for tech in plan_techniques(plan) {
            let metrics = fields.entry(tech.id.to_string()).or_default();
            for metric in tech.default_metrics {
                metrics.insert(metric.id.to_string(), String::new());
            }
        }

        if let Some(entry) = data.entry_for(&plan.id, date) {
            for (tech, metric, value) in entry.metrics.iter() {
                fields
                    .entry(tech.to_string())
                    .or_default()
                    .insert(metric.to_string(), value.to_string());
            }
        }

        debug!(plan_id = %plan.id, %date, fields = fields.len(), "Logger selection loaded");
        Self {
            plan_id: plan.id.clone(),
            date,
            fields,
        }
    }

    /// The selected plan id.
    #[must_use]
    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    /// The selected date.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Set one field's raw text. Any pair is accepted.
    pub fn handle_metric_change(
        &mut self,
        technique_id: &str,
        metric_id: &str,
        raw: impl Into<String>,
    ) {
        self.fields
            .entry(technique_id.to_string())
            .or_default()
            .insert(metric_id.to_string(), raw.into());
    }

    /// Raw text of one field, if the field exists.
    #[must_use]
    pub fn field(&self, technique_id: &str, metric_id: &str) -> Option<&str> {
        self.fields
            .get(technique_id)?
            .get(metric_id)
            .map(String::as_str)
    }

    /// All fields.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Parse the non-empty fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetricValue` for the first field that is not a finite
    /// decimal number.
    pub fn parse_metrics(&self) -> Result<MetricValues> {
        let mut values = MetricValues::new();
        for (tech, metrics) in &self.fields {
            for (metric, raw) in metrics {
                let text = raw.trim();
                if text.is_empty() {
                    continue;
                }
                let value = text
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| Error::InvalidMetricValue {
                        technique: tech.clone(),
                        metric: metric.clone(),
                        raw: raw.clone(),
                    })?;
                values.insert(tech.as_str(), metric.as_str(), value);
            }
        }
        Ok(values)
    }

    /// Build the progress update a save performs against `data`.
    ///
    /// An existing entry keeps its id. Empty metrics remove the entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetricValue` if a field does not parse.
    pub fn save_update(&self, data: &UserData) -> Result<(PartialUpdate, SaveOutcome)> {
        let metrics = self.parse_metrics()?;
        let existing = data
            .progress
            .iter()
            .position(|e| e.plan_id == self.plan_id && e.date == self.date);
        let mut progress = data.progress.clone();

        let outcome = match (metrics.is_empty(), existing) {
            (true, Some(index)) => {
                progress.remove(index);
                SaveOutcome::Cleared
            }
            (true, None) => SaveOutcome::NothingToSave,
            (false, Some(index)) => {
                progress[index].metrics = metrics;
                SaveOutcome::Saved
            }
            (false, None) => {
                progress.push(ProgressEntry::new(self.plan_id.clone(), self.date, metrics));
                SaveOutcome::Saved
            }
        };

        Ok((PartialUpdate::progress(progress), outcome))
    }

    /// Save the fields. Always performs exactly one store update.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetricValue` before any write if a field does not
    /// parse, or `StoreUnavailable` if the write fails.
    pub async fn save(&self, tracker: &mut Tracker) -> Result<SaveOutcome> {
        let (update, outcome) = self.save_update(tracker.data())?;
        tracker.apply(update).await?;
        info!(plan_id = %self.plan_id, date = %self.date, ?outcome, "Progress saved");
        Ok(outcome)
    }
}

/// One day in a week overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayStatus {
    /// The day.
    pub date: NaiveDate,
    /// Number of values logged for the plan that day; zero when none.
    pub logged_values: usize,
}

/// The Monday-first week containing `date`.
#[must_use]
pub fn week_days(date: NaiveDate) -> Vec<NaiveDate> {
    date.week(Weekday::Mon).first_day().iter_days().take(7).collect()
}

/// Per-day logging status for a plan over the week containing `date`.
#[must_use]
pub fn week_overview(data: &UserData, plan_id: &str, date: NaiveDate) -> Vec<DayStatus> {
    week_days(date)
        .into_iter()
        .map(|day| DayStatus {
            date: day,
            logged_values: data
                .entry_for(plan_id, day)
                .map_or(0, |e| e.metrics.len()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::identity::UserSession;
    use crate::model::parse_date;
    use crate::storage::Storage;
    use crate::store::SqliteStore;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn plan() -> Plan {
        Plan {
            id: "p1".to_string(),
            plan_name: "Shred".to_string(),
            technique_ids: vec!["legato".to_string(), "divebombs".to_string()],
        }
    }

    fn data_with_entry() -> UserData {
        let mut metrics = MetricValues::new();
        metrics.insert("legato", "speed", 120.0);
        UserData {
            plans: vec![plan()],
            progress: vec![ProgressEntry {
                id: "e1".to_string(),
                plan_id: "p1".to_string(),
                date: date("2024-03-01"),
                metrics,
            }],
        }
    }

    #[test]
    fn test_select_populates_existing_entry() {
        let logger = ProgressLogger::select(&data_with_entry(), &plan(), date("2024-03-01"));

        assert_eq!(logger.field("legato", "speed"), Some("120"));
        assert_eq!(logger.field("legato", "accuracy"), Some(""));
        assert_eq!(logger.field("divebombs", "return_pitch"), Some(""));
        assert_eq!(logger.field("pinch_harmonics", "consistency"), None);
    }

    #[test]
    fn test_select_without_entry_is_all_empty() {
        let logger = ProgressLogger::select(&data_with_entry(), &plan(), date("2024-03-02"));

        let count: usize = logger.fields().values().map(BTreeMap::len).sum();
        assert_eq!(count, 3);
        assert!(logger
            .fields()
            .values()
            .flat_map(BTreeMap::values)
            .all(String::is_empty));
    }

    #[test]
    fn test_handle_metric_change_accepts_unknown_pairs() {
        let mut logger = ProgressLogger::select(&UserData::default(), &plan(), date("2024-03-01"));
        logger.handle_metric_change("legato", "speed", "140");
        logger.handle_metric_change("made_up", "thing", "3");

        assert_eq!(logger.field("legato", "speed"), Some("140"));
        assert_eq!(logger.field("made_up", "thing"), Some("3"));
        assert_eq!(logger.field("legato", "accuracy"), Some(""));
    }

    #[test]
    fn test_parse_metrics_trims_and_skips_empty() {
        let mut logger = ProgressLogger::select(&UserData::default(), &plan(), date("2024-03-01"));
        logger.handle_metric_change("legato", "speed", " 132.5 ");
        logger.handle_metric_change("legato", "accuracy", "   ");

        let values = logger.parse_metrics().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("legato", "speed"), Some(132.5));
    }

    #[test]
    fn test_parse_metrics_rejects_malformed() {
        for raw in ["12,5", "fast", "NaN", "inf"] {
            let mut logger =
                ProgressLogger::select(&UserData::default(), &plan(), date("2024-03-01"));
            logger.handle_metric_change("legato", "speed", raw);
            match logger.parse_metrics() {
                Err(Error::InvalidMetricValue { metric, raw: got, .. }) => {
                    assert_eq!(metric, "speed");
                    assert_eq!(got, raw);
                }
                other => panic!("expected InvalidMetricValue for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_save_update_keeps_entry_id() {
        let data = data_with_entry();
        let mut logger = ProgressLogger::select(&data, &plan(), date("2024-03-01"));
        logger.handle_metric_change("legato", "accuracy", "95");

        let (update, outcome) = logger.save_update(&data).unwrap();
        let progress = update.progress.unwrap();

        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].id, "e1");
        assert_eq!(progress[0].metrics.get("legato", "speed"), Some(120.0));
        assert_eq!(progress[0].metrics.get("legato", "accuracy"), Some(95.0));
        assert!(update.plans.is_none());
    }

    #[test]
    fn test_save_update_appends_new_entry() {
        let data = data_with_entry();
        let mut logger = ProgressLogger::select(&data, &plan(), date("2024-03-02"));
        logger.handle_metric_change("divebombs", "return_pitch", "80");

        let (update, outcome) = logger.save_update(&data).unwrap();
        let progress = update.progress.unwrap();

        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[1].date, date("2024-03-02"));
        assert!(progress[1].id.starts_with("entry_"));
    }

    #[test]
    fn test_save_update_all_empty_removes_entry() {
        let data = data_with_entry();
        let mut logger = ProgressLogger::select(&data, &plan(), date("2024-03-01"));
        logger.handle_metric_change("legato", "speed", "");

        let (update, outcome) = logger.save_update(&data).unwrap();
        assert_eq!(outcome, SaveOutcome::Cleared);
        assert!(update.progress.unwrap().is_empty());
    }

    #[test]
    fn test_save_update_all_empty_without_entry() {
        let data = data_with_entry();
        let logger = ProgressLogger::select(&data, &plan(), date("2024-03-05"));

        let (update, outcome) = logger.save_update(&data).unwrap();
        assert_eq!(outcome, SaveOutcome::NothingToSave);
        assert_eq!(update.progress.unwrap(), data.progress);
    }

    #[tokio::test]
    async fn test_save_round_trip_through_store() {
        let store = Arc::new(SqliteStore::new(
            Storage::open_in_memory().unwrap(),
            "test-app",
            Duration::from_millis(20),
        ));
        let session = UserSession::new("u1", "").unwrap();
        let mut tracker = Tracker::open(store.clone(), session).await.unwrap();

        let mut logger = ProgressLogger::select(tracker.data(), &plan(), date("2024-03-01"));
        logger.handle_metric_change("legato", "speed", "120");
        assert_eq!(logger.save(&mut tracker).await.unwrap(), SaveOutcome::Saved);

        let mut reloaded = ProgressLogger::select(tracker.data(), &plan(), date("2024-03-01"));
        assert_eq!(reloaded.field("legato", "speed"), Some("120"));

        reloaded.handle_metric_change("legato", "speed", "");
        assert_eq!(
            reloaded.save(&mut tracker).await.unwrap(),
            SaveOutcome::Cleared
        );
        assert!(tracker.data().progress.is_empty());
        assert_eq!(store.stats("u1").unwrap().revision, 2);
    }

    #[tokio::test]
    async fn test_save_rejects_before_writing() {
        let store = Arc::new(SqliteStore::new(
            Storage::open_in_memory().unwrap(),
            "test-app",
            Duration::from_millis(20),
        ));
        let session = UserSession::new("u1", "").unwrap();
        let mut tracker = Tracker::open(store.clone(), session).await.unwrap();

        let mut logger = ProgressLogger::select(tracker.data(), &plan(), date("2024-03-01"));
        logger.handle_metric_change("legato", "speed", "12O");

        assert!(logger.save(&mut tracker).await.is_err());
        assert_eq!(store.stats("u1").unwrap().revision, 0);
    }

    #[test]
    fn test_week_days_monday_first() {
        let days = week_days(date("2024-03-06"));
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], date("2024-03-04"));
        assert_eq!(days[6], date("2024-03-10"));

        assert_eq!(week_days(date("2024-03-04"))[0], date("2024-03-04"));
        assert_eq!(week_days(date("2024-03-10"))[0], date("2024-03-04"));
    }

    #[test]
    fn test_week_overview() {
        let overview = week_overview(&data_with_entry(), "p1", date("2024-02-28"));
        let logged: Vec<_> = overview
            .iter()
            .filter(|d| d.logged_values > 0)
            .map(|d| d.date)
            .collect();
        assert_eq!(logged, vec![date("2024-03-01")]);
        assert_eq!(overview[3].logged_values, 1);
    }
}
