//! Statistics over recorded progress.
//!
//! Everything here is a pure function of the progress entries.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::catalog;
use crate::error::{Error, Result};
use crate::model::ProgressEntry;

/// One recorded value of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Day the value was logged.
    pub date: NaiveDate,
    /// The logged value.
    pub value: f64,
}

/// Direction of a change between two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The latest value is higher.
    Increase,
    /// The latest value is lower.
    Decrease,
    /// Both values are equal.
    Unchanged,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increase => write!(f, "increase"),
            Self::Decrease => write!(f, "decrease"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Comparison of the two most recent values of a series.
///
/// The two values need not be a week apart; they are simply the latest
/// and the one logged before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeekOverWeek {
    /// Fewer than two points, or the previous value is zero.
    NotApplicable,
    /// The latest value changed relative to the previous one.
    Change {
        /// The latest value with its unit, e.g. `"100 bpm"`.
        display_value: String,
        /// Magnitude of the change in percent; the sign is in `direction`.
        percent_change: f64,
        /// Whether the value went up, down, or stayed level.
        direction: Direction,
    },
}

impl fmt::Display for WeekOverWeek {
    /// `"100 bpm, 25% increase"`, with the percentage rounded to a whole
    /// number, or `"n/a"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApplicable => write!(f, "n/a"),
            Self::Change {
                display_value,
                percent_change,
                direction,
            } => write!(f, "{display_value}, {}% {direction}", percent_change.round()),
        }
    }
}

/// One point per day a technique metric was logged, in ascending date order.
///
/// Plans sharing a technique can log it on the same day; such values
/// collapse into one point holding the day's highest value.
#[must_use]
pub fn series_for(
    progress: &[ProgressEntry],
    technique_id: &str,
    metric_id: &str,
) -> Vec<SeriesPoint> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for entry in progress {
        if let Some(value) = entry.metrics.get(technique_id, metric_id) {
            by_day
                .entry(entry.date)
                .and_modify(|best| *best = best.max(value))
                .or_insert(value);
        }
    }
    by_day
        .into_iter()
        .map(|(date, value)| SeriesPoint { date, value })
        .collect()
}

/// Highest value in the series, or `0` for an empty series.
#[must_use]
pub fn all_time_best(series: &[SeriesPoint]) -> f64 {
    series.iter().map(|p| p.value).reduce(f64::max).unwrap_or(0.0)
}

/// The most recent point.
#[must_use]
pub fn latest(series: &[SeriesPoint]) -> Option<SeriesPoint> {
    series.last().copied()
}

/// Format a value with its unit, e.g. `"120 bpm"`, or just `"8"` without one.
#[must_use]
pub fn format_with_unit(value: f64, unit: &str) -> String {
    if unit.is_empty() {
        value.to_string()
    } else {
        format!("{value} {unit}")
    }
}

/// Compare the last two points of a date-sorted series.
#[must_use]
pub fn week_over_week(series: &[SeriesPoint], unit: &str) -> WeekOverWeek {
    let [.., prev, last] = series else {
        return WeekOverWeek::NotApplicable;
    };
    if prev.value == 0.0 {
        return WeekOverWeek::NotApplicable;
    }

    let change = (last.value - prev.value) / prev.value * 100.0;
    let direction = if change > 0.0 {
        Direction::Increase
    } else if change < 0.0 {
        Direction::Decrease
    } else {
        Direction::Unchanged
    };

    WeekOverWeek::Change {
        display_value: format_with_unit(last.value, unit),
        percent_change: change.abs(),
        direction,
    }
}

/// Everything shown for one technique metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    /// Catalog technique id.
    pub technique_id: String,
    /// Technique display name.
    pub technique_name: String,
    /// Catalog metric id.
    pub metric_id: String,
    /// Metric display label.
    pub metric_label: String,
    /// Unit suffix, possibly empty.
    pub unit: String,
    /// Every logged value in date order.
    pub series: Vec<SeriesPoint>,
    /// All-time best, `0` when nothing is logged.
    pub best: f64,
    /// Most recent value.
    pub latest: Option<SeriesPoint>,
    /// Change between the two most recent values.
    pub week_over_week: WeekOverWeek,
}

/// Summarize one catalog metric.
///
/// # Errors
///
/// Returns `UnknownTechnique` or `UnknownMetric` if the pair is not in the
/// catalog.
pub fn summarize(
    progress: &[ProgressEntry],
    technique_id: &str,
    metric_id: &str,
) -> Result<MetricSummary> {
    let tech = catalog::technique(technique_id).ok_or_else(|| Error::UnknownTechnique {
        technique: technique_id.to_string(),
    })?;
    let metric = tech.metric(metric_id).ok_or_else(|| Error::UnknownMetric {
        technique: technique_id.to_string(),
        metric: metric_id.to_string(),
    })?;

    let series = series_for(progress, tech.id, metric.id);
    Ok(MetricSummary {
        technique_id: tech.id.to_string(),
        technique_name: tech.name.to_string(),
        metric_id: metric.id.to_string(),
        metric_label: metric.label.to_string(),
        unit: metric.unit.to_string(),
        best: all_time_best(&series),
        latest: latest(&series),
        week_over_week: week_over_week(&series, metric.unit),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parse_date, MetricValues};

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn point(d: &str, value: f64) -> SeriesPoint {
        SeriesPoint {
            date: date(d),
            value,
        }
    }

    fn entry(d: &str, values: &[(&str, &str, f64)]) -> ProgressEntry {
        let metrics = values
            .iter()
            .map(|(t, m, v)| ((*t).to_string(), (*m).to_string(), *v))
            .collect::<MetricValues>();
        ProgressEntry::new("p1", date(d), metrics)
    }

    #[test]
    fn test_series_sorted_by_calendar_date() {
        let progress = vec![
            entry("2024-03-10", &[("legato", "speed", 3.0)]),
            entry("2024-03-02", &[("legato", "speed", 1.0)]),
            entry("2024-03-05", &[("legato", "accuracy", 90.0)]),
            entry("2024-03-09", &[("legato", "speed", 2.0)]),
        ];

        let series = series_for(&progress, "legato", "speed");
        assert_eq!(
            series,
            vec![
                point("2024-03-02", 1.0),
                point("2024-03-09", 2.0),
                point("2024-03-10", 3.0),
            ]
        );

        let mut resorted = series.clone();
        resorted.sort_by_key(|p| p.date);
        assert_eq!(resorted, series);
    }

    #[test]
    fn test_series_collapses_same_day_values_across_plans() {
        let mut morning = entry("2024-03-01", &[("legato", "speed", 100.0)]);
        morning.plan_id = "p1".to_string();
        let mut evening = entry("2024-03-01", &[("legato", "speed", 80.0)]);
        evening.plan_id = "p2".to_string();
        let later = entry("2024-03-08", &[("legato", "speed", 90.0)]);

        for progress in [
            vec![morning.clone(), evening.clone(), later.clone()],
            vec![later, evening, morning],
        ] {
            let series = series_for(&progress, "legato", "speed");
            assert_eq!(
                series,
                vec![point("2024-03-01", 100.0), point("2024-03-08", 90.0)]
            );
            assert!(series.windows(2).all(|w| w[0].date < w[1].date));

            match week_over_week(&series, "bpm") {
                WeekOverWeek::Change { direction, .. } => {
                    assert_eq!(direction, Direction::Decrease);
                }
                WeekOverWeek::NotApplicable => panic!("expected a change"),
            }
        }
    }

    #[test]
    fn test_series_empty_for_unlogged_metric() {
        let progress = vec![entry("2024-03-01", &[("legato", "speed", 1.0)])];
        assert!(series_for(&progress, "divebombs", "return_pitch").is_empty());
    }

    #[test]
    fn test_all_time_best() {
        assert!((all_time_best(&[]) - 0.0).abs() < f64::EPSILON);
        let series = [point("2024-01-01", 5.0), point("2024-01-08", 12.0)];
        assert!((all_time_best(&series) - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_latest() {
        assert_eq!(latest(&[]), None);
        let series = [point("2024-01-01", 5.0), point("2024-01-08", 12.0)];
        assert_eq!(latest(&series), Some(point("2024-01-08", 12.0)));
    }

    #[test]
    fn test_week_over_week_increase() {
        let series = [point("2024-03-01", 80.0), point("2024-03-08", 100.0)];
        match week_over_week(&series, "bpm") {
            WeekOverWeek::Change {
                display_value,
                percent_change,
                direction,
            } => {
                assert_eq!(display_value, "100 bpm");
                assert!((percent_change - 25.0).abs() < 1e-9);
                assert_eq!(direction, Direction::Increase);
            }
            WeekOverWeek::NotApplicable => panic!("expected a change"),
        }
    }

    #[test]
    fn test_week_over_week_decrease() {
        let series = [point("2024-03-01", 100.0), point("2024-03-02", 80.0)];
        match week_over_week(&series, "%") {
            WeekOverWeek::Change {
                percent_change,
                direction,
                ..
            } => {
                assert!((percent_change - 20.0).abs() < 1e-9);
                assert_eq!(direction, Direction::Decrease);
            }
            WeekOverWeek::NotApplicable => panic!("expected a change"),
        }
    }

    #[test]
    fn test_week_over_week_uses_last_two_points() {
        let series = [
            point("2024-03-01", 10.0),
            point("2024-03-02", 50.0),
            point("2024-03-03", 50.0),
        ];
        let wow = week_over_week(&series, "");
        assert_eq!(
            wow,
            WeekOverWeek::Change {
                display_value: "50".to_string(),
                percent_change: 0.0,
                direction: Direction::Unchanged,
            }
        );
    }

    #[test]
    fn test_week_over_week_not_applicable() {
        assert_eq!(week_over_week(&[], "bpm"), WeekOverWeek::NotApplicable);
        assert_eq!(
            week_over_week(&[point("2024-03-01", 80.0)], "bpm"),
            WeekOverWeek::NotApplicable
        );
        assert_eq!(
            week_over_week(
                &[point("2024-03-01", 0.0), point("2024-03-02", 5.0)],
                "bpm"
            ),
            WeekOverWeek::NotApplicable
        );
    }

    #[test]
    fn test_summarize() {
        let progress = vec![
            entry("2024-03-08", &[("legato", "speed", 100.0)]),
            entry("2024-03-01", &[("legato", "speed", 80.0)]),
        ];

        let summary = summarize(&progress, "legato", "speed").unwrap();
        assert_eq!(summary.technique_name, "Legato");
        assert_eq!(summary.metric_label, "Speed (BPM)");
        assert_eq!(summary.series.len(), 2);
        assert!((summary.best - 100.0).abs() < f64::EPSILON);
        assert_eq!(summary.latest, Some(point("2024-03-08", 100.0)));
        assert!(matches!(
            summary.week_over_week,
            WeekOverWeek::Change {
                direction: Direction::Increase,
                ..
            }
        ));
    }

    #[test]
    fn test_summarize_unknown_pair() {
        assert!(matches!(
            summarize(&[], "sweep_picking", "speed"),
            Err(Error::UnknownTechnique { .. })
        ));
        assert!(matches!(
            summarize(&[], "divebombs", "speed"),
            Err(Error::UnknownMetric { .. })
        ));
    }

    #[test]
    fn test_week_over_week_display_rounds_to_whole_percent() {
        let series = [point("2024-03-01", 30.0), point("2024-03-08", 40.0)];
        let wow = week_over_week(&series, "bpm");
        assert_eq!(wow.to_string(), "40 bpm, 33% increase");

        let series = [point("2024-03-01", 80.0), point("2024-03-08", 79.6)];
        assert_eq!(
            week_over_week(&series, "bpm").to_string(),
            "79.6 bpm, 1% decrease"
        );

        let series = [point("2024-03-01", 200.0), point("2024-03-08", 205.0)];
        assert_eq!(week_over_week(&series, "").to_string(), "205, 3% increase");

        assert_eq!(WeekOverWeek::NotApplicable.to_string(), "n/a");
    }

    #[test]
    fn test_week_over_week_serializes_tagged() {
        let json = serde_json::to_value(WeekOverWeek::NotApplicable).unwrap();
        assert_eq!(json["status"], "not_applicable");
    }
}
