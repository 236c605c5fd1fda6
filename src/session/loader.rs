//! MyWellness workout export parser.
//!
//! The export stores every device column in one `samples` array, keyed by
//! position through the `descriptor` list. Heart rate arrives separately in
//! a sparser `hr` array.

use super::types::{ActivityType, Metric, Series, Session, Workout};
use crate::error::{ConvertError, ConvertResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Naive datetime formats accepted for a start time, interpreted as UTC.
const START_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Latest accepted sample offset from the session start, in seconds.
pub const MAX_SAMPLE_OFFSET_SECS: f64 = 1e9;

/// Options controlling how an export is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Start time override; takes precedence over `data.startDate`
    pub start_time: Option<DateTime<Utc>>,
    /// Activity type override; takes precedence over `data.activityType`
    pub activity_type: Option<ActivityType>,
    /// Activity type used when neither override nor export names one
    pub default_activity: ActivityType,
    /// Drop trailing samples where speed and power are both zero
    pub trim_trailing_idle: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            start_time: None,
            activity_type: None,
            default_activity: ActivityType::Biking,
            trim_trailing_idle: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Export {
    data: ExportData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportData {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    activity_type: Option<String>,
    analitics: Analytics,
}

#[derive(Debug, Deserialize)]
struct Analytics {
    descriptor: Vec<Descriptor>,
    samples: Vec<RawSample>,
    #[serde(default)]
    hr: Vec<HeartRateSample>,
}

#[derive(Debug, Deserialize)]
struct Descriptor {
    pr: Property,
}

#[derive(Debug, Deserialize)]
struct Property {
    name: String,
    #[serde(default)]
    um: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSample {
    t: f64,
    vs: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct HeartRateSample {
    t: f64,
    hr: Option<f64>,
}

/// Column metadata resolved from the descriptor list.
struct Column {
    metric: Metric,
    scale: f64,
}

impl Column {
    fn from_descriptor(descriptor: &Descriptor) -> Option<Self> {
        let metric = Metric::from_descriptor(&descriptor.pr.name)?;
        let scale = match (metric, descriptor.pr.um.as_deref()) {
            (Metric::Speed, Some(unit)) if unit.eq_ignore_ascii_case("m/s") => 1.0,
            // Treadmills and bikes report km/h
            (Metric::Speed, _) => 1.0 / 3.6,
            _ => 1.0,
        };
        Some(Self { metric, scale })
    }
}

/// Read and parse an export file.
pub fn load_export(path: &Path, options: &LoadOptions) -> ConvertResult<Workout> {
    let content = std::fs::read_to_string(path).map_err(|source| ConvertError::IoRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_export(&content, options)
}

/// Parse export JSON into a typed workout.
pub fn parse_export(json: &str, options: &LoadOptions) -> ConvertResult<Workout> {
    let export: Export =
        serde_json::from_str(json).map_err(|e| ConvertError::MalformedInput(e.to_string()))?;
    let data = export.data;

    let start_time = match (options.start_time, data.start_date.as_deref()) {
        (Some(start), _) => start,
        (None, Some(raw)) => parse_start_time(raw)?,
        (None, None) => {
            return Err(ConvertError::MalformedInput(
                "no start time: export has no data.startDate and none was given".to_string(),
            ))
        }
    };

    let activity_type = options
        .activity_type
        .or_else(|| data.activity_type.as_deref().and_then(|s| s.parse().ok()))
        .unwrap_or(options.default_activity);

    let session = Session::new(start_time, activity_type);
    let series = extract_series(data.analitics, options.trim_trailing_idle)?;

    tracing::debug!(
        "Loaded {} series starting at {}",
        series.len(),
        session.start_time()
    );

    Ok(Workout { session, series })
}

/// Parse a start time given on the command line or in the export.
pub fn parse_start_time(raw: &str) -> ConvertResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    START_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ConvertError::MalformedInput(format!("invalid start time '{}'", raw)))
}

fn extract_series(
    analytics: Analytics,
    trim_trailing_idle: bool,
) -> ConvertResult<BTreeMap<Metric, Series>> {
    tracing::info!("Processing {} samples", analytics.samples.len());

    if analytics.samples.is_empty() && analytics.hr.is_empty() {
        return Err(ConvertError::EmptySeries);
    }

    let offsets = analytics
        .samples
        .iter()
        .map(|s| s.t)
        .chain(analytics.hr.iter().map(|s| s.t));
    for t in offsets {
        if !(0.0..=MAX_SAMPLE_OFFSET_SECS).contains(&t) {
            return Err(ConvertError::MalformedInput(format!(
                "sample time {} outside 0..={} seconds",
                t, MAX_SAMPLE_OFFSET_SECS
            )));
        }
    }

    let columns: Vec<Option<Column>> = analytics
        .descriptor
        .iter()
        .map(Column::from_descriptor)
        .collect();

    let mut rows = analytics.samples;
    if trim_trailing_idle {
        let kept = active_len(&rows, &columns);
        if kept < rows.len() {
            tracing::info!("Trimmed {} trailing idle samples", rows.len() - kept);
            rows.truncate(kept);
        }
    }

    let mut pairs: BTreeMap<Metric, Vec<(f64, f64)>> = BTreeMap::new();
    for row in &rows {
        for (column, value) in columns.iter().zip(&row.vs) {
            let (Some(column), Some(value)) = (column, value.as_f64()) else {
                continue;
            };
            pairs
                .entry(column.metric)
                .or_default()
                .push((row.t, value * column.scale));
        }
    }

    let hr_pairs: Vec<(f64, f64)> = analytics
        .hr
        .iter()
        .filter_map(|s| s.hr.map(|hr| (s.t, hr)))
        .collect();
    if !hr_pairs.is_empty() {
        pairs.insert(Metric::HeartRate, hr_pairs);
    }

    let series: BTreeMap<Metric, Series> = pairs
        .into_iter()
        .map(|(metric, pairs)| (metric, Series::from_pairs(metric, pairs)))
        .filter(|(_, series)| !series.is_empty())
        .collect();

    if series.is_empty() {
        return Err(ConvertError::EmptySeries);
    }

    Ok(series)
}

/// Number of leading rows to keep once trailing rows with zero speed and
/// zero power are dropped. Exports with neither column are left untouched.
fn active_len(rows: &[RawSample], columns: &[Option<Column>]) -> usize {
    let activity_columns: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Some(c) if matches!(c.metric, Metric::Speed | Metric::Power)))
        .map(|(idx, _)| idx)
        .collect();

    if activity_columns.is_empty() {
        return rows.len();
    }

    rows.iter()
        .rposition(|row| {
            activity_columns.iter().any(|&idx| {
                row.vs
                    .get(idx)
                    .and_then(serde_json::Value::as_f64)
                    .is_some_and(|v| v != 0.0)
            })
        })
        .map_or(0, |idx| idx + 1)
}
