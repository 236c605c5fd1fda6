//! Session metadata and per-metric time series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// A tracked workout metric.
///
/// Declaration order doubles as the tie-break order when picking a primary
/// time base, so positional and speed data come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Speed in m/s
    Speed,
    /// Latitude in degrees
    Latitude,
    /// Longitude in degrees
    Longitude,
    /// Elevation in meters
    Elevation,
    /// Device-reported cumulative distance in meters
    Distance,
    /// Heart rate in BPM
    HeartRate,
    /// Cadence in RPM
    Cadence,
    /// Power in watts
    Power,
}

impl Metric {
    /// All metrics, in declaration order.
    pub const ALL: [Metric; 8] = [
        Metric::Speed,
        Metric::Latitude,
        Metric::Longitude,
        Metric::Elevation,
        Metric::Distance,
        Metric::HeartRate,
        Metric::Cadence,
        Metric::Power,
    ];

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Speed => "speed",
            Metric::Latitude => "latitude",
            Metric::Longitude => "longitude",
            Metric::Elevation => "elevation",
            Metric::Distance => "distance",
            Metric::HeartRate => "heart_rate",
            Metric::Cadence => "cadence",
            Metric::Power => "power",
        }
    }

    /// Map an export descriptor name (e.g. `"Rpm"`, `"HDistance"`) to a metric.
    pub fn from_descriptor(name: &str) -> Option<Metric> {
        match name.trim().to_ascii_lowercase().as_str() {
            "speed" => Some(Metric::Speed),
            "rpm" | "cadence" => Some(Metric::Cadence),
            "power" => Some(Metric::Power),
            "hdistance" | "distance" => Some(Metric::Distance),
            "lat" | "latitude" => Some(Metric::Latitude),
            "lon" | "lng" | "longitude" => Some(Metric::Longitude),
            "altitude" | "elevation" => Some(Metric::Elevation),
            "heartrate" | "hr" => Some(Metric::HeartRate),
            _ => None,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .or_else(|| Metric::from_descriptor(&normalized))
            .ok_or_else(|| format!("unknown metric '{}'", s))
    }
}

/// Activity type, mapped onto the TCX `Sport` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActivityType {
    /// Cycling (default)
    #[default]
    Biking,
    /// Running
    Running,
    /// Anything else
    Other,
}

impl ActivityType {
    /// TCX `Sport` attribute value.
    pub fn sport(&self) -> &'static str {
        match self {
            ActivityType::Biking => "Biking",
            ActivityType::Running => "Running",
            ActivityType::Other => "Other",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sport())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "biking" | "bike" | "cycling" | "ride" | "indoorcycling" => Ok(ActivityType::Biking),
            "running" | "run" | "treadmill" => Ok(ActivityType::Running),
            "" => Err("empty activity type".to_string()),
            _ => Ok(ActivityType::Other),
        }
    }
}

/// Workout session metadata. Read-only once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    start_time: DateTime<Utc>,
    activity_type: ActivityType,
    sport: String,
}

impl Session {
    /// Create session metadata for a workout starting at `start_time`.
    pub fn new(start_time: DateTime<Utc>, activity_type: ActivityType) -> Self {
        Self {
            start_time,
            activity_type,
            sport: activity_type.sport().to_string(),
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    pub fn sport(&self) -> &str {
        &self.sport
    }
}

/// One timestamped value. `t` is seconds since session start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub t: f64,
    pub value: f64,
}

/// Ordered samples for a single metric, with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    metric: Metric,
    samples: Vec<Sample>,
}

impl Series {
    /// Build a series from raw `(t, value)` pairs.
    ///
    /// Non-finite pairs are dropped. Timestamps are snapped to whole
    /// milliseconds, the resolution trackpoint times are written at. Samples
    /// are stably sorted by time and the last sample wins when several share
    /// a millisecond.
    pub fn from_pairs<I>(metric: Metric, pairs: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut raw: Vec<Sample> = pairs
            .into_iter()
            .filter(|(t, v)| t.is_finite() && v.is_finite())
            .map(|(t, value)| Sample {
                t: (t * 1000.0).round() / 1000.0,
                value,
            })
            .collect();
        raw.sort_by(|a, b| a.t.total_cmp(&b.t));

        let mut samples: Vec<Sample> = Vec::with_capacity(raw.len());
        for sample in raw {
            match samples.last_mut() {
                Some(last) if last.t == sample.t => *last = sample,
                _ => samples.push(sample),
            }
        }

        Self { metric, samples }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample timestamps in order.
    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.t).collect()
    }

    /// Sample values in time order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Drop every sample later than `t_max`.
    pub fn truncate_after(&mut self, t_max: f64) {
        self.samples.retain(|s| s.t <= t_max);
    }
}

/// A loaded workout: session metadata plus every non-empty series.
#[derive(Debug, Clone)]
pub struct Workout {
    pub session: Session,
    pub series: BTreeMap<Metric, Series>,
}

impl Workout {
    pub fn get(&self, metric: Metric) -> Option<&Series> {
        self.series.get(&metric)
    }

    /// Total number of samples across all series.
    pub fn sample_count(&self) -> usize {
        self.series.values().map(Series::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_series_keeps_last_duplicate() {
        let series = Series::from_pairs(
            Metric::Power,
            vec![(0.0, 100.0), (1.0, 110.0), (1.0, 120.0), (2.0, 130.0)],
        );
        assert_eq!(series.times(), vec![0.0, 1.0, 2.0]);
        assert_eq!(series.values(), vec![100.0, 120.0, 130.0]);
    }

    #[test]
    fn test_series_merges_samples_within_a_millisecond() {
        let series = Series::from_pairs(
            Metric::Speed,
            vec![(0.0001, 2.0), (0.0002, 2.5), (0.0016, 3.0), (1.0004, 3.5)],
        );
        assert_eq!(series.times(), vec![0.0, 0.002, 1.0]);
        assert_eq!(series.values(), vec![2.5, 3.0, 3.5]);
    }

    #[test]
    fn test_series_sorts_out_of_order_samples() {
        let series = Series::from_pairs(Metric::Cadence, vec![(2.0, 90.0), (0.0, 80.0), (1.0, 85.0)]);
        assert_eq!(series.times(), vec![0.0, 1.0, 2.0]);
        assert_eq!(series.values(), vec![80.0, 85.0, 90.0]);
    }

    #[test]
    fn test_series_drops_non_finite() {
        let series = Series::from_pairs(
            Metric::Speed,
            vec![(0.0, 1.0), (f64::NAN, 2.0), (2.0, f64::INFINITY), (3.0, 4.0)],
        );
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_truncate_after() {
        let mut series = Series::from_pairs(Metric::Speed, (0..10).map(|i| (i as f64, 1.0)));
        series.truncate_after(4.0);
        assert_eq!(series.len(), 5);
    }

    #[test]
    fn test_metric_from_descriptor() {
        assert_eq!(Metric::from_descriptor("Rpm"), Some(Metric::Cadence));
        assert_eq!(Metric::from_descriptor("HDistance"), Some(Metric::Distance));
        assert_eq!(Metric::from_descriptor("Speed"), Some(Metric::Speed));
        assert_eq!(Metric::from_descriptor("Level"), None);
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("heart-rate".parse::<Metric>(), Ok(Metric::HeartRate));
        assert_eq!("speed".parse::<Metric>(), Ok(Metric::Speed));
        assert!("watts_per_kg".parse::<Metric>().is_err());
    }

    #[test]
    fn test_activity_type_from_str() {
        assert_eq!("cycling".parse::<ActivityType>(), Ok(ActivityType::Biking));
        assert_eq!("Run".parse::<ActivityType>(), Ok(ActivityType::Running));
        assert_eq!("rowing".parse::<ActivityType>(), Ok(ActivityType::Other));
    }

    #[test]
    fn test_session_sport_follows_activity() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap();
        let session = Session::new(start, ActivityType::Running);
        assert_eq!(session.sport(), "Running");
        assert_eq!(session.start_time(), start);
    }
}
