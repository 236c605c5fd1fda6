//! TCX output records.

use chrono::{DateTime, Utc};

/// A single TCX trackpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Trackpoint {
    /// Absolute sample time
    pub time: DateTime<Utc>,
    /// (latitude, longitude) in degrees, only when both are known
    pub position: Option<(f64, f64)>,
    /// Altitude in meters
    pub altitude_meters: Option<f64>,
    /// Cumulative distance in meters
    pub distance_meters: f64,
    /// Heart rate in BPM
    pub heart_rate_bpm: Option<u8>,
    /// Cadence in RPM
    pub cadence_rpm: Option<u8>,
    /// Instantaneous power in watts
    pub power_watts: Option<u16>,
    /// Speed in m/s
    pub speed_mps: Option<f64>,
}

/// Summary values written on the `<Lap>` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LapSummary {
    /// Elapsed time between first and last trackpoint
    pub total_time_seconds: f64,
    /// Distance at the last trackpoint
    pub total_distance_meters: f64,
    /// Maximum speed in m/s
    pub max_speed_mps: Option<f64>,
    pub avg_heart_rate_bpm: Option<u8>,
    pub max_heart_rate_bpm: Option<u8>,
    pub avg_cadence_rpm: Option<u8>,
    pub avg_power_watts: Option<u16>,
    pub max_power_watts: Option<u16>,
}
