//! Projection of aligned rows into TCX trackpoints.

use super::types::{LapSummary, Trackpoint};
use crate::align::AlignedRow;
use crate::error::{ConvertError, ConvertResult};
use crate::session::Session;
use chrono::{DateTime, TimeDelta, Utc};
use std::ops::RangeInclusive;

/// Options for building trackpoints.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Accepted ratio between device-reported and speed-integrated distance
    pub distance_correction: RangeInclusive<f64>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            distance_correction: 0.94..=1.06,
        }
    }
}

/// Absolute time of a row, or an error when it falls outside chrono's range.
fn row_time(session: &Session, t: f64) -> ConvertResult<DateTime<Utc>> {
    let millis = (t * 1000.0).round();
    let offset = (millis.abs() <= i64::MAX as f64)
        .then(|| TimeDelta::try_milliseconds(millis as i64))
        .flatten();
    offset
        .and_then(|offset| session.start_time().checked_add_signed(offset))
        .ok_or_else(|| {
            ConvertError::MalformedInput(format!("sample time {} s is out of range", t))
        })
}

/// Build one trackpoint per aligned row.
pub fn build_trackpoints(
    session: &Session,
    rows: &[AlignedRow],
    options: &BuildOptions,
) -> ConvertResult<Vec<Trackpoint>> {
    let distances = if rows.iter().any(|r| r.distance.is_some()) {
        corrected_distance(rows, &options.distance_correction)
    } else {
        cumulative_distance(rows)
    };

    rows.iter()
        .zip(distances)
        .map(|(row, distance_meters)| {
            Ok(Trackpoint {
                time: row_time(session, row.t)?,
                position: row.latitude.zip(row.longitude),
                altitude_meters: row.elevation,
                distance_meters,
                heart_rate_bpm: row.heart_rate.map(to_u8),
                cadence_rpm: row.cadence.map(to_u8),
                power_watts: row.power.map(to_u16),
                speed_mps: row.speed,
            })
        })
        .collect()
}

/// Cumulative distance integrated from speed, starting at 0.
///
/// Each interval uses the speed at its start (`speed[i-1]`), not the speed
/// at its end as in `distance[i-1] + speed[i] * dt`. This is deliberate: with
/// speeds 2.0, 2.5, 3.0 at t = 0, 5, 10 the distance at t = 10 is
/// `2.0*5 + 2.5*5 = 22.5`. Missing or negative speed contributes nothing, so
/// the result never decreases.
pub fn cumulative_distance(rows: &[AlignedRow]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(rows.len());
    let mut total = 0.0;
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            let prev = &rows[i - 1];
            let speed = prev.speed.unwrap_or(0.0).max(0.0);
            total += speed * (row.t - prev.t);
        }
        distances.push(total);
    }
    distances
}

/// Speed-integrated distance rescaled to match the device odometer.
///
/// Device distance tends to be coarse (whole-meter steps at a few seconds'
/// resolution), which turns into a sawtooth speed graph once imported. The
/// integrated curve is smooth; scaling it keeps the reported total.
fn corrected_distance(rows: &[AlignedRow], accepted: &RangeInclusive<f64>) -> Vec<f64> {
    tracing::info!("Calculating smoothed distances");

    let integrated = cumulative_distance(rows);
    let first = rows.iter().find_map(|r| r.distance).unwrap_or(0.0);
    let last = rows.iter().rev().find_map(|r| r.distance).unwrap_or(first);
    let total = integrated.last().copied().unwrap_or(0.0);

    if total <= 0.0 {
        tracing::warn!("No speed to integrate; using device distance");
        return device_distance(rows, first);
    }

    let factor = (last - first) / total;
    if !accepted.contains(&factor) {
        tracing::warn!(
            "Distance correction factor {:.4} outside {:.2}..={:.2}; using device distance",
            factor,
            accepted.start(),
            accepted.end()
        );
        return device_distance(rows, first);
    }

    tracing::info!("Distance correction factor is {:.4}", factor);
    integrated.into_iter().map(|d| first + d * factor).collect()
}

/// Device distance, carried forward over gaps and forced non-decreasing.
fn device_distance(rows: &[AlignedRow], first: f64) -> Vec<f64> {
    let mut current = first;
    rows.iter()
        .map(|row| {
            if let Some(d) = row.distance {
                current = current.max(d);
            }
            current
        })
        .collect()
}

fn to_u8(value: f64) -> u8 {
    value.round().clamp(0.0, u8::MAX as f64) as u8
}

fn to_u16(value: f64) -> u16 {
    value.round().clamp(0.0, u16::MAX as f64) as u16
}

fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Compute lap summary values from the trackpoints.
pub fn summarize(trackpoints: &[Trackpoint]) -> LapSummary {
    let (Some(first), Some(last)) = (trackpoints.first(), trackpoints.last()) else {
        return LapSummary::default();
    };

    let heart_rates = || trackpoints.iter().filter_map(|tp| tp.heart_rate_bpm);
    let powers = || trackpoints.iter().filter_map(|tp| tp.power_watts);

    LapSummary {
        total_time_seconds: (last.time - first.time).num_milliseconds() as f64 / 1000.0,
        total_distance_meters: last.distance_meters,
        max_speed_mps: trackpoints
            .iter()
            .filter_map(|tp| tp.speed_mps)
            .reduce(f64::max),
        avg_heart_rate_bpm: mean(heart_rates().map(f64::from)).map(to_u8),
        max_heart_rate_bpm: heart_rates().max(),
        avg_cadence_rpm: mean(trackpoints.iter().filter_map(|tp| tp.cadence_rpm).map(f64::from))
            .map(to_u8),
        avg_power_watts: mean(powers().map(f64::from)).map(to_u16),
        max_power_watts: powers().max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ActivityType;
    use chrono::TimeZone;

    fn session() -> Session {
        Session::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap(),
            ActivityType::Biking,
        )
    }

    fn row(t: f64, speed: f64) -> AlignedRow {
        AlignedRow {
            speed: Some(speed),
            ..AlignedRow::new(t)
        }
    }

    #[test]
    fn test_cumulative_distance_scenario() {
        let rows = vec![row(0.0, 2.0), row(5.0, 2.5), row(10.0, 3.0)];
        let distances = cumulative_distance(&rows);
        assert_eq!(distances, vec![0.0, 10.0, 22.5]);
    }

    #[test]
    fn test_negative_speed_never_decreases_distance() {
        let rows = vec![row(0.0, 2.0), row(1.0, -5.0), row(2.0, 1.0), row(3.0, 0.0)];
        let distances = cumulative_distance(&rows);
        assert!(distances.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_trackpoint_projection() {
        let rows = vec![AlignedRow {
            heart_rate: Some(129.6),
            cadence: Some(84.4),
            power: Some(201.5),
            latitude: Some(45.5),
            longitude: None,
            ..row(1.5, 2.0)
        }];
        let tps = build_trackpoints(&session(), &rows, &BuildOptions::default()).unwrap();
        assert_eq!(tps.len(), 1);
        let tp = &tps[0];
        assert_eq!(tp.heart_rate_bpm, Some(130));
        assert_eq!(tp.cadence_rpm, Some(84));
        assert_eq!(tp.power_watts, Some(202));
        assert_eq!(tp.position, None);
        assert_eq!(
            tp.time,
            Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 1).unwrap() + TimeDelta::milliseconds(500)
        );
    }

    #[test]
    fn test_distance_corrected_to_device_total() {
        // Integrated: 0, 10, 20, 30; device reports 31 over the same span
        let rows: Vec<AlignedRow> = [0.0, 10.0, 20.0, 31.0]
            .iter()
            .enumerate()
            .map(|(i, d)| AlignedRow {
                distance: Some(*d),
                ..row(i as f64 * 5.0, 2.0)
            })
            .collect();
        let tps = build_trackpoints(&session(), &rows, &BuildOptions::default()).unwrap();
        let last = tps.last().unwrap().distance_meters;
        assert!((last - 31.0).abs() < 1e-9);
        assert!((tps[1].distance_meters - 10.0 * 31.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_falls_back_when_factor_out_of_range() {
        let rows: Vec<AlignedRow> = [0.0, 50.0, 40.0, 100.0]
            .iter()
            .enumerate()
            .map(|(i, d)| AlignedRow {
                distance: Some(*d),
                ..row(i as f64 * 5.0, 2.0)
            })
            .collect();
        let tps = build_trackpoints(&session(), &rows, &BuildOptions::default()).unwrap();
        let distances: Vec<f64> = tps.iter().map(|tp| tp.distance_meters).collect();
        assert_eq!(distances, vec![0.0, 50.0, 50.0, 100.0]);
    }

    #[test]
    fn test_time_out_of_chrono_range_is_error() {
        for t in [1e15, -1e15, 1e300] {
            let rows = vec![row(0.0, 2.0), row(t, 2.0)];
            let result = build_trackpoints(&session(), &rows, &BuildOptions::default());
            assert!(matches!(result, Err(ConvertError::MalformedInput(_))), "t={t}");
        }
    }

    #[test]
    fn test_summarize() {
        let rows: Vec<AlignedRow> = (0..4)
            .map(|i| AlignedRow {
                heart_rate: Some(120.0 + i as f64 * 10.0),
                power: if i == 0 { None } else { Some(200.0) },
                ..row(i as f64, 2.0 + i as f64)
            })
            .collect();
        let tps = build_trackpoints(&session(), &rows, &BuildOptions::default()).unwrap();
        let summary = summarize(&tps);
        assert_eq!(summary.total_time_seconds, 3.0);
        assert_eq!(summary.total_distance_meters, 2.0 + 3.0 + 4.0);
        assert_eq!(summary.max_speed_mps, Some(5.0));
        assert_eq!(summary.avg_heart_rate_bpm, Some(135));
        assert_eq!(summary.max_heart_rate_bpm, Some(150));
        assert_eq!(summary.avg_power_watts, Some(200));
        assert_eq!(summary.avg_cadence_rpm, None);
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize(&[]), LapSummary::default());
    }
}
