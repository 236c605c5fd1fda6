//! Resampling of every series onto the primary time base.

use super::interpolate::{resample, InterpolationMethod};
use crate::error::{ConvertError, ConvertResult};
use crate::session::{Metric, Series};
use std::collections::BTreeMap;

/// Options for aligning series.
#[derive(Debug, Clone, Default)]
pub struct AlignOptions {
    /// Explicitly designated primary series
    pub primary: Option<Metric>,
    /// Method used for the heart-rate series
    pub heart_rate_method: InterpolationMethod,
}

/// One row of the aligned table, at a primary-series timestamp.
///
/// Fields without a covering series stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedRow {
    /// Seconds since session start
    pub t: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub heart_rate: Option<f64>,
    pub cadence: Option<f64>,
    pub power: Option<f64>,
    /// Speed in m/s
    pub speed: Option<f64>,
    /// Device-reported cumulative distance in meters
    pub distance: Option<f64>,
}

impl AlignedRow {
    /// Create an empty row at time `t`.
    pub fn new(t: f64) -> Self {
        Self {
            t,
            ..Default::default()
        }
    }

    fn slot(&mut self, metric: Metric) -> &mut Option<f64> {
        match metric {
            Metric::Speed => &mut self.speed,
            Metric::Latitude => &mut self.latitude,
            Metric::Longitude => &mut self.longitude,
            Metric::Elevation => &mut self.elevation,
            Metric::Distance => &mut self.distance,
            Metric::HeartRate => &mut self.heart_rate,
            Metric::Cadence => &mut self.cadence,
            Metric::Power => &mut self.power,
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Speed => self.speed,
            Metric::Latitude => self.latitude,
            Metric::Longitude => self.longitude,
            Metric::Elevation => self.elevation,
            Metric::Distance => self.distance,
            Metric::HeartRate => self.heart_rate,
            Metric::Cadence => self.cadence,
            Metric::Power => self.power,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        *self.slot(metric) = value;
    }
}

/// Pick the series whose timestamps become the shared time base.
///
/// A designated metric wins. Otherwise speed, then latitude, then whichever
/// series has the most samples.
pub fn select_primary(
    series: &BTreeMap<Metric, Series>,
    designated: Option<Metric>,
) -> ConvertResult<Metric> {
    if series.is_empty() {
        return Err(ConvertError::EmptySeries);
    }

    if let Some(metric) = designated {
        return match series.get(&metric) {
            Some(s) if !s.is_empty() => Ok(metric),
            _ => Err(ConvertError::MalformedInput(format!(
                "primary series '{}' is not present in the export",
                metric
            ))),
        };
    }

    for preferred in [Metric::Speed, Metric::Latitude] {
        if series.get(&preferred).is_some_and(|s| !s.is_empty()) {
            return Ok(preferred);
        }
    }

    // BTreeMap iterates in declaration order; strict comparison keeps the first on ties
    series
        .iter()
        .fold(None::<(Metric, usize)>, |best, (metric, s)| match best {
            Some((_, len)) if len >= s.len() => best,
            _ => Some((*metric, s.len())),
        })
        .map(|(metric, _)| metric)
        .ok_or(ConvertError::EmptySeries)
}

/// Interpolation method for a given metric.
fn method_for(metric: Metric, options: &AlignOptions) -> InterpolationMethod {
    match metric {
        Metric::HeartRate => options.heart_rate_method,
        _ => InterpolationMethod::Linear,
    }
}

/// Align every series onto the timestamps of the primary series.
///
/// Returns the chosen primary metric and one row per primary sample.
pub fn align(
    series: &BTreeMap<Metric, Series>,
    options: &AlignOptions,
) -> ConvertResult<(Metric, Vec<AlignedRow>)> {
    let primary_metric = select_primary(series, options.primary)?;
    let primary = &series[&primary_metric];

    tracing::info!(
        "Aligning {} series onto {} ({} samples)",
        series.len(),
        primary_metric,
        primary.len()
    );

    let base = primary.times();
    let mut rows: Vec<AlignedRow> = primary
        .samples()
        .iter()
        .map(|sample| {
            let mut row = AlignedRow::new(sample.t);
            row.set(primary_metric, Some(sample.value));
            row
        })
        .collect();

    for (metric, secondary) in series {
        if *metric == primary_metric {
            continue;
        }
        let method = method_for(*metric, options);
        if *metric == Metric::HeartRate {
            tracing::info!("Interpolating heart rate ({}, {} samples)", method, secondary.len());
        }
        let values = resample(secondary, method, &base)?;
        for (row, value) in rows.iter_mut().zip(values) {
            row.set(*metric, value);
        }
    }

    Ok((primary_metric, rows))
}
