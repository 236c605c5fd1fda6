//! Interpolants over a single series.
//!
//! Linear interpolation for most metrics, and a monotone piecewise-cubic
//! Hermite interpolant (Fritsch-Carlson) for sparse signals such as heart
//! rate. Neither extrapolates: queries outside the sampled range yield `None`.

use crate::error::{ConvertError, ConvertResult};
use crate::session::Series;
use serde::{Deserialize, Serialize};

/// Interpolation method used to resample a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterpolationMethod {
    /// Piecewise linear
    #[default]
    Linear,
    /// Shape-preserving piecewise cubic (PCHIP)
    MonotoneCubic,
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpolationMethod::Linear => write!(f, "linear"),
            InterpolationMethod::MonotoneCubic => write!(f, "monotone-cubic"),
        }
    }
}

/// An interpolant built from a series. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Interpolant {
    times: Vec<f64>,
    values: Vec<f64>,
    /// Knot derivatives; only present for cubic interpolation
    slopes: Option<Vec<f64>>,
}

impl Interpolant {
    /// Build an interpolant. Requires at least two samples.
    pub fn new(series: &Series, method: InterpolationMethod) -> ConvertResult<Self> {
        if series.len() < 2 {
            return Err(ConvertError::InsufficientSamples {
                metric: series.metric(),
                count: series.len(),
            });
        }

        let times = series.times();
        let values = series.values();
        let slopes = match method {
            InterpolationMethod::Linear => None,
            InterpolationMethod::MonotoneCubic => Some(pchip_slopes(&times, &values)),
        };

        Ok(Self {
            times,
            values,
            slopes,
        })
    }

    /// Sampled time range `(first, last)`.
    pub fn domain(&self) -> (f64, f64) {
        (self.times[0], self.times[self.times.len() - 1])
    }

    /// Evaluate at `t`, or `None` when `t` lies outside the sampled range.
    pub fn eval(&self, t: f64) -> Option<f64> {
        let (first, last) = self.domain();
        if !(first..=last).contains(&t) {
            return None;
        }

        // Index of the first knot strictly after t
        let upper = self.times.partition_point(|&x| x <= t);
        let k = upper - 1;
        if self.times[k] == t || upper == self.times.len() {
            return Some(self.values[k]);
        }

        let (t0, t1) = (self.times[k], self.times[k + 1]);
        let (y0, y1) = (self.values[k], self.values[k + 1]);
        let h = t1 - t0;
        let s = (t - t0) / h;

        let value = match &self.slopes {
            None => y0 + (y1 - y0) * s,
            Some(slopes) => {
                let s2 = s * s;
                let s3 = s2 * s;
                let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
                let h10 = s3 - 2.0 * s2 + s;
                let h01 = -2.0 * s3 + 3.0 * s2;
                let h11 = s3 - s2;
                h00 * y0 + h10 * h * slopes[k] + h01 * y1 + h11 * h * slopes[k + 1]
            }
        };
        Some(value)
    }
}

/// Resample `series` at each query timestamp.
pub fn resample(
    series: &Series,
    method: InterpolationMethod,
    query: &[f64],
) -> ConvertResult<Vec<Option<f64>>> {
    let interpolant = Interpolant::new(series, method)?;
    Ok(query.iter().map(|&t| interpolant.eval(t)).collect())
}

/// Fritsch-Carlson knot derivatives with the three-point end conditions.
fn pchip_slopes(times: &[f64], values: &[f64]) -> Vec<f64> {
    let n = times.len();
    let h: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = values
        .windows(2)
        .zip(&h)
        .map(|(w, h)| (w[1] - w[0]) / h)
        .collect();

    if n == 2 {
        return vec![delta[0], delta[0]];
    }

    let mut slopes = vec![0.0; n];
    for k in 1..n - 1 {
        let (d0, d1) = (delta[k - 1], delta[k]);
        if d0 * d1 <= 0.0 {
            continue;
        }
        // Weighted harmonic mean keeps each segment monotone
        let w1 = 2.0 * h[k] + h[k - 1];
        let w2 = h[k] + 2.0 * h[k - 1];
        slopes[k] = (w1 + w2) / (w1 / d0 + w2 / d1);
    }

    slopes[0] = end_slope(h[0], h[1], delta[0], delta[1]);
    slopes[n - 1] = end_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    slopes
}

fn end_slope(h0: f64, h1: f64, d0: f64, d1: f64) -> f64 {
    let m = ((2.0 * h0 + h1) * d0 - h0 * d1) / (h0 + h1);
    if m.signum() != d0.signum() || d0 == 0.0 {
        0.0
    } else if d0.signum() != d1.signum() && m.abs() > 3.0 * d0.abs() {
        3.0 * d0
    } else {
        m
    }
}
