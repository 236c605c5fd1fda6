//! End-to-end conversion: load, align, build, write.

use crate::align::{align, AlignOptions};
use crate::config::ConversionConfig;
use crate::error::ConvertResult;
use crate::session::{load_export, parse_export, ActivityType, LoadOptions, Metric, Session, Workout};
use crate::tcx::{build_trackpoints, summarize, write_tcx, BuildOptions, LapSummary, Trackpoint};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Per-run options: configuration plus command-line overrides.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub config: ConversionConfig,
    /// Start time override
    pub start_time: Option<DateTime<Utc>>,
    /// Activity type override
    pub activity_type: Option<ActivityType>,
    /// Primary series override
    pub primary: Option<Metric>,
}

impl ConvertOptions {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            start_time: self.start_time,
            activity_type: self.activity_type,
            default_activity: self.config.sport,
            trim_trailing_idle: self.config.trim_trailing_idle,
        }
    }

    fn align_options(&self) -> AlignOptions {
        AlignOptions {
            primary: self.primary.or(self.config.primary),
            heart_rate_method: self.config.heart_rate_interpolation,
        }
    }

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            distance_correction: self.config.distance_correction_min
                ..=self.config.distance_correction_max,
        }
    }
}

/// The in-memory result of a conversion, ready to be written.
#[derive(Debug, Clone)]
pub struct Activity {
    pub session: Session,
    pub primary: Metric,
    pub summary: LapSummary,
    pub trackpoints: Vec<Trackpoint>,
}

/// Summary of a completed file conversion.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub output: PathBuf,
    pub primary: Metric,
    pub trackpoints: usize,
    pub summary: LapSummary,
}

/// Align and project an already-loaded workout.
pub fn convert_workout(workout: &Workout, options: &ConvertOptions) -> ConvertResult<Activity> {
    let (primary, rows) = align(&workout.series, &options.align_options())?;
    let trackpoints = build_trackpoints(&workout.session, &rows, &options.build_options())?;
    let summary = summarize(&trackpoints);

    Ok(Activity {
        session: workout.session.clone(),
        primary,
        summary,
        trackpoints,
    })
}

/// Convert export JSON text into an activity.
pub fn convert_str(json: &str, options: &ConvertOptions) -> ConvertResult<Activity> {
    let workout = parse_export(json, &options.load_options())?;
    convert_workout(&workout, options)
}

/// Convert an export file and write the TCX document to `output`.
pub fn convert_file(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> ConvertResult<ConversionReport> {
    let workout = load_export(input, &options.load_options())?;
    let activity = convert_workout(&workout, options)?;

    write_tcx(
        output,
        &activity.session,
        &activity.summary,
        &activity.trackpoints,
    )?;

    tracing::info!(
        "Wrote {} trackpoints ({:.1} m) to {}",
        activity.trackpoints.len(),
        activity.summary.total_distance_meters,
        output.display()
    );

    Ok(ConversionReport {
        output: output.to_path_buf(),
        primary: activity.primary,
        trackpoints: activity.trackpoints.len(),
        summary: activity.summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;
    use chrono::TimeZone;

    fn options() -> ConvertOptions {
        ConvertOptions {
            start_time: Some(Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_cli_primary_overrides_config() {
        let mut opts = options();
        opts.config.primary = Some(Metric::Speed);
        opts.primary = Some(Metric::Power);
        assert_eq!(opts.align_options().primary, Some(Metric::Power));
    }

    #[test]
    fn test_convert_str_uses_primary_time_base() {
        let json = r#"{"data": {"analitics": {
            "descriptor": [{"pr": {"name": "Speed", "um": "m/s"}}, {"pr": {"name": "Power"}}],
            "samples": [
                {"t": 0, "vs": [2.0, 100]},
                {"t": 5, "vs": [2.5, null]},
                {"t": 10, "vs": [3.0, 200]}
            ],
            "hr": [{"t": 0, "hr": 120}, {"t": 10, "hr": 140}]
        }}}"#;
        let activity = convert_str(json, &options()).unwrap();
        assert_eq!(activity.primary, Metric::Speed);
        assert_eq!(activity.trackpoints.len(), 3);
        assert_eq!(activity.trackpoints[1].heart_rate_bpm, Some(130));
        assert_eq!(activity.trackpoints[1].power_watts, Some(150));
        assert!((activity.trackpoints[2].distance_meters - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_convert_str_single_hr_sample() {
        let json = r#"{"data": {"analitics": {
            "descriptor": [{"pr": {"name": "Speed"}}],
            "samples": [{"t": 0, "vs": [20]}, {"t": 1, "vs": [21]}],
            "hr": [{"t": 0, "hr": 120}]
        }}}"#;
        let err = convert_str(json, &options()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::InsufficientSamples {
                metric: Metric::HeartRate,
                ..
            }
        ));
    }
}
