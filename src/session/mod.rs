//! Workout export loading: session metadata and per-metric series.

pub mod loader;
pub mod types;

pub use loader::{load_export, parse_export, parse_start_time, LoadOptions};
pub use types::{ActivityType, Metric, Sample, Series, Session, Workout};
