//! wellness2tcx - MyWellness workout export to TCX converter
//!
//! Loads a workout-session JSON export, aligns its irregular series onto a
//! common time base and writes a Garmin TrainingCenterDatabase (TCX) file.

pub mod align;
pub mod config;
pub mod convert;
pub mod error;
pub mod session;
pub mod tcx;

// Re-export commonly used types
pub use config::{load_config, ConversionConfig};
pub use convert::{convert_file, convert_str, Activity, ConversionReport, ConvertOptions};
pub use error::{ConvertError, ConvertResult};
pub use session::{ActivityType, Metric, Series, Session};
