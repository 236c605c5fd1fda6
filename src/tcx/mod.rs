//! TCX trackpoint building and document writing.

pub mod builder;
pub mod types;
pub mod writer;

pub use builder::{build_trackpoints, cumulative_distance, summarize, BuildOptions};
pub use types::{LapSummary, Trackpoint};
pub use writer::{default_output_path, format_time, render_tcx, write_tcx};
