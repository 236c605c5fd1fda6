//! Alignment of irregular series onto a shared time base.

pub mod aligner;
pub mod interpolate;

pub use aligner::{align, select_primary, AlignOptions, AlignedRow};
pub use interpolate::{resample, Interpolant, InterpolationMethod};
