//! Pen signal analysis
//!
//! This module turns raw tablet samples into the derived channels used for
//! trial segmentation:
//! - Savitzky-Golay smoothing of position and pressure
//! - per-sample velocity estimation
//! - hover/press state classification
//! - contiguous region scanning and stroke segmentation

pub mod regions;
pub mod classifier;
pub mod smoothing;
pub mod velocity;
pub mod segmentation;

pub use regions::{contiguous_regions, Region};
pub use classifier::classify_series;
pub use smoothing::{KernelChoice, KernelPolicy, SavitzkyGolay, SmoothingStage};
pub use velocity::{VelocityEstimator, VelocitySource};
pub use segmentation::{Segmentation, Stroke, StrokeSegmenter};
