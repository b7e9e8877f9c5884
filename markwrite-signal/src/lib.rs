//! # MarkWrite Signal
//!
//! Signal processing for digitized pen/tablet writing samples. Raw
//! `(time, x, y, pressure)` reports are smoothed, differentiated and labelled
//! so a trial can be segmented into pen-down runs and strokes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use markwrite_signal::{Sample, Series, SeriesProcessor};
//! use markwrite_signal::analysis::StrokeSegmenter;
//!
//! let samples: Vec<Sample> = (0..50)
//!     .map(|i| Sample::new(i as f64 * 0.005, i as f64, 0.0, 0.4))
//!     .collect();
//! let mut series = Series::new(samples).expect("time-ordered samples");
//!
//! let processor = SeriesProcessor::default();
//! processor.process(&mut series).expect("non-empty series");
//!
//! let derived = series.derived().expect("just processed");
//! println!("speed at sample 10: {}", derived.xy_velocity[10]);
//!
//! let segmentation = StrokeSegmenter::new().analyze(&series).expect("processed");
//! println!("{} strokes", segmentation.strokes.len());
//! ```
//!
//! ## Architecture
//!
//! - [`series`]: samples, sample-state flags, series with cached derived channels
//! - [`analysis`]: region scanning, state classification, smoothing, velocity, segmentation
//! - [`pipeline`]: runs the stages over one series or a batch
//! - [`io`]: JSON trial files and tab-delimited tables
//! - [`app`]: CLI and configuration management
//!
//! ## Processing Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ Raw samples │───▶│  Smoothing  │───▶│  Velocity   │──┐
//! │ t, x, y, p  │    │ (Sav-Golay) │    │  estimator  │  │   ┌─────────────┐
//! └─────────────┘    └─────────────┘    └─────────────┘  ├──▶│   Derived   │
//!        │           ┌─────────────┐                     │   │  channels   │
//!        └──────────▶│    State    │─────────────────────┘   └─────────────┘
//!                    │  classifier │                                │
//!                    └─────────────┘                                ▼
//!                                                   regions / strokes queries
//! ```

pub mod series;
pub mod analysis;
pub mod pipeline;
pub mod io;
pub mod app;

// Re-export commonly used types
pub use series::{DerivedChannels, Sample, SampleState, Series, StateFlag};
pub use pipeline::{ProcessorConfig, SeriesProcessor};

/// Result type alias for signal processing
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for signal processing
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Empty input: {0} needs at least one sample")]
    EmptyInput(&'static str),

    #[error("Samples out of time order at index {index}: {current} follows {previous}")]
    UnorderedSamples {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("Invalid sample at index {index}: {message}")]
    InvalidSample { index: usize, message: String },

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
