//! Processing Pipeline
//!
//! Orchestrates the analysis stages over whole series.

pub mod processor;

pub use processor::{ProcessOutcome, ProcessorConfig, SeriesProcessor};
