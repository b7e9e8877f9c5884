//! Trial Segmentation Queries
//!
//! Splits a processed series into the units a reviewer works with:
//! - sample runs: spans of uninterrupted reporting (split at stream gaps)
//! - pressed runs: pen-down stretches
//! - hover runs: pen-up stretches
//! - strokes: pressed runs cut at local minima of planar speed

use super::regions::{contiguous_regions, Region};
use crate::series::{DerivedChannels, Sample, SampleState, Series, StateFlag};
use serde::{Deserialize, Serialize};

/// Pen-down runs (pressure > 0)
pub fn pressed_runs(samples: &[Sample]) -> Vec<Region> {
    let mask: Vec<bool> = samples.iter().map(Sample::is_pressed).collect();
    contiguous_regions(&mask)
}

/// Pen-up runs (pressure == 0)
pub fn hover_runs(samples: &[Sample]) -> Vec<Region> {
    let mask: Vec<bool> = samples.iter().map(Sample::is_hovering).collect();
    contiguous_regions(&mask)
}

/// Spans of continuous reporting. A new span starts at every sample flagged
/// `FIRST_ENTER`; together the spans cover the whole series.
pub fn sample_runs(states: &[SampleState]) -> Vec<Region> {
    let mut starts: Vec<usize> = states
        .iter()
        .enumerate()
        .filter(|(_, s)| s.contains(StateFlag::FirstEnter))
        .map(|(i, _)| i)
        .collect();

    if states.is_empty() {
        return Vec::new();
    }
    // States not produced by the classifier may lack the leading flag
    if starts.first() != Some(&0) {
        starts.insert(0, 0);
    }

    let mut runs = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let stop = starts.get(i + 1).copied().unwrap_or(states.len());
        runs.push(Region::new(start, stop));
    }
    runs
}

/// One stroke: a pressed stretch between two speed minima
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub region: Region,
    /// Peak planar speed (units per sample)
    pub peak_velocity: f64,
    pub avg_velocity: f64,
    /// Seconds between first and last sample
    pub duration: f64,
    /// Raw path length over the stroke
    pub path_length: f64,
}

/// Segmentation of one processed series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub sample_runs: Vec<Region>,
    pub pressed_runs: Vec<Region>,
    pub hover_runs: Vec<Region>,
    pub strokes: Vec<Stroke>,
}

/// Stroke segmentation engine
#[derive(Debug, Clone)]
pub struct StrokeSegmenter {
    /// Strokes shorter than this are merged into their neighbour
    pub min_stroke_samples: usize,
}

impl StrokeSegmenter {
    pub fn new() -> Self {
        Self {
            min_stroke_samples: 3,
        }
    }

    pub fn with_min_stroke_samples(min_stroke_samples: usize) -> Self {
        Self {
            min_stroke_samples: min_stroke_samples.max(1),
        }
    }

    /// Segment a series whose derived channels are up to date
    pub fn analyze(&self, series: &Series) -> crate::Result<Segmentation> {
        let derived = series.derived().ok_or_else(|| {
            crate::Error::InvalidParameter("series has no derived channels; run the pipeline first".to_string())
        })?;
        self.analyze_channels(series.samples(), derived)
    }

    /// Segment raw samples against channels computed for them
    pub fn analyze_channels(&self, samples: &[Sample], derived: &DerivedChannels) -> crate::Result<Segmentation> {
        if !derived.is_aligned_with(samples.len()) {
            return Err(crate::Error::InvalidParameter(format!(
                "derived channels do not align with {} samples",
                samples.len()
            )));
        }

        let pressed = pressed_runs(samples);
        let strokes = pressed
            .iter()
            .flat_map(|run| self.split_run(*run, samples, &derived.xy_velocity))
            .collect();

        Ok(Segmentation {
            sample_runs: sample_runs(&derived.sample_state),
            hover_runs: hover_runs(samples),
            pressed_runs: pressed,
            strokes,
        })
    }

    /// Cut one pressed run at local speed minima
    fn split_run(&self, run: Region, samples: &[Sample], speed: &[f64]) -> Vec<Stroke> {
        let mut cuts = vec![run.start];
        for i in run.start + 1..run.stop.saturating_sub(1) {
            let is_minimum = speed[i] < speed[i - 1] && speed[i] <= speed[i + 1];
            let last = *cuts.last().unwrap_or(&run.start);
            if is_minimum && i - last >= self.min_stroke_samples && run.stop - i >= self.min_stroke_samples {
                cuts.push(i);
            }
        }
        cuts.push(run.stop);

        cuts.windows(2)
            .map(|w| self.create_stroke(Region::new(w[0], w[1]), samples, speed))
            .collect()
    }

    fn create_stroke(&self, region: Region, samples: &[Sample], speed: &[f64]) -> Stroke {
        let span = &speed[region.range()];
        let peak_velocity = span.iter().copied().fold(0.0, f64::max);
        let avg_velocity = if span.is_empty() {
            0.0
        } else {
            span.iter().sum::<f64>() / span.len() as f64
        };

        let points = &samples[region.range()];
        let duration = match (points.first(), points.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        };
        let path_length = points.windows(2).map(|w| w[0].distance_to(&w[1])).sum();

        Stroke {
            region,
            peak_velocity,
            avg_velocity,
            duration,
            path_length,
        }
    }
}

impl Default for StrokeSegmenter {
    fn default() -> Self {
        Self::new()
    }
}
