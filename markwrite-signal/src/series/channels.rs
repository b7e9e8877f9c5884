//! Series and Derived Channels
//!
//! A [`Series`] owns the raw samples of one trial plus the derived channels
//! computed from them. Derived channels are a cache: any change to the raw
//! samples drops them.

use super::sample::Sample;
use super::state::SampleState;
use serde::{Deserialize, Serialize};

/// Per-sample projections aligned index-for-index with the raw samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedChannels {
    pub x_filtered: Vec<f64>,
    pub y_filtered: Vec<f64>,
    pub pressure_filtered: Vec<f64>,
    /// Units per sample, not per second
    pub x_velocity: Vec<f64>,
    pub y_velocity: Vec<f64>,
    pub xy_velocity: Vec<f64>,
    pub sample_state: Vec<SampleState>,
}

impl DerivedChannels {
    /// Number of samples covered (taken from the filtered x channel)
    pub fn len(&self) -> usize {
        self.x_filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_filtered.is_empty()
    }

    /// True when every channel has exactly `n` entries
    pub fn is_aligned_with(&self, n: usize) -> bool {
        self.x_filtered.len() == n
            && self.y_filtered.len() == n
            && self.pressure_filtered.len() == n
            && self.x_velocity.len() == n
            && self.y_velocity.len() == n
            && self.xy_velocity.len() == n
            && self.sample_state.len() == n
    }
}

/// One trial's ordered sample sequence
#[derive(Debug, Clone, Default)]
pub struct Series {
    samples: Vec<Sample>,
    derived: Option<DerivedChannels>,
}

impl Series {
    /// Create a series, checking every sample and that time never decreases.
    pub fn new(samples: Vec<Sample>) -> crate::Result<Self> {
        check_samples(&samples, None, 0)?;
        Ok(Self {
            samples,
            derived: None,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append one sample. Invalidates derived channels.
    pub fn push(&mut self, sample: Sample) -> crate::Result<()> {
        check_samples(&[sample], self.samples.last(), self.samples.len())?;
        self.samples.push(sample);
        self.derived = None;
        Ok(())
    }

    /// Append a batch of samples. Invalidates derived channels.
    ///
    /// The batch is validated before anything is appended.
    pub fn extend(&mut self, batch: &[Sample]) -> crate::Result<()> {
        check_samples(batch, self.samples.last(), self.samples.len())?;

        self.samples.extend_from_slice(batch);
        self.derived = None;
        Ok(())
    }

    /// Replace all raw samples. Invalidates derived channels.
    pub fn replace_samples(&mut self, samples: Vec<Sample>) -> crate::Result<()> {
        check_samples(&samples, None, 0)?;
        self.samples = samples;
        self.derived = None;
        Ok(())
    }

    /// Derived channels, if computed for the current raw content
    pub fn derived(&self) -> Option<&DerivedChannels> {
        self.derived.as_ref()
    }

    /// Store freshly computed channels.
    ///
    /// Channels whose length doesn't match the raw samples are rejected and
    /// the previous cache is left untouched.
    pub fn set_derived(&mut self, derived: DerivedChannels) -> crate::Result<()> {
        if !derived.is_aligned_with(self.samples.len()) {
            return Err(crate::Error::InvalidParameter(format!(
                "derived channels do not align with {} samples",
                self.samples.len()
            )));
        }
        self.derived = Some(derived);
        Ok(())
    }

    pub fn clear_derived(&mut self) {
        self.derived = None;
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn xs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.y).collect()
    }

    pub fn pressures(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.pressure).collect()
    }

    /// Elapsed time between first and last sample (seconds)
    pub fn duration(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }
}

/// Validate `samples` as the continuation of a series ending in `previous`.
/// `offset` is the index of `samples[0]` in the full series.
///
/// Coordinates and time must be finite, pressure finite and non-negative.
fn check_samples(samples: &[Sample], previous: Option<&Sample>, offset: usize) -> crate::Result<()> {
    let mut last_time = previous.map(|p| p.time);

    for (i, sample) in samples.iter().enumerate() {
        let index = offset + i;
        let invalid = |message: String| crate::Error::InvalidSample { index, message };

        if !sample.time.is_finite() {
            return Err(invalid(format!("time must be finite, got {}", sample.time)));
        }
        if !(sample.x.is_finite() && sample.y.is_finite()) {
            return Err(invalid(format!("position must be finite, got ({}, {})", sample.x, sample.y)));
        }
        if !(sample.pressure.is_finite() && sample.pressure >= 0.0) {
            return Err(invalid(format!("pressure must be finite and >= 0, got {}", sample.pressure)));
        }
        if let Some(prev) = last_time {
            if sample.time < prev {
                return Err(crate::Error::UnorderedSamples {
                    index,
                    previous: prev,
                    current: sample.time,
                });
            }
        }
        last_time = Some(sample.time);
    }
    Ok(())
}
