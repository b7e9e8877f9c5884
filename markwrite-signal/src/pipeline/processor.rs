//! Series Processing Pipeline
//!
//! Runs the analysis stages over a series and stores the result as its
//! derived channels:
//!
//! ```text
//! raw samples ──▶ smoothing ──▶ velocity ──┐
//!      │                                   ├──▶ DerivedChannels
//!      └────────▶ state classifier ────────┘
//! ```
//!
//! A run either replaces every derived channel or leaves the series untouched.

use crate::analysis::classifier::{classify_series, DEFAULT_MAX_SAMPLE_GAP};
use crate::analysis::smoothing::{KernelChoice, KernelPolicy, SmoothingStage};
use crate::analysis::velocity::{VelocityEstimator, VelocitySource};
use crate::app::config::Config;
use crate::series::{DerivedChannels, Sample, Series};
use std::thread;
use tracing::{debug, info, warn};

/// Processing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessorConfig {
    pub policy: KernelPolicy,
    pub velocity_source: VelocitySource,
    /// Longest inter-sample interval that is not a stream break (seconds)
    pub max_sample_gap: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            policy: KernelPolicy::default(),
            velocity_source: VelocitySource::default(),
            max_sample_gap: DEFAULT_MAX_SAMPLE_GAP,
        }
    }
}

impl From<&Config> for ProcessorConfig {
    fn from(config: &Config) -> Self {
        Self {
            policy: config.filter.policy(),
            velocity_source: config.velocity.source,
            max_sample_gap: config.classifier.max_sample_gap_secs,
        }
    }
}

/// What a processing run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub samples: usize,
    pub filter_kernel: KernelChoice,
    pub velocity_kernel: KernelChoice,
}

/// Full processing pipeline for one configuration
#[derive(Debug, Clone)]
pub struct SeriesProcessor {
    config: ProcessorConfig,
    stage: SmoothingStage,
    velocity: VelocityEstimator,
}

impl SeriesProcessor {
    /// Build the pipeline. Fails if the kernel configuration is invalid.
    pub fn new(config: ProcessorConfig) -> crate::Result<Self> {
        if !(config.max_sample_gap.is_finite() && config.max_sample_gap > 0.0) {
            return Err(crate::Error::InvalidParameter(format!(
                "max_sample_gap must be positive, got {}",
                config.max_sample_gap
            )));
        }
        let stage = SmoothingStage::new(config.policy)?;
        let velocity = VelocityEstimator::new(stage.clone(), config.velocity_source);
        Ok(Self {
            config,
            stage,
            velocity,
        })
    }

    pub fn from_config(config: &Config) -> crate::Result<Self> {
        Self::new(ProcessorConfig::from(config))
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Compute derived channels for raw samples without touching any series
    pub fn compute(&self, samples: &[Sample]) -> crate::Result<(DerivedChannels, ProcessOutcome)> {
        if samples.is_empty() {
            return Err(crate::Error::EmptyInput("series processing"));
        }

        let x: Vec<f64> = samples.iter().map(|s| s.x).collect();
        let y: Vec<f64> = samples.iter().map(|s| s.y).collect();
        let pressure: Vec<f64> = samples.iter().map(|s| s.pressure).collect();

        let filtered = self.stage.filter_channels(&x, &y, &pressure)?;
        let velocity = self.velocity.estimate(&filtered, &x, &y)?;
        let sample_state = classify_series(samples, self.config.max_sample_gap);

        let outcome = ProcessOutcome {
            samples: samples.len(),
            filter_kernel: filtered.kernel,
            velocity_kernel: velocity.kernel,
        };

        let derived = DerivedChannels {
            x_filtered: filtered.x,
            y_filtered: filtered.y,
            pressure_filtered: filtered.pressure,
            x_velocity: velocity.x,
            y_velocity: velocity.y,
            xy_velocity: velocity.xy,
            sample_state,
        };

        Ok((derived, outcome))
    }

    /// Process a series in place
    pub fn process(&self, series: &mut Series) -> crate::Result<ProcessOutcome> {
        let (derived, outcome) = self.compute(series.samples())?;
        series.set_derived(derived)?;
        debug!(
            samples = outcome.samples,
            filter = ?outcome.filter_kernel,
            "processed series"
        );
        Ok(outcome)
    }

    /// Process independent series concurrently.
    ///
    /// Each series is owned by exactly one worker; results come back in input order.
    pub fn process_batch(&self, batch: &mut [Series]) -> Vec<crate::Result<ProcessOutcome>> {
        if batch.is_empty() {
            return Vec::new();
        }

        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(batch.len());
        let chunk_size = batch.len().div_ceil(workers);

        let results: Vec<crate::Result<ProcessOutcome>> = thread::scope(|scope| {
            let handles: Vec<_> = batch
                .chunks_mut(chunk_size)
                .map(|chunk| {
                    let len = chunk.len();
                    let handle = scope.spawn(move || chunk.iter_mut().map(|s| self.process(s)).collect::<Vec<_>>());
                    (len, handle)
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|(len, h)| match h.join() {
                    Ok(results) => results,
                    Err(_) => (0..len)
                        .map(|_| Err(crate::Error::Analysis("worker thread panicked".to_string())))
                        .collect(),
                })
                .collect()
        });

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!(failed, total = batch.len(), "some series failed to process");
        }
        info!(total = batch.len(), workers, "processed batch");

        results
    }
}

impl Default for SeriesProcessor {
    fn default() -> Self {
        // Default kernels are always valid
        Self::new(ProcessorConfig::default()).expect("default processor config is valid")
    }
}
