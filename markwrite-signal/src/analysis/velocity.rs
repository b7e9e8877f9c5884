//! Velocity Estimation
//!
//! Derives per-sample velocity from the position channels. Velocity is
//! expressed in position units per sample, not per second: the derivative
//! uses a spacing of one sample regardless of the actual time stamps.

use super::smoothing::{FilteredChannels, KernelChoice, SmoothingStage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which position channels the x/y velocity is differentiated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocitySource {
    #[default]
    Filtered,
    Raw,
}

/// Velocity channels aligned with the series
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityChannels {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Smoothed planar speed
    pub xy: Vec<f64>,
    /// Kernel used for the x/y derivatives
    pub kernel: KernelChoice,
}

/// Velocity estimator over the smoothing stage's kernels
#[derive(Debug, Clone)]
pub struct VelocityEstimator {
    stage: SmoothingStage,
    source: VelocitySource,
}

impl VelocityEstimator {
    pub fn new(stage: SmoothingStage, source: VelocitySource) -> Self {
        Self { stage, source }
    }

    pub fn source(&self) -> VelocitySource {
        self.source
    }

    /// Estimate velocities for one series.
    ///
    /// `raw_x`/`raw_y` are only read when the source is [`VelocitySource::Raw`].
    /// Index 0 of every output channel is 0.
    pub fn estimate(
        &self,
        filtered: &FilteredChannels,
        raw_x: &[f64],
        raw_y: &[f64],
    ) -> crate::Result<VelocityChannels> {
        let n = filtered.x.len();
        if n == 0 {
            return Err(crate::Error::EmptyInput("velocity estimation"));
        }
        if filtered.y.len() != n || raw_x.len() != n || raw_y.len() != n {
            return Err(crate::Error::InvalidParameter(format!(
                "channel lengths differ: filtered x={}, filtered y={}, raw x={}, raw y={}",
                n,
                filtered.y.len(),
                raw_x.len(),
                raw_y.len()
            )));
        }

        let xy = self.planar_speed(&filtered.x, &filtered.y)?;

        let (sx, sy) = match self.source {
            VelocitySource::Filtered => (filtered.x.as_slice(), filtered.y.as_slice()),
            VelocitySource::Raw => (raw_x, raw_y),
        };
        let (mut x, kernel) = self.stage.derivative(sx)?;
        let (mut y, _) = self.stage.derivative(sy)?;
        x[0] = 0.0;
        y[0] = 0.0;

        debug!(samples = n, ?kernel, source = ?self.source, "estimated velocity");

        Ok(VelocityChannels { x, y, xy, kernel })
    }

    /// Smoothed magnitude of the displacement between consecutive positions.
    /// `out[0] = 0`, `out[i]` is the (smoothed) step from `i-1` to `i`.
    fn planar_speed(&self, x: &[f64], y: &[f64]) -> crate::Result<Vec<f64>> {
        let steps: Vec<f64> = x
            .windows(2)
            .zip(y.windows(2))
            .map(|(wx, wy)| (wx[1] - wx[0]).hypot(wy[1] - wy[0]))
            .collect();
        let (smoothed, _) = self.stage.smooth(&steps)?;

        let mut out = Vec::with_capacity(x.len());
        out.push(0.0);
        out.extend(smoothed);
        Ok(out)
    }
}
