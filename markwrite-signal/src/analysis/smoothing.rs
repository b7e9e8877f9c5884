//! Savitzky-Golay Smoothing
//!
//! Local polynomial regression over a sliding window. The interior of the
//! signal uses the centred (zero-lag) kernel; the first and last half-window
//! samples are evaluated on the polynomial fitted to the first/last full
//! window, so output length always matches input length.
//!
//! Kernel size adapts to series length through [`KernelPolicy`]: long series
//! get the full kernel, medium series a reduced one, and very short series
//! are passed through unsmoothed.

use nalgebra::DMatrix;
use tracing::debug;

/// Default smoothing window (samples)
pub const DEFAULT_WINDOW: usize = 13;
/// Default polynomial order
pub const DEFAULT_ORDER: usize = 9;
/// Fallback window for series shorter than the default window
pub const REDUCED_WINDOW: usize = 5;
/// Fallback polynomial order
pub const REDUCED_ORDER: usize = 3;
/// Series need at least this many samples to use the fallback kernel
pub const REDUCED_MIN_SAMPLES: usize = 11;

/// Singular values below this are treated as zero in the fit
const PINV_EPSILON: f64 = 1e-12;

/// Savitzky-Golay kernel for one (window, order) pair.
///
/// Weights for every evaluation position inside the window are precomputed,
/// so applying the filter is a plain dot product per sample.
#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window: usize,
    order: usize,
    /// `value_weights[s][j]`: weight of window sample j when evaluating at position s
    value_weights: Vec<Vec<f64>>,
    /// Same layout, first derivative with respect to sample index
    slope_weights: Vec<Vec<f64>>,
}

impl SavitzkyGolay {
    /// Build a kernel. `window` must be odd and `order < window`.
    pub fn new(window: usize, order: usize) -> crate::Result<Self> {
        validate_kernel(window, order)?;

        let half = window / 2;
        // Positions scaled into [-1, 1] keep the Vandermonde matrix well conditioned
        let scale = half.max(1) as f64;
        let position = |j: usize| (j as f64 - half as f64) / scale;

        let vandermonde = DMatrix::from_fn(window, order + 1, |j, k| position(j).powi(k as i32));
        let fit = vandermonde
            .pseudo_inverse(PINV_EPSILON)
            .map_err(|e| crate::Error::InvalidParameter(format!("kernel fit failed: {e}")))?;

        let mut value_weights = Vec::with_capacity(window);
        let mut slope_weights = Vec::with_capacity(window);
        for s in 0..window {
            let u = position(s);
            let mut values = vec![0.0; window];
            let mut slopes = vec![0.0; window];
            for (j, (value, slope)) in values.iter_mut().zip(slopes.iter_mut()).enumerate() {
                for k in 0..=order {
                    let coeff = fit[(k, j)];
                    *value += coeff * u.powi(k as i32);
                    if k >= 1 {
                        *slope += coeff * k as f64 * u.powi(k as i32 - 1);
                    }
                }
                *slope /= scale;
            }
            value_weights.push(values);
            slope_weights.push(slopes);
        }

        Ok(Self {
            window,
            order,
            value_weights,
            slope_weights,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Centred smoothing coefficients (the interior kernel)
    pub fn coefficients(&self) -> &[f64] {
        &self.value_weights[self.window / 2]
    }

    /// Smooth `data`. Requires `data.len() >= window`.
    pub fn smooth(&self, data: &[f64]) -> crate::Result<Vec<f64>> {
        self.convolve(data, &self.value_weights, 1.0)
    }

    /// First derivative of `data`, `delta` being the spacing between samples.
    /// Requires `data.len() >= window`.
    pub fn derivative(&self, data: &[f64], delta: f64) -> crate::Result<Vec<f64>> {
        if !(delta.is_finite() && delta > 0.0) {
            return Err(crate::Error::InvalidParameter(format!(
                "delta must be positive and finite, got {delta}"
            )));
        }
        self.convolve(data, &self.slope_weights, 1.0 / delta)
    }

    fn convolve(&self, data: &[f64], weights: &[Vec<f64>], gain: f64) -> crate::Result<Vec<f64>> {
        let n = data.len();
        if n < self.window {
            return Err(crate::Error::InvalidParameter(format!(
                "{} samples is shorter than window {}",
                n, self.window
            )));
        }

        let half = self.window / 2;
        let out = (0..n)
            .map(|i| {
                let (start, pos) = if i < half {
                    (0, i)
                } else if i + half >= n {
                    let start = n - self.window;
                    (start, i - start)
                } else {
                    (i - half, half)
                };
                let acc: f64 = weights[pos]
                    .iter()
                    .zip(&data[start..start + self.window])
                    .map(|(w, v)| w * v)
                    .sum();
                acc * gain
            })
            .collect();

        Ok(out)
    }
}

fn validate_kernel(window: usize, order: usize) -> crate::Result<()> {
    if window == 0 || window % 2 == 0 {
        return Err(crate::Error::InvalidParameter(format!(
            "window length must be a positive odd number, got {window}"
        )));
    }
    if order >= window {
        return Err(crate::Error::InvalidParameter(format!(
            "polynomial order {order} must be less than window length {window}"
        )));
    }
    Ok(())
}

/// Which kernel the policy picked for a given series length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelChoice {
    Full { window: usize, order: usize },
    Reduced { window: usize, order: usize },
    /// Too short for any kernel: copy raw values through
    Unsmoothed,
}

impl KernelChoice {
    pub fn is_smoothed(&self) -> bool {
        !matches!(self, KernelChoice::Unsmoothed)
    }
}

/// Series length to kernel size mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelPolicy {
    pub window: usize,
    pub order: usize,
    pub reduced_window: usize,
    pub reduced_order: usize,
    /// Minimum series length for the reduced kernel
    pub reduced_min_samples: usize,
}

impl Default for KernelPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            order: DEFAULT_ORDER,
            reduced_window: REDUCED_WINDOW,
            reduced_order: REDUCED_ORDER,
            reduced_min_samples: REDUCED_MIN_SAMPLES,
        }
    }
}

impl KernelPolicy {
    pub fn validate(&self) -> crate::Result<()> {
        validate_kernel(self.window, self.order)?;
        validate_kernel(self.reduced_window, self.reduced_order)
    }

    /// Pick a kernel for a series of `n` samples
    pub fn select(&self, n: usize) -> KernelChoice {
        if n >= self.window {
            KernelChoice::Full {
                window: self.window,
                order: self.order,
            }
        } else if n >= self.reduced_min_samples.max(self.reduced_window) {
            KernelChoice::Reduced {
                window: self.reduced_window,
                order: self.reduced_order,
            }
        } else {
            KernelChoice::Unsmoothed
        }
    }
}

/// Filtered position and pressure channels
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredChannels {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub pressure: Vec<f64>,
    pub kernel: KernelChoice,
}

/// Smoothing stage holding prebuilt kernels for a [`KernelPolicy`]
#[derive(Debug, Clone)]
pub struct SmoothingStage {
    policy: KernelPolicy,
    full: SavitzkyGolay,
    reduced: SavitzkyGolay,
}

impl SmoothingStage {
    pub fn new(policy: KernelPolicy) -> crate::Result<Self> {
        policy.validate()?;
        Ok(Self {
            full: SavitzkyGolay::new(policy.window, policy.order)?,
            reduced: SavitzkyGolay::new(policy.reduced_window, policy.reduced_order)?,
            policy,
        })
    }

    pub fn policy(&self) -> &KernelPolicy {
        &self.policy
    }

    fn kernel_for(&self, choice: KernelChoice) -> Option<&SavitzkyGolay> {
        match choice {
            KernelChoice::Full { .. } => Some(&self.full),
            KernelChoice::Reduced { .. } => Some(&self.reduced),
            KernelChoice::Unsmoothed => None,
        }
    }

    /// Smooth one channel with whatever kernel its length allows
    pub fn smooth(&self, data: &[f64]) -> crate::Result<(Vec<f64>, KernelChoice)> {
        let choice = self.policy.select(data.len());
        let out = match self.kernel_for(choice) {
            Some(kernel) => kernel.smooth(data)?,
            None => data.to_vec(),
        };
        Ok((out, choice))
    }

    /// First derivative per sample; falls back to a backward difference with
    /// index 0 set to zero when no kernel fits.
    pub fn derivative(&self, data: &[f64]) -> crate::Result<(Vec<f64>, KernelChoice)> {
        let choice = self.policy.select(data.len());
        let out = match self.kernel_for(choice) {
            Some(kernel) => kernel.derivative(data, 1.0)?,
            None => backward_difference(data),
        };
        Ok((out, choice))
    }

    /// Smooth x, y and pressure.
    ///
    /// Each output channel is filtered from its own raw channel.
    pub fn filter_channels(&self, x: &[f64], y: &[f64], pressure: &[f64]) -> crate::Result<FilteredChannels> {
        if x.len() != y.len() || x.len() != pressure.len() {
            return Err(crate::Error::InvalidParameter(format!(
                "channel lengths differ: x={}, y={}, pressure={}",
                x.len(),
                y.len(),
                pressure.len()
            )));
        }

        let (xf, kernel) = self.smooth(x)?;
        let (yf, _) = self.smooth(y)?;
        let (pf, _) = self.smooth(pressure)?;

        if !kernel.is_smoothed() {
            debug!(samples = x.len(), "series too short for smoothing, copying raw channels");
        } else {
            debug!(samples = x.len(), ?kernel, "smoothed position and pressure channels");
        }

        Ok(FilteredChannels {
            x: xf,
            y: yf,
            pressure: pf,
            kernel,
        })
    }
}

/// `out[i] = data[i] - data[i-1]`, `out[0] = 0`
pub fn backward_difference(data: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(data.len());
    if !data.is_empty() {
        out.push(0.0);
    }
    out.extend(data.windows(2).map(|w| w[1] - w[0]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn assert_close(a: &[f64], b: &[f64], tol: f64) {
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b).enumerate() {
            assert!((x - y).abs() <= tol, "index {}: {} vs {}", i, x, y);
        }
    }

    #[test]
    fn test_rejects_even_window() {
        assert!(matches!(SavitzkyGolay::new(12, 3), Err(Error::InvalidParameter(_))));
        assert!(matches!(SavitzkyGolay::new(0, 0), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_rejects_order_not_below_window() {
        assert!(matches!(SavitzkyGolay::new(5, 5), Err(Error::InvalidParameter(_))));
        assert!(matches!(SavitzkyGolay::new(5, 7), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_classic_five_point_quadratic_coefficients() {
        // Textbook values: (-3, 12, 17, 12, -3) / 35
        let sg = SavitzkyGolay::new(5, 2).unwrap();
        let expected = [-3.0 / 35.0, 12.0 / 35.0, 17.0 / 35.0, 12.0 / 35.0, -3.0 / 35.0];
        assert_close(sg.coefficients(), &expected, 1e-12);
    }

    #[test]
    fn test_kernel_is_symmetric() {
        let sg = SavitzkyGolay::new(DEFAULT_WINDOW, DEFAULT_ORDER).unwrap();
        let c = sg.coefficients();
        for i in 0..c.len() / 2 {
            assert!((c[i] - c[c.len() - 1 - i]).abs() < 1e-9);
        }
        let total: f64 = c.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_signal_is_preserved() {
        let sg = SavitzkyGolay::new(DEFAULT_WINDOW, DEFAULT_ORDER).unwrap();
        let data = vec![5.0; 40];
        assert_close(&sg.smooth(&data).unwrap(), &data, 1e-8);
    }

    #[test]
    fn test_polynomial_within_order_is_reproduced_including_edges() {
        let sg = SavitzkyGolay::new(7, 3).unwrap();
        let data: Vec<f64> = (0..20).map(|i| {
            let t = i as f64;
            0.5 * t * t * t - 2.0 * t * t + t - 4.0
        }).collect();
        assert_close(&sg.smooth(&data).unwrap(), &data, 1e-6);
    }

    #[test]
    fn test_derivative_of_line() {
        let sg = SavitzkyGolay::new(DEFAULT_WINDOW, DEFAULT_ORDER).unwrap();
        let data: Vec<f64> = (0..30).map(|i| 3.0 * i as f64 + 1.0).collect();
        let d = sg.derivative(&data, 1.0).unwrap();
        assert_close(&d, &vec![3.0; 30], 1e-7);

        let d_half = sg.derivative(&data, 0.5).unwrap();
        assert_close(&d_half, &vec![6.0; 30], 1e-6);
    }

    #[test]
    fn test_derivative_rejects_bad_delta() {
        let sg = SavitzkyGolay::new(5, 2).unwrap();
        assert!(sg.derivative(&[0.0; 10], 0.0).is_err());
    }

    #[test]
    fn test_short_input_rejected_by_raw_kernel() {
        let sg = SavitzkyGolay::new(13, 9).unwrap();
        assert!(matches!(sg.smooth(&[1.0; 5]), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_smoothing_reduces_noise() {
        let sg = SavitzkyGolay::new(DEFAULT_WINDOW, 3).unwrap();
        let clean: Vec<f64> = (0..100).map(|i| (i as f64 * 0.05).sin()).collect();
        let noisy: Vec<f64> = clean
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { 0.05 } else { -0.05 })
            .collect();
        let smoothed = sg.smooth(&noisy).unwrap();

        let err = |a: &[f64]| -> f64 { a.iter().zip(&clean).map(|(x, y)| (x - y).powi(2)).sum() };
        assert!(err(&smoothed) < err(&noisy));
    }

    #[test]
    fn test_policy_selection() {
        let policy = KernelPolicy::default();
        assert_eq!(policy.select(50), KernelChoice::Full { window: 13, order: 9 });
        assert_eq!(policy.select(13), KernelChoice::Full { window: 13, order: 9 });
        assert_eq!(policy.select(12), KernelChoice::Reduced { window: 5, order: 3 });
        assert_eq!(policy.select(11), KernelChoice::Reduced { window: 5, order: 3 });
        assert_eq!(policy.select(10), KernelChoice::Unsmoothed);
        assert_eq!(policy.select(1), KernelChoice::Unsmoothed);
        assert_eq!(policy.select(0), KernelChoice::Unsmoothed);
    }

    #[test]
    fn test_policy_validate() {
        let bad = KernelPolicy {
            reduced_window: 4,
            ..KernelPolicy::default()
        };
        assert!(matches!(bad.validate(), Err(Error::InvalidParameter(_))));
        assert!(SmoothingStage::new(bad).is_err());
    }

    #[test]
    fn test_stage_preserves_length() {
        let stage = SmoothingStage::new(KernelPolicy::default()).unwrap();
        for n in [0usize, 1, 5, 11, 13, 50] {
            let data: Vec<f64> = (0..n).map(|i| (i as f64).sqrt()).collect();
            let (out, _) = stage.smooth(&data).unwrap();
            assert_eq!(out.len(), n);
            let (d, _) = stage.derivative(&data).unwrap();
            assert_eq!(d.len(), n);
        }
    }

    #[test]
    fn test_stage_copies_short_series() {
        let stage = SmoothingStage::new(KernelPolicy::default()).unwrap();
        let data = [1.0, 4.0, 2.0];
        let (out, choice) = stage.smooth(&data).unwrap();
        assert_eq!(out, data.to_vec());
        assert_eq!(choice, KernelChoice::Unsmoothed);
    }

    #[test]
    fn test_filter_channels_filters_pressure_from_raw_pressure() {
        let stage = SmoothingStage::new(KernelPolicy::default()).unwrap();
        let x = vec![1.0; 20];
        let y = vec![2.0; 20];
        let p = vec![0.25; 20];
        let filtered = stage.filter_channels(&x, &y, &p).unwrap();
        assert_close(&filtered.pressure, &p, 1e-9);
        assert_close(&filtered.x, &x, 1e-9);
        assert_close(&filtered.y, &y, 1e-9);
    }

    #[test]
    fn test_filter_channels_rejects_mismatched_lengths() {
        let stage = SmoothingStage::new(KernelPolicy::default()).unwrap();
        let result = stage.filter_channels(&[0.0; 3], &[0.0; 2], &[0.0; 3]);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_backward_difference() {
        assert!(backward_difference(&[]).is_empty());
        assert_eq!(backward_difference(&[7.0]), vec![0.0]);
        assert_eq!(backward_difference(&[1.0, 3.0, 2.0]), vec![0.0, 2.0, -1.0]);
    }
}
