//! Pen Sample
//!
//! One tablet report as delivered by the digitizer.

use serde::{Deserialize, Serialize};

/// A single tablet report.
///
/// Samples are immutable once recorded; all processing produces derived
/// channels alongside them rather than editing them in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic time in seconds
    pub time: f64,
    /// Planar position (device or normalized units)
    pub x: f64,
    pub y: f64,
    /// Pen pressure, 0 = no contact
    pub pressure: f64,
}

impl Sample {
    pub fn new(time: f64, x: f64, y: f64, pressure: f64) -> Self {
        Self {
            time,
            x,
            y,
            pressure,
        }
    }

    /// Pen is touching the surface
    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.pressure > 0.0
    }

    /// Pen is in range but lifted
    #[inline]
    pub fn is_hovering(&self) -> bool {
        !self.is_pressed()
    }

    /// Euclidean distance to another sample in the tablet plane
    pub fn distance_to(&self, other: &Sample) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

impl From<(f64, f64, f64, f64)> for Sample {
    fn from((time, x, y, pressure): (f64, f64, f64, f64)) -> Self {
        Self::new(time, x, y, pressure)
    }
}
