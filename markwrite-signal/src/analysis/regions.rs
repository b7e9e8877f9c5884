//! Contiguous Region Scanning
//!
//! Finds maximal runs of `true` in a boolean mask. Used to pull pen-down
//! runs, hover runs and gap-separated spans out of a series.

use serde::{Deserialize, Serialize};

/// A maximal run of consecutive indices, `stop` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub start: usize,
    pub stop: usize,
    pub length: usize,
}

impl Region {
    pub fn new(start: usize, stop: usize) -> Self {
        Self {
            start,
            stop,
            length: stop - start,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.stop
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.stop
    }
}

impl From<(usize, usize, usize)> for Region {
    fn from((start, stop, length): (usize, usize, usize)) -> Self {
        Self { start, stop, length }
    }
}

/// Maximal runs of `true` in `mask`, ordered by start index.
pub fn contiguous_regions(mask: &[bool]) -> Vec<Region> {
    let n = mask.len();
    if n == 0 {
        return Vec::new();
    }

    // Every true<->false transition between i and i+1 is a boundary at i+1
    let mut boundaries: Vec<usize> = Vec::new();
    if mask[0] {
        boundaries.push(0);
    }
    boundaries.extend(
        mask.windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] != w[1])
            .map(|(i, _)| i + 1),
    );
    if mask[n - 1] {
        boundaries.push(n);
    }

    boundaries
        .chunks_exact(2)
        .map(|pair| Region::new(pair[0], pair[1]))
        .collect()
}

/// Runs of consecutive elements satisfying `predicate`
pub fn regions_where<T>(values: &[T], predicate: impl Fn(&T) -> bool) -> Vec<Region> {
    let mask: Vec<bool> = values.iter().map(predicate).collect();
    contiguous_regions(&mask)
}
