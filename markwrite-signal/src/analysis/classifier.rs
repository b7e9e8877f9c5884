//! Sample-State Classification
//!
//! Labels each sample with hover/press transition flags. A sample's state
//! depends only on itself and its immediate predecessor.

use crate::series::{Sample, SampleState, StateFlag};

/// Default maximum inter-sample interval before the stream is treated as
/// interrupted (seconds)
pub const DEFAULT_MAX_SAMPLE_GAP: f64 = 0.05;

/// What the classifier needs to know about the previous sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Predecessor {
    pub pressure: f64,
    /// Time since the predecessor (seconds)
    pub gap: f64,
}

/// Classify one sample.
///
/// `FIRST_ENTER` is independent of the pressure transition and is set for the
/// first sample or after a gap longer than `max_gap`.
pub fn classify_sample(pressure: f64, previous: Option<Predecessor>, max_gap: f64) -> SampleState {
    let mut state = SampleState::empty();

    let entered = match previous {
        None => true,
        Some(prev) => prev.gap > max_gap,
    };
    if entered {
        state |= StateFlag::FirstEnter;
    }

    let previously_pressed = previous.map(|p| p.pressure > 0.0);
    if pressure > 0.0 {
        match previously_pressed {
            Some(true) => state |= StateFlag::Pressed,
            _ => state |= StateFlag::FirstPress,
        }
    } else {
        match previously_pressed {
            Some(false) => state |= StateFlag::Hovering,
            _ => state |= StateFlag::FirstHover,
        }
    }

    state
}

/// Classify every sample in one left-to-right pass
pub fn classify_series(samples: &[Sample], max_gap: f64) -> Vec<SampleState> {
    let mut states = Vec::with_capacity(samples.len());
    let mut previous: Option<&Sample> = None;

    for sample in samples {
        let pred = previous.map(|p| Predecessor {
            pressure: p.pressure,
            gap: sample.time - p.time,
        });
        states.push(classify_sample(sample.pressure, pred, max_gap));
        previous = Some(sample);
    }

    states
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(t: f64, p: f64) -> Sample {
        Sample::new(t, 0.0, 0.0, p)
    }

    #[test]
    fn test_first_sample_always_enters() {
        let hover = classify_sample(0.0, None, DEFAULT_MAX_SAMPLE_GAP);
        assert_eq!(hover, StateFlag::FirstEnter | StateFlag::FirstHover);

        let press = classify_sample(0.7, None, DEFAULT_MAX_SAMPLE_GAP);
        assert_eq!(press, StateFlag::FirstEnter | StateFlag::FirstPress);
    }

    #[test]
    fn test_lift_is_first_hover() {
        let prev = Predecessor { pressure: 0.5, gap: 0.005 };
        let state = classify_sample(0.0, Some(prev), DEFAULT_MAX_SAMPLE_GAP);
        assert!(state.contains(StateFlag::FirstHover));
        assert!(!state.contains(StateFlag::Hovering));
        assert!(!state.contains(StateFlag::FirstEnter));
    }

    #[test]
    fn test_consecutive_hover() {
        let prev = Predecessor { pressure: 0.0, gap: 0.005 };
        let state = classify_sample(0.0, Some(prev), DEFAULT_MAX_SAMPLE_GAP);
        assert_eq!(state, SampleState::from(StateFlag::Hovering));
    }

    #[test]
    fn test_touch_down_and_hold() {
        let down = classify_sample(0.2, Some(Predecessor { pressure: 0.0, gap: 0.005 }), 0.05);
        assert_eq!(down, SampleState::from(StateFlag::FirstPress));

        let hold = classify_sample(0.3, Some(Predecessor { pressure: 0.2, gap: 0.005 }), 0.05);
        assert_eq!(hold, SampleState::from(StateFlag::Pressed));
    }

    #[test]
    fn test_gap_sets_first_enter_without_dropping_transition() {
        let prev = Predecessor { pressure: 0.4, gap: 0.5 };
        let state = classify_sample(0.4, Some(prev), 0.05);
        assert_eq!(state, StateFlag::FirstEnter | StateFlag::Pressed);
    }

    #[test]
    fn test_gap_equal_to_max_is_not_a_break() {
        let prev = Predecessor { pressure: 0.0, gap: 0.05 };
        let state = classify_sample(0.0, Some(prev), 0.05);
        assert!(!state.contains(StateFlag::FirstEnter));
    }

    #[test]
    fn test_classify_series() {
        let samples = vec![
            s(0.000, 0.0),
            s(0.005, 0.0),
            s(0.010, 0.3),
            s(0.015, 0.4),
            s(0.020, 0.0),
            s(0.500, 0.0),
        ];
        let states = classify_series(&samples, 0.05);
        let bits: Vec<u8> = states.iter().map(|s| s.bits()).collect();
        assert_eq!(bits, vec![1 | 2, 4, 8, 16, 2, 1 | 4]);
    }

    #[test]
    fn test_classify_empty() {
        assert!(classify_series(&[], 0.05).is_empty());
    }

    #[test]
    fn test_exactly_one_pressure_flag_per_sample() {
        let samples: Vec<Sample> = (0..40)
            .map(|i| s(i as f64 * 0.01 * (1 + i % 7) as f64, if i % 5 < 2 { 0.0 } else { 0.6 }))
            .collect();
        for state in classify_series(&samples, 0.05) {
            let pressure_flags = [
                StateFlag::FirstHover,
                StateFlag::Hovering,
                StateFlag::FirstPress,
                StateFlag::Pressed,
            ]
            .iter()
            .filter(|f| state.contains(**f))
            .count();
            assert_eq!(pressure_flags, 1);
        }
    }
}
