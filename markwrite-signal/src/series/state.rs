//! Sample State Flags
//!
//! Each sample carries a small set of transition flags derived from the
//! pressure channel and the time gap to its predecessor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A single sample-state flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateFlag {
    /// First sample of the series, or first after a stream gap
    FirstEnter = 1,
    /// Pen lifted: first hover sample after contact
    FirstHover = 2,
    /// Pen still lifted
    Hovering = 4,
    /// Pen down: first contact sample after hovering
    FirstPress = 8,
    /// Pen still in contact
    Pressed = 16,
}

impl StateFlag {
    pub const ALL: [StateFlag; 5] = [
        StateFlag::FirstEnter,
        StateFlag::FirstHover,
        StateFlag::Hovering,
        StateFlag::FirstPress,
        StateFlag::Pressed,
    ];

    #[inline]
    pub fn bit(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            StateFlag::FirstEnter => "FIRST_ENTER",
            StateFlag::FirstHover => "FIRST_HOVER",
            StateFlag::Hovering => "HOVERING",
            StateFlag::FirstPress => "FIRST_PRESS",
            StateFlag::Pressed => "PRESSED",
        }
    }
}

/// Set of [`StateFlag`]s attached to one sample.
///
/// Serialized as the raw bitmask so exported files stay compatible with
/// consumers expecting the integer encoding. Unknown bits are dropped on
/// deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct SampleState(u8);

impl SampleState {
    const MASK: u8 = 0b1_1111;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from a raw bitmask, dropping unknown bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, flag: StateFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, flag: StateFlag) {
        self.0 |= flag.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Flags present in this set, in bit order
    pub fn flags(self) -> impl Iterator<Item = StateFlag> {
        StateFlag::ALL.into_iter().filter(move |f| self.contains(*f))
    }

    /// Pen in contact (first press or pressed)
    pub fn is_pressed(self) -> bool {
        self.contains(StateFlag::FirstPress) || self.contains(StateFlag::Pressed)
    }
}

impl From<u8> for SampleState {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<SampleState> for u8 {
    fn from(state: SampleState) -> u8 {
        state.bits()
    }
}

impl From<StateFlag> for SampleState {
    fn from(flag: StateFlag) -> Self {
        Self(flag.bit())
    }
}

impl BitOr for StateFlag {
    type Output = SampleState;

    fn bitor(self, rhs: StateFlag) -> SampleState {
        SampleState(self.bit() | rhs.bit())
    }
}

impl BitOr<StateFlag> for SampleState {
    type Output = SampleState;

    fn bitor(self, rhs: StateFlag) -> SampleState {
        SampleState(self.0 | rhs.bit())
    }
}

impl BitOr for SampleState {
    type Output = SampleState;

    fn bitor(self, rhs: SampleState) -> SampleState {
        SampleState(self.0 | rhs.0)
    }
}

impl BitOrAssign<StateFlag> for SampleState {
    fn bitor_assign(&mut self, rhs: StateFlag) {
        self.insert(rhs);
    }
}

impl fmt::Display for SampleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for flag in self.flags() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(flag.name())?;
            first = false;
        }
        Ok(())
    }
}
