//! Sample Series
//!
//! Raw tablet samples for one trial, their state flags, and the derived
//! channels computed by the analysis stages.

pub mod sample;
pub mod state;
pub mod channels;

pub use sample::Sample;
pub use state::{SampleState, StateFlag};
pub use channels::{DerivedChannels, Series};
