//! Trial import and export

pub mod trial_file;

pub use trial_file::{export_table, import_samples, parse_samples, TrialFile, TrialMetadata};
