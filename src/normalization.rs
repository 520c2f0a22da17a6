//! Field normalization pipeline
//!
//! Pure conversions from raw page fragments to typed values. Nothing in here
//! touches shared mutable state; soft failures go to a [`ParseFailureReporter`].
//!
//! [`ParseFailureReporter`]: crate::domain::ParseFailureReporter

pub mod date_parser;
pub mod fields;
pub mod processors;
pub mod requirements;

pub use date_parser::DateParser;
pub use processors::{FieldProcessor, FieldValue, NormalizeContext, processor_for};
pub use requirements::{LabelSet, RequirementsSlicing};
