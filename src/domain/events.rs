//! Soft-failure observability events.
//!
//! Soft failures never surface as errors; they fall back to a sentinel and get
//! reported here so format coverage can be tuned later.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::game::GameField;

/// One unrecognised raw value for a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftParseFailure {
    pub field: GameField,
    pub raw: String,
}

impl SoftParseFailure {
    pub const KIND: &'static str = "soft-parse-failure";

    pub fn new(field: GameField, raw: impl Into<String>) -> Self {
        Self {
            field,
            raw: raw.into(),
        }
    }
}

/// Sink for soft parse failures
pub trait ParseFailureReporter: Send + Sync {
    fn report(&self, failure: SoftParseFailure);
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ParseFailureReporter for NoopReporter {
    fn report(&self, _failure: SoftParseFailure) {}
}

/// Keeps every event in memory, used by tests and run summaries
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<SoftParseFailure>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SoftParseFailure> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ParseFailureReporter for CollectingReporter {
    fn report(&self, failure: SoftParseFailure) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }
}
