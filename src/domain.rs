//! Domain layer for the game catalog harvester.
//!
//! Holds the typed game record, the raw candidate it is assembled from,
//! soft-failure events, and the ports the core talks to the outside world through.

pub mod constants;
pub mod events;
pub mod game;
pub mod repositories;

pub use events::{CollectingReporter, NoopReporter, ParseFailureReporter, SoftParseFailure};
pub use game::{CandidateRecord, GameField, GameRecord, ReleaseDate, SystemRequirements};
pub use repositories::{RecordSink, SinkError};
