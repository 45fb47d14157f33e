//! Sequential pattern discovery over per-subject event histories.
//!
//! Rows of (subject, item, time) become one ordered sequence of item sets
//! per subject. The level-wise miner then finds every ordered pattern
//! contained in at least a threshold's worth of subjects, for several
//! thresholds at once.
//!
//! # Example:
//! ```rust
//! use seq_tool::{CancellationToken, EventRow, EventTime, Miner, MinSupport, SequenceDatabase};
//!
//! const DATA: &[(&str, &str, i64)] = &[
//!     ("s1", "a", 1),
//!     ("s1", "b", 2),
//!     ("s2", "a", 1),
//!     ("s2", "b", 3),
//! ];
//!
//! let rows: Vec<EventRow> = DATA
//!     .iter()
//!     .map(|&(subject, item, time)| EventRow::new(subject, item, EventTime::Index(time)))
//!     .collect();
//!
//! let db = SequenceDatabase::build(&rows, None).unwrap();
//! let result = Miner::new(db, false)
//!     .mine(&[MinSupport::Count(2)], &CancellationToken::new())
//!     .unwrap();
//!
//! let pattern = result.alphabet.parse("a -> b").unwrap();
//! assert!(result.thresholds[0].contains(&pattern));
//! ```

pub mod aggregate;
pub mod candidate;
pub mod config;
pub mod database;
pub mod error;
pub mod input;
pub mod miner;
pub mod output;
pub mod pattern;
pub mod run;
pub mod support;

pub use aggregate::{RunSummary, SupportRow, SupportTable};
pub use candidate::CandidateGenerator;
pub use config::{MinSupport, RunConfig, RunMode, Settings};
pub use database::{EventRow, EventTime, GroupingUnit, Sequence, SequenceDatabase};
pub use error::{MiningError, Result};
pub use miner::{CancellationToken, FrequentPattern, Miner, MinerState, MiningResult, ThresholdResult};
pub use pattern::{Alphabet, ItemSet, Pattern};
pub use run::{run, RunReport};
