//! Approximate search over semi-structured claim spreadsheets.
//!
//! Rows before the first row with enough filled cells are treated as titles
//! and metadata; that row becomes the header. Header names, filter keys,
//! filter values and cell text are all compared through one normalized key
//! (case- and diacritic-insensitive), with a similarity-ratio fallback for
//! spelling variation, and an optional year filter on a detected date column.

pub mod config;
pub mod error;
pub mod process;
pub mod search;
pub mod source;

pub use config::SearchConfig;
pub use error::SourceError;
pub use process::{Filters, Record, TemporalConstraint};
pub use search::{AliasTable, ClaimsSearcher};
pub use source::{Cell, TabularSource};
