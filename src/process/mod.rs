// src/process/mod.rs

pub mod date_parser;
pub mod fuzzy;
pub mod header;
pub mod normalize;
pub mod record;
pub mod similarity;

pub use date_parser::{select_date_key, TemporalConstraint, DEFAULT_DATE_ALIASES};
pub use fuzzy::{FieldMatcher, Filters, PreparedFilters};
pub use header::{locate, HeaderRow, DEFAULT_HEADER_MIN_CELLS};
pub use normalize::{normalize, normalize_cell};
pub use record::{extract, Record};
pub use similarity::{SimilarityKind, SimilarityStrategy};
