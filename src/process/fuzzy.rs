// src/process/fuzzy.rs

use crate::process::normalize::{normalize, normalize_cell};
use crate::process::record::Record;
use crate::process::similarity::{SequenceRatio, SimilarityStrategy};
use crate::source::Cell;
use std::collections::HashSet;

/// Ratio at or above which two normalized strings count as equal.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Free-text fields matched by substring rather than equality.
pub const DEFAULT_FREE_TEXT_FIELDS: &[&str] = &["complaint"];

/// Field filters as given by the caller, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(Vec<(String, Cell)>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Cell>) -> Self {
        self.insert(field, value);
        self
    }

    /// Set `field`, replacing an earlier value for the same name.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Cell>) {
        let field = field.into();
        let value = value.into();
        match self.0.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.0.push((field, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.0.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<Cell>> FromIterator<(K, V)> for Filters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut filters = Filters::new();
        for (k, v) in iter {
            filters.insert(k, v);
        }
        filters
    }
}

/// Decides whether one normalized cell satisfies one normalized filter value.
pub struct FieldMatcher {
    free_text: HashSet<String>,
    threshold: f64,
    similarity: Box<dyn SimilarityStrategy>,
}

impl Default for FieldMatcher {
    fn default() -> Self {
        Self::new(
            DEFAULT_FREE_TEXT_FIELDS,
            DEFAULT_SIMILARITY_THRESHOLD,
            Box::new(SequenceRatio),
        )
    }
}

impl FieldMatcher {
    pub fn new<S: AsRef<str>>(
        free_text_fields: &[S],
        threshold: f64,
        similarity: Box<dyn SimilarityStrategy>,
    ) -> Self {
        Self {
            free_text: free_text_fields
                .iter()
                .map(|f| normalize(f.as_ref()))
                .collect(),
            threshold,
            similarity,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.similarity.name()
    }

    pub fn is_free_text(&self, field_key: &str) -> bool {
        self.free_text.contains(field_key)
    }

    /// Free-text fields pass on substring containment, others on exact
    /// equality; either passes when the similarity ratio reaches the threshold.
    /// An empty filter value always passes.
    pub fn matches(&self, cell: &str, value: &str, field_key: &str) -> bool {
        if value.is_empty() {
            return true;
        }
        let direct = if self.is_free_text(field_key) {
            cell.contains(value)
        } else {
            cell == value
        };
        direct
            || (self.similarity.upper_bound(value, cell) >= self.threshold
                && self.similarity.ratio(value, cell) >= self.threshold)
    }
}

/// Filters with keys and values already normalized and falsy values dropped.
#[derive(Debug, Clone, Default)]
pub struct PreparedFilters {
    criteria: Vec<(String, String)>,
}

impl PreparedFilters {
    pub fn new(filters: &Filters) -> Self {
        let criteria = filters
            .iter()
            .filter(|(_, v)| !v.is_falsy())
            .map(|(k, v)| (normalize(k), normalize_cell(v)))
            .collect();
        Self { criteria }
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.criteria.iter().map(|(k, _)| k.as_str())
    }

    /// All criteria must pass; stops at the first failure. A key missing
    /// from the record compares against the empty string.
    pub fn matches(&self, record: &Record, matcher: &FieldMatcher) -> bool {
        self.criteria.iter().all(|(key, value)| {
            let cell = record.get(key).map(normalize_cell).unwrap_or_default();
            matcher.matches(&cell, value, key)
        })
    }
}
