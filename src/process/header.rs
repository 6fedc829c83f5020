// src/process/header.rs

use crate::process::normalize::normalize;
use crate::source::{Cell, Row};
use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Minimum number of non-empty cells for a row to count as the header.
pub const DEFAULT_HEADER_MIN_CELLS: usize = 3;

/// The detected header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderRow {
    /// Raw header text per column; missing cells become "".
    pub headers: Vec<String>,
    /// Normalized header → column position. Later duplicates win.
    pub index: HashMap<String, usize>,
    /// How many metadata/title rows were skipped to reach it.
    pub skipped: usize,
}

impl HeaderRow {
    pub fn from_cells(cells: &[Cell], skipped: usize) -> Self {
        let headers: Vec<String> = cells.iter().map(Cell::to_string).collect();
        let mut index = HashMap::with_capacity(headers.len());
        for (idx, h) in headers.iter().enumerate() {
            index.insert(normalize(h), idx);
        }
        Self {
            headers,
            index,
            skipped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Column for a field name given in any case or spelling of diacritics.
    pub fn column(&self, field: &str) -> Option<usize> {
        self.index.get(&normalize(field)).copied()
    }
}

/// Pull rows off the front of `rows` until one has at least `min_cells`
/// non-empty cells. The stream is left positioned just after the header.
///
/// An exhausted stream yields an empty `HeaderRow`, which callers treat as
/// "no results". Read errors propagate.
pub fn locate<I>(rows: &mut I, min_cells: usize) -> Result<HeaderRow>
where
    I: Iterator<Item = Result<Row>> + ?Sized,
{
    let mut skipped = 0usize;
    for row in rows {
        let row = row?;
        let non_empty = row.iter().filter(|c| !c.is_empty()).count();
        if non_empty >= min_cells {
            let header = HeaderRow::from_cells(&row, skipped);
            debug!(
                skipped,
                columns = header.headers.len(),
                "header row located"
            );
            return Ok(header);
        }
        trace!(skipped, non_empty, "skipping metadata row");
        skipped += 1;
    }
    debug!(skipped, "no header row found");
    Ok(HeaderRow {
        skipped,
        ..HeaderRow::default()
    })
}
