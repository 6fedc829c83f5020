// src/source/delimited.rs

use super::{Cell, Row, Rows, TabularSource};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Comma or tab separated text file, read record by record.
///
/// Files carry no header line in the csv sense: title and metadata rows come
/// first and records may have differing field counts, so the reader is
/// headerless and flexible.
#[derive(Debug, Clone)]
pub struct DelimitedSource {
    path: PathBuf,
    delimiter: u8,
}

impl DelimitedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };
        Self { path, delimiter }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TabularSource for DelimitedSource {
    fn scan(&self, visit: &mut dyn FnMut(&mut Rows<'_>) -> Result<()>) -> Result<()> {
        let rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        debug!(path = %self.path.display(), "opened delimited source");

        let mut rows = rdr.into_records().enumerate().map(|(idx, result)| {
            let record = result.with_context(|| {
                format!("CSV parse error in {} at record {}", self.path.display(), idx)
            })?;
            Ok(record.iter().map(Cell::infer).collect::<Row>())
        });
        visit(&mut rows)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}
