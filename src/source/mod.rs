// src/source/mod.rs

pub mod cell;
pub mod delimited;
pub mod memory;
pub mod workbook;

pub use cell::{Cell, Row};
pub use delimited::DelimitedSource;
pub use memory::MemorySource;
pub use workbook::WorkbookSource;

use crate::error::SourceError;
use anyhow::{anyhow, Result};
use std::path::Path;

/// A forward-only, non-restartable stream of rows, borrowed for one scan.
pub type Rows<'a> = dyn Iterator<Item = Result<Row>> + 'a;

/// Anything that can be read from the top, once per call.
pub trait TabularSource {
    /// Stream the rows into `visit`. The underlying file is open only while
    /// `visit` runs and is released before `scan` returns.
    fn scan(&self, visit: &mut dyn FnMut(&mut Rows<'_>) -> Result<()>) -> Result<()>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// One pass over `source`, returning whatever `f` computes from its rows.
pub fn with_rows<T>(
    source: &dyn TabularSource,
    f: impl FnOnce(&mut Rows<'_>) -> Result<T>,
) -> Result<T> {
    let mut f = Some(f);
    let mut out = None;
    source.scan(&mut |rows| {
        if let Some(f) = f.take() {
            out = Some(f(rows)?);
        }
        Ok(())
    })?;
    out.ok_or_else(|| anyhow!("{} was never scanned", source.describe()))
}

const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Pick a reader for `path` by its extension.
pub fn open_path(path: &Path, sheet: Option<&str>) -> Result<Box<dyn TabularSource>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if DELIMITED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(Box::new(DelimitedSource::new(path)))
    } else if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        Ok(Box::new(WorkbookSource::new(path, sheet.map(str::to_string))))
    } else {
        Err(SourceError::UnsupportedFormat {
            path: path.to_path_buf(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::source_error;

    #[test]
    fn dispatches_by_extension() -> Result<()> {
        let csv = open_path(Path::new("claims.CSV"), None)?;
        assert!(csv.describe().starts_with("csv"));
        let xlsx = open_path(Path::new("claims.xlsx"), Some("Sheet1"))?;
        assert!(xlsx.describe().starts_with("workbook"));
        Ok(())
    }

    #[test]
    fn with_rows_returns_the_visitor_result() -> Result<()> {
        let src = MemorySource::new(vec![vec![Cell::from("a")], vec![Cell::Int(2)]]);
        let count = with_rows(&src, |rows| Ok(rows.count()))?;
        assert_eq!(count, 2);
        let err = with_rows(&src, |_| -> Result<()> { Err(anyhow!("stop")) });
        assert!(err.is_err());
        Ok(())
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = open_path(Path::new("claims.pdf"), None)
            .err()
            .expect("pdf is not tabular");
        assert!(matches!(
            source_error(&err),
            Some(SourceError::UnsupportedFormat { .. })
        ));
    }
}
