// src/source/workbook.rs

use super::{Cell, Row, Rows, TabularSource};
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook, open_workbook_auto, Data, DataRef, DataType, Range, Reader, Xlsx};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions read cell by cell from the sheet XML.
const STREAMED_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

/// Spreadsheet workbook (xlsx, xlsm, xlsb, xls, ods) read through calamine.
///
/// Only one worksheet is scanned: the named one when configured, otherwise
/// the first sheet in the workbook. Row and column indices are absolute, so
/// row 0 is the sheet's first row whether or not it holds anything.
#[derive(Debug, Clone)]
pub struct WorkbookSource {
    path: PathBuf,
    sheet: Option<String>,
}

impl WorkbookSource {
    pub fn new(path: impl Into<PathBuf>, sheet: Option<String>) -> Self {
        Self {
            path: path.into(),
            sheet,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_streamed(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| STREAMED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
            .unwrap_or(false)
    }

    /// xlsx/xlsm: rows are assembled from the cell reader as the sheet XML is
    /// parsed; nothing beyond the current row is held.
    fn scan_streamed(&self, visit: &mut dyn FnMut(&mut Rows<'_>) -> Result<()>) -> Result<()> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path)
            .with_context(|| format!("Failed to open workbook {}", self.path.display()))?;
        let name = match &self.sheet {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("{} has no worksheets", self.path.display()))?,
        };
        let mut cells = workbook
            .worksheet_cells_reader(&name)
            .with_context(|| format!("Failed to read sheet {:?} in {}", name, self.path.display()))?;
        let dimensions = cells.dimensions();
        debug!(
            path = %self.path.display(),
            sheet = %name,
            ?dimensions,
            "streaming workbook sheet"
        );
        let next_cell = move || -> Result<Option<PlacedCell>> {
            let cell = cells.next_cell().context("Failed to read worksheet cell")?;
            Ok(cell.map(|c| (c.get_position(), convert_ref(c.get_value()))))
        };
        let mut rows = StreamedRows::new(next_cell, dimensions.end.1 as usize + 1);
        visit(&mut rows)
    }

    /// Formats without a cell reader in calamine load the sheet range first.
    fn load_range(&self) -> Result<Range<Data>> {
        let mut workbook = open_workbook_auto(&self.path)
            .with_context(|| format!("Failed to open workbook {}", self.path.display()))?;

        match &self.sheet {
            Some(name) => workbook
                .worksheet_range(name)
                .with_context(|| format!("Failed to read sheet {:?} in {}", name, self.path.display())),
            None => workbook
                .worksheet_range_at(0)
                .ok_or_else(|| anyhow!("{} has no worksheets", self.path.display()))?
                .with_context(|| format!("Failed to read first sheet in {}", self.path.display())),
        }
    }
}

impl TabularSource for WorkbookSource {
    fn scan(&self, visit: &mut dyn FnMut(&mut Rows<'_>) -> Result<()>) -> Result<()> {
        if self.is_streamed() {
            return self.scan_streamed(visit);
        }
        let range = self.load_range()?;
        debug!(
            path = %self.path.display(),
            height = range.height(),
            width = range.width(),
            "loaded workbook sheet"
        );
        visit(&mut SheetRows::new(range))
    }

    fn describe(&self) -> String {
        match &self.sheet {
            Some(sheet) => format!("workbook:{}#{}", self.path.display(), sheet),
            None => format!("workbook:{}", self.path.display()),
        }
    }
}

/// A cell value with its absolute (row, column) position.
type PlacedCell = ((u32, u32), Cell);

/// Rows built from a source of stored cells in row order, such as calamine's
/// xlsx cell reader.
///
/// Rows with no stored cells come out empty so row positions match the sheet.
struct StreamedRows<F> {
    next_cell: F,
    /// First cell of the next row, read ahead while finishing the last one.
    pending: Option<PlacedCell>,
    next_row: u32,
    width: usize,
    done: bool,
}

impl<F> StreamedRows<F>
where
    F: FnMut() -> Result<Option<PlacedCell>>,
{
    fn new(next_cell: F, width: usize) -> Self {
        Self {
            next_cell,
            pending: None,
            next_row: 0,
            width,
            done: false,
        }
    }

    fn read_cell(&mut self) -> Result<Option<PlacedCell>> {
        if self.done {
            return Ok(None);
        }
        let cell = (self.next_cell)()?;
        if cell.is_none() {
            self.done = true;
        }
        Ok(cell)
    }
}

impl<F> Iterator for StreamedRows<F>
where
    F: FnMut() -> Result<Option<PlacedCell>>,
{
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = match self.pending.take() {
            Some(cell) => cell,
            None => match self.read_cell() {
                Ok(Some(cell)) => cell,
                Ok(None) => return None,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            },
        };

        let r = first.0 .0;
        let mut row: Row = vec![Cell::Empty; self.width];
        if r > self.next_row {
            self.pending = Some(first);
            self.next_row += 1;
            return Some(Ok(row));
        }

        place(&mut row, first);
        loop {
            match self.read_cell() {
                Ok(Some(cell)) if cell.0 .0 == r => place(&mut row, cell),
                Ok(Some(cell)) => {
                    self.pending = Some(cell);
                    break;
                }
                Ok(None) => break,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        self.next_row = r + 1;
        Some(Ok(row))
    }
}

fn place(row: &mut Row, ((_, col), cell): PlacedCell) {
    let col = col as usize;
    if col >= row.len() {
        row.resize(col + 1, Cell::Empty);
    }
    row[col] = cell;
}

/// Walks an owned sheet range one row at a time, converting cells lazily.
struct SheetRows {
    range: Range<Data>,
    next: u32,
}

impl SheetRows {
    fn new(range: Range<Data>) -> Self {
        Self { range, next: 0 }
    }
}

impl Iterator for SheetRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let (last_row, last_col) = self.range.end()?;
        if self.next > last_row {
            return None;
        }
        let r = self.next;
        self.next += 1;

        let row: Row = (0..=last_col)
            .map(|c| self.range.get_value((r, c)).map(convert_cell).unwrap_or_default())
            .collect();
        Some(Ok(row))
    }
}

fn convert_ref(data: &DataRef<'_>) -> Cell {
    match data {
        DataRef::SharedString(s) => Cell::Text(s.to_string()),
        other => convert_cell(&Data::from(other.clone())),
    }
}

/// Map a calamine cell onto a `Cell`.
fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(n) => Cell::Int(*n),
        Data::Float(f) => whole_float(*f).map(Cell::Int).unwrap_or(Cell::Float(*f)),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
            Some(dt) => Cell::DateTime(dt),
            None => Cell::Text(data.to_string()),
        },
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Excel stores every number as a float; whole ones read back as integers.
fn whole_float(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as i64)
    } else {
        None
    }
}
