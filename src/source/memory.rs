// src/source/memory.rs

use super::{Row, Rows, TabularSource};
use anyhow::Result;

/// Rows held in memory; every scan starts from the first row.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Vec<Row>,
}

impl MemorySource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }
}

impl TabularSource for MemorySource {
    fn scan(&self, visit: &mut dyn FnMut(&mut Rows<'_>) -> Result<()>) -> Result<()> {
        visit(&mut self.rows.iter().cloned().map(Ok::<Row, anyhow::Error>))
    }

    fn describe(&self) -> String {
        format!("memory:{} rows", self.rows.len())
    }
}
