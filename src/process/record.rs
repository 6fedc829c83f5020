// src/process/record.rs

use crate::process::header::HeaderRow;
use crate::source::Cell;
use std::collections::{BTreeMap, HashMap};

/// One data row keyed by normalized header name.
pub type Record = BTreeMap<String, Cell>;

/// Read every indexed column out of `row`; columns past the end are null.
pub fn extract(row: &[Cell], index: &HashMap<String, usize>) -> Record {
    index
        .iter()
        .map(|(key, &col)| (key.clone(), row.get(col).cloned().unwrap_or_default()))
        .collect()
}

impl HeaderRow {
    pub fn extract(&self, row: &[Cell]) -> Record {
        extract(row, &self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_rows_fill_with_null() {
        let header = HeaderRow::from_cells(
            &[Cell::from("Complaint"), Cell::from("Customer"), Cell::from("Date")],
            0,
        );
        let record = header.extract(&[Cell::from("noise")]);
        assert_eq!(record.len(), 3);
        assert_eq!(record["complaint"], Cell::from("noise"));
        assert_eq!(record["customer"], Cell::Empty);
        assert_eq!(record["date"], Cell::Empty);
    }

    #[test]
    fn extra_cells_are_ignored() {
        let mut index = HashMap::new();
        index.insert("a".to_string(), 1);
        let record = extract(&[Cell::Int(1), Cell::Int(2), Cell::Int(3)], &index);
        assert_eq!(record, Record::from([("a".to_string(), Cell::Int(2))]));
    }
}
