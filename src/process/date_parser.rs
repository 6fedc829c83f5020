// src/process/date_parser.rs

use crate::process::normalize::normalize;
use crate::process::record::Record;
use crate::source::Cell;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// Date column names in priority order: the first one present in the header
/// row is the date column.
pub const DEFAULT_DATE_ALIASES: &[&str] = &["date", "tarih", "hata tarihi"];

/// First alias (normalized) that names a column in `index`.
pub fn select_date_key<S: AsRef<str>>(
    index: &HashMap<String, usize>,
    aliases: &[S],
) -> Option<String> {
    aliases
        .iter()
        .map(|a| normalize(a.as_ref()))
        .find(|key| index.contains_key(key))
}

/// Strict ISO-8601 parse of a date or date-time string.
///
/// Accepts `YYYY-MM-DD`, `YYYYMMDD`, and date-times with a `T` or space
/// separator, optional seconds/fractions and an optional UTC offset (the local
/// wall time is kept). No trimming is done.
pub fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    const OFFSET_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M%:z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M%:z",
    ];

    if !s.is_ascii() {
        return None;
    }
    if s.len() == 10 && &s[4..5] == "-" && &s[7..8] == "-" {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(|d| d.and_time(chrono::NaiveTime::MIN));
    }
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s[0..4].parse().ok()?;
        let month: u32 = s[4..6].parse().ok()?;
        let day: u32 = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0);
    }
    if s.len() < 16 {
        return None;
    }
    if let Some(stripped) = s.strip_suffix('Z') {
        return parse_iso(stripped);
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_local());
        }
    }
    None
}

/// What the date column holds for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum DateValue {
    /// Column present, cell empty.
    Null,
    Date(NaiveDateTime),
    /// A number or boolean: present but carries no year.
    Yearless,
    /// Text that is not an ISO date.
    Unparsable,
}

impl DateValue {
    pub fn from_cell(cell: &Cell) -> Self {
        match cell {
            Cell::Empty => DateValue::Null,
            Cell::DateTime(dt) => DateValue::Date(*dt),
            Cell::Text(s) => parse_iso(s)
                .map(DateValue::Date)
                .unwrap_or(DateValue::Unparsable),
            Cell::Int(n) => compact_date(*n)
                .map(DateValue::Date)
                .unwrap_or(DateValue::Yearless),
            Cell::Float(_) | Cell::Bool(_) => DateValue::Yearless,
        }
    }

    /// The value under `date_key`; a missing column reads as empty.
    pub fn in_record(record: &Record, date_key: &str) -> Self {
        record
            .get(date_key)
            .map(DateValue::from_cell)
            .unwrap_or(DateValue::Null)
    }
}

/// An eight-digit integer read as `YYYYMMDD`. Delimited files infer
/// `20230101` as a number before it reaches the date column.
fn compact_date(n: i64) -> Option<NaiveDateTime> {
    if (10_000_000..100_000_000).contains(&n) {
        parse_iso(&n.to_string())
    } else {
        None
    }
}

/// Year constraint on the date column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemporalConstraint {
    #[default]
    Unconstrained,
    Year(i32),
    Range {
        start: Option<i32>,
        end: Option<i32>,
    },
}

impl TemporalConstraint {
    /// `year` wins over the range bounds when given.
    pub fn from_years(year: Option<i32>, start_year: Option<i32>, end_year: Option<i32>) -> Self {
        match (year, start_year, end_year) {
            (Some(y), _, _) => TemporalConstraint::Year(y),
            (None, None, None) => TemporalConstraint::Unconstrained,
            (None, start, end) => TemporalConstraint::Range { start, end },
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        matches!(self, TemporalConstraint::Unconstrained)
    }

    /// Whether `record` passes, judged on its `date_key` column.
    ///
    /// With no date column every row passes. A text date that fails to parse
    /// drops the row even when nothing is constrained; an empty cell passes.
    pub fn matches(&self, record: &Record, date_key: Option<&str>) -> bool {
        match date_key {
            Some(key) => self.matches_value(&DateValue::in_record(record, key)),
            None => true,
        }
    }

    pub fn matches_value(&self, value: &DateValue) -> bool {
        match value {
            DateValue::Unparsable => false,
            DateValue::Null => true,
            DateValue::Yearless => !matches!(self, TemporalConstraint::Year(_)),
            DateValue::Date(dt) => {
                let yr = dt.year();
                match *self {
                    TemporalConstraint::Unconstrained => true,
                    TemporalConstraint::Year(y) => yr == y,
                    TemporalConstraint::Range { start, end } => {
                        start.map_or(true, |s| yr >= s) && end.map_or(true, |e| yr <= e)
                    }
                }
            }
        }
    }
}
