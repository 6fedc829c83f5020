// src/search/mod.rs

pub mod aliases;

use crate::config::{SearchConfig, SOURCE_ENV};
use crate::error::SourceError;
use crate::process::date_parser::{select_date_key, DateValue, TemporalConstraint};
use crate::process::fuzzy::{FieldMatcher, Filters, PreparedFilters};
use crate::process::header::{self, HeaderRow};
use crate::process::record::Record;
use crate::source::{open_path, with_rows, TabularSource};
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

pub use aliases::AliasTable;

/// Searches complaint records in one tabular file.
///
/// Nothing is cached: each call opens the file, streams it once from the top
/// and releases it before returning.
pub struct ClaimsSearcher {
    path: Option<PathBuf>,
    sheet: Option<String>,
    header_min_cells: usize,
    date_aliases: Vec<String>,
    matcher: FieldMatcher,
}

/// Counters from one search pass, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub skipped_rows: usize,
    pub scanned: usize,
    pub bad_dates: usize,
    pub matched: usize,
}

impl ClaimsSearcher {
    /// Bind to `path`, or to `COMPLAINTS_XLSX_PATH` when `None`. A missing
    /// location is only reported when a search runs.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self::from_config(&SearchConfig {
            source: path,
            ..SearchConfig::default()
        })
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            path: config.resolve_source(),
            sheet: config.sheet.clone(),
            header_min_cells: config.header_min_cells,
            date_aliases: config.date_aliases.clone(),
            matcher: FieldMatcher::new(
                config.free_text_fields.as_slice(),
                config.similarity_threshold,
                config.similarity.strategy(),
            ),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The configured file, checked for existence, with a reader chosen by
    /// extension.
    fn ensure_source(&self) -> Result<Box<dyn TabularSource>> {
        let path = self
            .path
            .as_ref()
            .ok_or(SourceError::NotConfigured { var: SOURCE_ENV })?;
        if !path.exists() {
            return Err(SourceError::NotFound { path: path.clone() }.into());
        }
        open_path(path, self.sheet.as_deref())
    }

    /// Records matching every non-empty filter and the year constraint, in
    /// file order. `year` takes precedence over `start_year`/`end_year`.
    pub fn search(
        &self,
        filters: &Filters,
        year: Option<i32>,
        start_year: Option<i32>,
        end_year: Option<i32>,
    ) -> Result<Vec<Record>> {
        let source = self.ensure_source()?;
        let constraint = TemporalConstraint::from_years(year, start_year, end_year);
        let (records, _) = self.search_source(source.as_ref(), filters, constraint)?;
        Ok(records)
    }

    /// One pass over `source`: locate the header, then filter each row.
    #[instrument(level = "debug", skip_all, fields(source = %source.describe()))]
    pub fn search_source(
        &self,
        source: &dyn TabularSource,
        filters: &Filters,
        constraint: TemporalConstraint,
    ) -> Result<(Vec<Record>, ScanStats)> {
        let prepared = PreparedFilters::new(filters);
        let (results, stats) = with_rows(source, |rows| {
            let mut stats = ScanStats::default();
            let header = header::locate(&mut *rows, self.header_min_cells)?;
            stats.skipped_rows = header.skipped;
            if header.is_empty() {
                info!(source = %source.describe(), "no header row; nothing to search");
                return Ok((Vec::new(), stats));
            }

            let date_key = select_date_key(&header.index, self.date_aliases.as_slice());
            match &date_key {
                Some(key) => debug!(date_key = %key, "date column selected"),
                None if !constraint.is_unconstrained() => {
                    info!(?constraint, "no date column recognised; year filters ignored")
                }
                None => {}
            }
            let date_key = date_key.as_deref();

            let mut results = Vec::new();
            for row in rows {
                let row = row?;
                stats.scanned += 1;
                let record = header.extract(&row);

                if !constraint.matches(&record, date_key) {
                    if date_key.map(|key| DateValue::in_record(&record, key))
                        == Some(DateValue::Unparsable)
                    {
                        stats.bad_dates += 1;
                    }
                    continue;
                }
                if prepared.matches(&record, &self.matcher) {
                    results.push(record);
                }
            }
            Ok((results, stats))
        })?;

        let stats = ScanStats {
            matched: results.len(),
            ..stats
        };
        info!(
            skipped = stats.skipped_rows,
            scanned = stats.scanned,
            bad_dates = stats.bad_dates,
            matched = stats.matched,
            similarity = self.matcher.strategy_name(),
            "search complete"
        );
        Ok((results, stats))
    }

    /// Distinct non-empty values of `field`, trimmed and sorted.
    pub fn unique_values(&self, field: &str) -> Result<Vec<String>> {
        let source = self.ensure_source()?;
        self.unique_values_in(source.as_ref(), field)
    }

    #[instrument(level = "debug", skip(self, source), fields(source = %source.describe()))]
    pub fn unique_values_in(&self, source: &dyn TabularSource, field: &str) -> Result<Vec<String>> {
        let values = with_rows(source, |rows| {
            let mut values = BTreeSet::new();
            let header = header::locate(&mut *rows, self.header_min_cells)?;
            if header.is_empty() {
                return Ok(values);
            }
            let Some(col) = header.column(field) else {
                debug!(field, "field does not name a column");
                return Ok(values);
            };

            for row in rows {
                let row = row?;
                let Some(cell) = row.get(col) else { continue };
                if cell.is_empty() {
                    continue;
                }
                let text = cell.to_string();
                let text = text.trim();
                if !text.is_empty() {
                    values.insert(text.to_string());
                }
            }
            Ok(values)
        })?;
        debug!(field, distinct = values.len(), "collected unique values");
        Ok(values.into_iter().collect())
    }

    /// The detected header row, raw; empty when none qualifies.
    pub fn headers(&self) -> Result<Vec<String>> {
        let source = self.ensure_source()?;
        let HeaderRow { headers, .. } = with_rows(source.as_ref(), |rows| {
            header::locate(rows, self.header_min_cells)
        })?;
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::source_error;
    use crate::source::{Cell, MemorySource, Row};
    use chrono::NaiveDate;
    use std::ffi::OsStr;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::Builder;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,claimsearch::search=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn date(y: i32, m: u32, d: u32) -> Cell {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().into()
    }

    fn row(cells: Vec<Cell>) -> Row {
        cells
    }

    fn claims(headers: &[&str]) -> MemorySource {
        MemorySource::new(vec![
            headers.iter().map(|h| Cell::from(*h)).collect(),
            row(vec!["noise".into(), "ACME".into(), "engine".into(), "X1".into(), date(2023, 1, 1)]),
            row(vec!["crack".into(), "BETA".into(), "body".into(), "X2".into(), date(2022, 5, 1)]),
        ])
    }

    const ENGLISH: &[&str] = &["complaint", "customer", "subject", "part_code", "date"];
    const TURKISH: &[&str] = &["müşteri şikayeti", "müşteri", "konu", "parça kodu", "tarih"];

    fn run(
        source: &MemorySource,
        filters: Filters,
        year: Option<i32>,
        start: Option<i32>,
        end: Option<i32>,
    ) -> Vec<Record> {
        let searcher = ClaimsSearcher::new(None);
        let constraint = TemporalConstraint::from_years(year, start, end);
        searcher
            .search_source(source, &filters, constraint)
            .unwrap()
            .0
    }

    #[test]
    fn filters_by_customer_and_year() {
        init_test_logging();
        let src = claims(ENGLISH);
        let hits = run(&src, Filters::new().with("customer", "ACME"), Some(2023), None, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["customer"], Cell::from("ACME"));

        let none = run(&src, Filters::new().with("customer", "ACME"), Some(2022), None, None);
        assert!(none.is_empty());
    }

    #[test]
    fn fuzzy_complaint_matching() {
        let mut src = claims(ENGLISH);
        src.push(row(vec![
            "\u{015f}ikayet var".into(),
            "GAMMA".into(),
            "door".into(),
            "X3".into(),
            date(2023, 2, 1),
        ]));

        let accent = run(&src, Filters::new().with("complaint", "sikayet"), None, None, None);
        assert_eq!(accent.len(), 1);
        assert_eq!(accent[0]["customer"], Cell::from("GAMMA"));

        let typo = run(&src, Filters::new().with("complaint", "noize"), None, None, None);
        assert_eq!(typo.len(), 1);
        assert_eq!(typo[0]["customer"], Cell::from("ACME"));

        let miss = run(&src, Filters::new().with("complaint", "leaking valve"), None, None, None);
        assert!(miss.is_empty());
    }

    #[test]
    fn turkish_headers_and_error_date_column() {
        let src = claims(TURKISH);
        let hits = run(&src, Filters::new().with("müşteri", "ACME"), Some(2023), None, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["musteri"], Cell::from("ACME"));

        let mut headers = TURKISH.to_vec();
        headers[4] = "Hata Tarihi";
        let src = claims(&headers);
        let hits = run(&src, Filters::new().with("Müşteri", "ACME"), Some(2023), None, None);
        assert_eq!(hits.len(), 1);
        assert!(run(&src, Filters::new().with("Müşteri", "ACME"), Some(2022), None, None).is_empty());
    }

    #[test]
    fn year_range_and_precedence() {
        let src = claims(ENGLISH);
        assert_eq!(run(&src, Filters::new(), None, Some(2022), Some(2023)).len(), 2);
        let only = run(&src, Filters::new(), None, Some(2022), Some(2022));
        assert_eq!(only.len(), 1);
        assert_eq!(only[0]["customer"], Cell::from("BETA"));
        assert_eq!(run(&src, Filters::new(), Some(2023), Some(2022), Some(2023)).len(), 1);
    }

    #[test]
    fn skips_metadata_rows_and_keeps_order() {
        let src = MemorySource::new(vec![
            row(vec!["F160 Customer Claims".into()]),
            row(vec![]),
            row(vec!["Report date".into(), "2024-03-01".into()]),
            row(vec!["Complaint".into(), "Customer".into(), "PPM Adet".into()]),
            row(vec!["a".into(), "ACME".into(), Cell::Int(1)]),
            row(vec!["b".into(), "BETA".into(), Cell::Int(2)]),
            row(vec!["c".into(), "GAMMA".into(), Cell::Int(1)]),
        ]);
        let hits = run(&src, Filters::new().with("PPM Adet", 1), None, None, None);
        let complaints: Vec<_> = hits.iter().map(|r| r["complaint"].clone()).collect();
        assert_eq!(complaints, vec![Cell::from("a"), Cell::from("c")]);
        // no date column: year filters are inert
        assert_eq!(run(&src, Filters::new(), Some(1990), None, None).len(), 3);
    }

    #[test]
    fn unparsable_dates_drop_rows_without_any_filter() {
        let src = MemorySource::new(vec![
            row(vec!["complaint".into(), "customer".into(), "date".into()]),
            row(vec!["a".into(), "ACME".into(), "2023-01-01".into()]),
            row(vec!["b".into(), "ACME".into(), "sometime".into()]),
            row(vec!["c".into(), "ACME".into(), Cell::Empty]),
        ]);
        let searcher = ClaimsSearcher::new(None);
        let (hits, stats) = searcher
            .search_source(&src, &Filters::new(), TemporalConstraint::Unconstrained)
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(stats.bad_dates, 1);
        assert_eq!(stats.scanned, 3);
        // the empty date still passes an exact-year filter
        assert_eq!(run(&src, Filters::new(), Some(2023), None, None).len(), 2);
    }

    #[test]
    fn no_header_means_no_results() {
        let src = MemorySource::new(vec![row(vec!["title".into()]), row(vec!["a".into(), "b".into()])]);
        assert!(run(&src, Filters::new(), None, None, None).is_empty());
        let searcher = ClaimsSearcher::new(None);
        assert!(searcher.unique_values_in(&src, "a").unwrap().is_empty());
    }

    #[test]
    fn unique_values_sorted_and_deduplicated() {
        let mut src = claims(ENGLISH);
        src.push(row(vec!["extra".into(), "ACME".into(), "engine".into(), "X1".into(), date(2024, 1, 1)]));
        src.push(row(vec!["blank".into(), "  ".into()]));
        let searcher = ClaimsSearcher::new(None);
        assert_eq!(searcher.unique_values_in(&src, "Customer").unwrap(), vec!["ACME", "BETA"]);
        assert!(searcher.unique_values_in(&src, "supplier").unwrap().is_empty());
    }

    fn write_csv(body: &str) -> Result<tempfile::NamedTempFile> {
        let mut tmp = Builder::new().suffix(".csv").tempfile()?;
        tmp.write_all(body.as_bytes())?;
        Ok(tmp)
    }

    #[test]
    fn searches_csv_file_end_to_end() -> Result<()> {
        let tmp = write_csv(
            "Customer Claims,,\n\ncomplaint,customer,subject,part_code,date\nnoise,ACME,engine,X1,2023-01-01\ncrack,BETA,body,X2,2022-05-01\n",
        )?;
        let searcher = ClaimsSearcher::new(Some(tmp.path().to_path_buf()));

        let hits = searcher.search(&Filters::new().with("customer", "ACME"), Some(2023), None, None)?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["part_code"], Cell::from("X1"));

        assert_eq!(searcher.unique_values("customer")?, vec!["ACME", "BETA"]);
        assert_eq!(
            searcher.headers()?,
            vec!["complaint", "customer", "subject", "part_code", "date"]
        );
        Ok(())
    }

    #[test]
    fn missing_file_is_reported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let searcher = ClaimsSearcher::new(Some(dir.path().join("missing.xlsx")));

        let err = searcher.search(&Filters::new(), None, None, None).unwrap_err();
        assert!(source_error(&err).is_some_and(SourceError::is_not_found));

        let err = searcher.unique_values("customer").unwrap_err();
        assert!(matches!(source_error(&err), Some(SourceError::NotFound { .. })));
        Ok(())
    }

    /// Serializes tests that read or write `COMPLAINTS_XLSX_PATH`.
    static SOURCE_ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Run `f` with the source variable set to `value` (or removed), then
    /// restore whatever was there before.
    fn with_source_env<T>(value: Option<&OsStr>, f: impl FnOnce() -> T) -> T {
        let _guard = SOURCE_ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let previous = std::env::var_os(SOURCE_ENV);
        match value {
            Some(v) => std::env::set_var(SOURCE_ENV, v),
            None => std::env::remove_var(SOURCE_ENV),
        }
        let out = f();
        match previous {
            Some(v) => std::env::set_var(SOURCE_ENV, v),
            None => std::env::remove_var(SOURCE_ENV),
        }
        out
    }

    #[test]
    fn source_falls_back_to_env_path() -> Result<()> {
        let tmp = write_csv("complaint,customer,date\nnoise,ACME,2023-01-01\ncrack,BETA,2022-05-01\n")?;
        let searcher = with_source_env(Some(tmp.path().as_os_str()), || ClaimsSearcher::new(None));
        assert_eq!(searcher.path(), Some(tmp.path()));

        let hits = searcher.search(&Filters::new().with("customer", "BETA"), None, None, None)?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["date"], Cell::from("2022-05-01"));
        Ok(())
    }

    #[test]
    fn unset_location_is_reported() {
        let searcher = with_source_env(None, || ClaimsSearcher::from_config(&SearchConfig::default()));
        assert_eq!(searcher.path(), None);

        let err = searcher.search(&Filters::new(), Some(2023), None, None).unwrap_err();
        assert!(matches!(
            source_error(&err),
            Some(SourceError::NotConfigured { var: SOURCE_ENV })
        ));
        let err = searcher.unique_values("customer").unwrap_err();
        assert!(matches!(
            source_error(&err),
            Some(SourceError::NotConfigured { .. })
        ));
        assert!(searcher.headers().is_err());
    }

    #[test]
    fn empty_env_path_counts_as_unset() {
        let searcher = with_source_env(Some(OsStr::new("")), || ClaimsSearcher::new(None));
        assert_eq!(searcher.path(), None);
    }

    #[test]
    fn compact_csv_dates_match_their_year() -> Result<()> {
        let tmp = write_csv("complaint,customer,date\nnoise,ACME,20230101\ncrack,BETA,2023-05-01\nrattle,GAMMA,20220101\n")?;
        let searcher = ClaimsSearcher::new(Some(tmp.path().to_path_buf()));

        let hits = searcher.search(&Filters::new(), Some(2023), None, None)?;
        let customers: Vec<_> = hits.iter().map(|r| r["customer"].clone()).collect();
        assert_eq!(customers, vec![Cell::from("ACME"), Cell::from("BETA")]);

        let older = searcher.search(&Filters::new(), None, None, Some(2022))?;
        assert_eq!(older.len(), 1);
        assert_eq!(older[0]["customer"], Cell::from("GAMMA"));
        Ok(())
    }
}
