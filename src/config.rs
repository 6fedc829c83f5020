// src/config.rs

use crate::process::date_parser::DEFAULT_DATE_ALIASES;
use crate::process::fuzzy::{DEFAULT_FREE_TEXT_FIELDS, DEFAULT_SIMILARITY_THRESHOLD};
use crate::process::header::DEFAULT_HEADER_MIN_CELLS;
use crate::process::similarity::SimilarityKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the claims file.
pub const SOURCE_ENV: &str = "COMPLAINTS_XLSX_PATH";

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "CLAIMSEARCH_CONFIG";

/// Searcher settings. Every field has a default, so an empty YAML document
/// is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Claims file; falls back to `COMPLAINTS_XLSX_PATH` when unset.
    pub source: Option<PathBuf>,
    /// Worksheet for workbook sources; the first sheet when unset.
    pub sheet: Option<String>,
    pub header_min_cells: usize,
    /// Date column names, highest priority first.
    pub date_aliases: Vec<String>,
    pub free_text_fields: Vec<String>,
    pub similarity_threshold: f64,
    pub similarity: SimilarityKind,
    /// User-facing field alias → header name, applied by callers.
    pub aliases: BTreeMap<String, String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            source: None,
            sheet: None,
            header_min_cells: DEFAULT_HEADER_MIN_CELLS,
            date_aliases: DEFAULT_DATE_ALIASES.iter().map(|s| s.to_string()).collect(),
            free_text_fields: DEFAULT_FREE_TEXT_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            similarity: SimilarityKind::default(),
            aliases: crate::search::aliases::default_aliases(),
        }
    }
}

impl SearchConfig {
    /// Parse a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: SearchConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Config named by `CLAIMSEARCH_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    /// Explicit `source`, else `COMPLAINTS_XLSX_PATH`. Existence is checked
    /// later, when a search runs.
    pub fn resolve_source(&self) -> Option<PathBuf> {
        self.source
            .clone()
            .or_else(|| std::env::var_os(SOURCE_ENV).map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty())
    }
}
