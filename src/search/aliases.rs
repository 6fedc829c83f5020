// src/search/aliases.rs

use crate::process::normalize::normalize;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Query aliases → header names used in the claims workbook.
const DEFAULT_ALIAS_PAIRS: &[(&str, &str)] = &[
    ("customer", "Müşteri Adı"),
    ("musteri", "Müşteri Adı"),
    ("müşteri adı", "Müşteri Adı"),
    ("musteri adi", "Müşteri Adı"),
    ("subject", "Hata Tanımı - Kök Neden"),
    ("konu", "Konu"),
    ("hata tanımı - kök neden", "Hata Tanımı - Kök Neden"),
    ("part_code", "Parça Numarası"),
    ("parca kodu", "Parça Numarası"),
    ("parça kodu", "Parça Numarası"),
    ("parça numarası", "Parça Numarası"),
];

static DEFAULT_ALIASES: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    DEFAULT_ALIAS_PAIRS
        .iter()
        .map(|(alias, header)| (normalize(alias), header.to_string()))
        .collect()
});

pub fn default_aliases() -> BTreeMap<String, String> {
    DEFAULT_ALIASES.clone()
}

/// Caller-side mapping from user-facing field names to header names.
///
/// The search core never consults this; front ends resolve fields before
/// calling `search` or `unique_values`.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    map: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new(aliases: &BTreeMap<String, String>) -> Self {
        Self {
            map: aliases
                .iter()
                .map(|(alias, header)| (normalize(alias), header.clone()))
                .collect(),
        }
    }

    /// Header name for `field`, or `field` itself when no alias applies.
    pub fn resolve<'a>(&'a self, field: &'a str) -> &'a str {
        self.map
            .get(&normalize(field))
            .map(String::as_str)
            .unwrap_or(field)
    }
}
