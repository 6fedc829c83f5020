// src/process/normalize.rs

use crate::source::Cell;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonical comparison key for header names, filter keys, filter values and
/// cell text.
///
/// Decomposes (NFKD) and drops combining marks, so `ş`, `ü`, `ç`, `é` fold to
/// their base letters; lowercases; maps the Turkish dotless `ı` to `i`; trims
/// and collapses runs of whitespace to a single space. Total and idempotent.
pub fn normalize(text: &str) -> String {
    let folded: String = strip_marks(text)
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ı' { 'i' } else { c })
        .collect();
    // lowercasing `İ` yields `i` + U+0307, so strip once more
    let folded: String = strip_marks(&folded).collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key for an arbitrary cell; null normalizes to the empty key.
pub fn normalize_cell(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => normalize(s),
        other => normalize(&other.to_string()),
    }
}

fn strip_marks(text: &str) -> impl Iterator<Item = char> + '_ {
    text.nfkd().filter(|c| !is_combining_mark(*c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_turkish_headers() {
        assert_eq!(normalize("Müşteri Şikayeti"), "musteri sikayeti");
        assert_eq!(normalize("Parça Numarası"), "parca numarasi");
        assert_eq!(normalize("HATA TARİHİ"), "hata tarihi");
        assert_eq!(normalize("Hata Tanımı - Kök Neden"), "hata tanimi - kok neden");
    }

    #[test]
    fn trims_and_collapses_whitespace() {
        assert_eq!(normalize("  PPM \t Adet \n"), "ppm adet");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn case_and_diacritics_insensitive() {
        assert_eq!(normalize("ŞİKAYET"), normalize("sikayet"));
        assert_eq!(normalize("Café"), normalize("CAFE"));
        assert_eq!(normalize("cafe\u{0301}"), normalize("caf\u{00E9}"));
        assert_eq!(normalize("Ğüç"), "guc");
    }

    #[test]
    fn idempotent() {
        let samples = [
            "Müşteri Adı",
            "İSTANBUL",
            "ıiIİ",
            "  ℌello   Wörld ",
            "ﬁnance",
            "Ⅻ",
            "ß straße",
            "x\u{0307}\u{0327}y",
            "",
            "2023-01-01 00:00:00",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn cells_normalize_through_display() {
        assert_eq!(normalize_cell(&Cell::Empty), "");
        assert_eq!(normalize_cell(&Cell::Int(1)), "1");
        assert_eq!(normalize_cell(&Cell::from(" ACME ")), "acme");
        assert_eq!(normalize_cell(&Cell::Bool(true)), "true");
    }
}
