//! OCR text normalization.
//!
//! OCR engines regularly read the thousands separator of a yen amount as a
//! period (`\1.234.567`). [`normalize`] rewrites every period-delimited
//! three-digit group back to a comma, repeating until nothing changes so
//! that multi-group numbers normalize completely.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DOTTED_GROUP: Regex = Regex::new(r"(\d)\.(\d{3})(\D|$)").unwrap();
}

/// Rewrite period-delimited three-digit groups as comma-delimited ones.
///
/// `\100.000` becomes `\100,000` and `1.234.567` becomes `1,234,567`.
/// A period followed by more or fewer than three digits is left alone, so
/// dates such as `2024.11.24` pass through unchanged. Idempotent.
pub fn normalize(text: &str) -> String {
    let mut current = text.to_string();

    // Each pass shortens nothing and converts at least one period, so the
    // number of periods bounds the loop.
    for _ in 0..=current.matches('.').count() {
        let next = DOTTED_GROUP.replace_all(&current, "${1},${2}${3}");
        if next == current {
            break;
        }
        current = next.into_owned();
    }

    current
}

/// Split text into trimmed lines, keeping blank lines and line order.
///
/// Whitespace inside a line is preserved: structural extractors rely on the
/// original column layout.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r').trim().to_string())
        .collect()
}

/// Fold full-width ASCII variants (`１２３`, `ＡＢＣ`, `：`) and the
/// ideographic space to their half-width forms.
pub fn fold_width(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{3000}' => ' ',
            '\u{ff01}'..='\u{ff5e}' => char::from_u32(c as u32 - 0xfee0).unwrap_or(c),
            _ => c,
        })
        .collect()
}
