use std::sync::OnceLock;

use regex::Regex;

use crate::model::RawCell;

/// Leading run of article-prefix tokens: a letter, digits, optional spacing.
fn prefix_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[A-Za-z]\d+\s*)+").expect("label prefix pattern is valid"))
}

/// Strip leading `<letter><digits>` tokens and surrounding whitespace.
///
/// `"A12 B34 Widget Deluxe"` becomes `"Widget Deluxe"`. Idempotent.
pub fn normalize_label(label: &str) -> String {
    let start = label.trim_start();
    prefix_pattern().replace(start, "").trim().to_string()
}

/// Normalize a label cell; absent or empty cells give an empty label.
pub fn normalize_cell(cell: Option<&RawCell>) -> String {
    match cell {
        Some(cell) => normalize_label(&cell.display_string()),
        None => String::new(),
    }
}
