use regex::{Regex, RegexBuilder};

use crate::error::FilterError;
use crate::model::ReconciledRow;

/// Compiled user filter. `None` inside means "keep everything".
#[derive(Debug, Clone)]
pub struct FilterPredicate {
    regex: Option<Regex>,
}

impl FilterPredicate {
    /// Compile `pattern` case-insensitively.
    ///
    /// An empty (or blank) pattern yields the identity predicate. A pattern
    /// that does not compile also yields the identity predicate, returned
    /// alongside the error so the caller can surface a warning.
    pub fn compile(pattern: &str) -> (Self, Option<FilterError>) {
        if pattern.trim().is_empty() {
            return (Self::identity(), None);
        }
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => (Self { regex: Some(regex) }, None),
            Err(e) => {
                let err = FilterError {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                };
                log::warn!("{err}; showing unfiltered rows");
                (Self::identity(), Some(err))
            }
        }
    }

    pub fn identity() -> Self {
        Self { regex: None }
    }

    pub fn is_identity(&self) -> bool {
        self.regex.is_none()
    }

    pub fn matches(&self, row: &ReconciledRow) -> bool {
        match &self.regex {
            None => true,
            Some(re) => {
                re.is_match(&row.code)
                    || re.is_match(&row.inventory_label)
                    || re.is_match(&row.reception_label)
            }
        }
    }

    pub fn apply(&self, rows: &[ReconciledRow]) -> Vec<ReconciledRow> {
        rows.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Output of [`filter_rows`]: retained rows plus an optional warning.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub rows: Vec<ReconciledRow>,
    pub warning: Option<FilterError>,
}

/// Keep rows whose code or either label contains a match for `pattern`.
pub fn filter_rows(pattern: &str, rows: &[ReconciledRow]) -> FilterOutcome {
    let (predicate, warning) = FilterPredicate::compile(pattern);
    let rows = predicate.apply(rows);
    FilterOutcome { rows, warning }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CanonicalRow, ReconciledRow};

    fn rows() -> Vec<ReconciledRow> {
        let inv = |code: &str, label: &str| CanonicalRow { code: code.into(), label: label.into(), quantity: 1 };
        vec![
            ReconciledRow::new("1001".into(), Some(&inv("1001", "Lait entier")), Some(&inv("1001", "Lait entier"))),
            ReconciledRow::new("2002".into(), Some(&inv("2002", "Beurre doux")), None),
            ReconciledRow::new("3003".into(), None, Some(&inv("3003", "Yaourt nature"))),
        ]
    }

    #[test]
    fn empty_pattern_is_identity() {
        let input = rows();
        let out = filter_rows("", &input);
        assert_eq!(out.rows, input);
        assert!(out.warning.is_none());
        assert_eq!(filter_rows("   ", &input).rows, input);
    }

    #[test]
    fn matches_code_or_either_label_case_insensitively() {
        let input = rows();
        let codes = |p: &str| -> Vec<String> { filter_rows(p, &input).rows.into_iter().map(|r| r.code).collect() };
        assert_eq!(codes("lait"), ["1001"]);
        assert_eq!(codes("BEURRE"), ["2002"]);
        assert_eq!(codes("yaourt"), ["3003"]);
        assert_eq!(codes("^[12]0"), ["1001", "2002"]);
        assert_eq!(codes("00"), ["1001", "2002", "3003"]);
        assert!(codes("fromage").is_empty());
    }

    #[test]
    fn invalid_pattern_warns_and_keeps_everything() {
        let input = rows();
        let out = filter_rows("(lait", &input);
        assert_eq!(out.rows, input);
        let warning = out.warning.expect("warning for unbalanced group");
        assert_eq!(warning.pattern, "(lait");
        assert!(warning.to_string().starts_with("invalid regular expression"));
        assert!(FilterPredicate::compile("(lait").0.is_identity());
        assert!(!FilterPredicate::compile("lait").0.is_identity());
    }
}
