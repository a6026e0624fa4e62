use std::fmt;

use crate::model::Role;

/// Fatal errors. Any of these aborts the request before a report exists.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// The workbook could not be opened or a sheet could not be read.
    Workbook(String),
    /// A required sheet is absent from the workbook.
    SheetMissing { sheet: String, available: Vec<String> },
    /// A required column is absent from a sheet (after header trimming).
    MissingColumn { role: Role, sheet: String, column: String },
    /// The export spreadsheet could not be produced.
    Export(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workbook(msg) => write!(f, "cannot read workbook: {msg}"),
            Self::SheetMissing { sheet, available } => {
                if available.is_empty() {
                    write!(f, "sheet '{sheet}' not found (workbook has no sheets)")
                } else {
                    write!(f, "sheet '{sheet}' not found (available: {})", available.join(", "))
                }
            }
            Self::MissingColumn { role, sheet, column } => {
                write!(f, "{role} sheet '{sheet}': missing column '{column}'")
            }
            Self::Export(msg) => write!(f, "cannot build export: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl ReconError {
    /// Load errors are the fatal input-side failures.
    pub fn is_load_error(&self) -> bool {
        !matches!(self, Self::Export(_))
    }
}

/// Non-fatal: the filter pattern did not compile. Filtering is skipped.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FilterError {
    pub pattern: String,
    pub message: String,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid regular expression {:?}: {}", self.pattern, self.message)
    }
}

impl std::error::Error for FilterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_sheet_and_column() {
        let err = ReconError::MissingColumn {
            role: Role::Reception,
            sheet: "Reception".into(),
            column: "Qte recue (UVC)".into(),
        };
        assert_eq!(err.to_string(), "reception sheet 'Reception': missing column 'Qte recue (UVC)'");
        assert!(err.is_load_error());

        let err = ReconError::SheetMissing {
            sheet: "Inventaire".into(),
            available: vec!["Feuil1".into(), "Reception".into()],
        };
        assert_eq!(err.to_string(), "sheet 'Inventaire' not found (available: Feuil1, Reception)");
        assert!(!ReconError::Export("x".into()).is_load_error());
    }
}
