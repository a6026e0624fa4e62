//! Projection of a raw sheet onto canonical `(code, label, quantity)` rows.

use crate::error::ReconError;
use crate::label::normalize_cell;
use crate::model::{
    CanonicalRow, LoadStats, LoadedTable, RawCell, RawSheet, RawWorkbook, Role, SourceRow,
    CODE_COLUMN, LABEL_COLUMN, MAX_QUANTITY,
};

/// Find the sheet for `role` and project it.
pub fn load_role(workbook: &RawWorkbook, role: Role) -> Result<LoadedTable, ReconError> {
    let sheet = workbook.sheet(role.sheet_name()).ok_or_else(|| ReconError::SheetMissing {
        sheet: role.sheet_name().to_string(),
        available: workbook.sheet_names().into_iter().map(String::from).collect(),
    })?;
    project_sheet(role, sheet)
}

/// Project a raw sheet into canonical rows, preserving input order.
///
/// Rows with a blank code are dropped. Duplicate codes are kept.
pub fn project_sheet(role: Role, sheet: &RawSheet) -> Result<LoadedTable, ReconError> {
    let missing = |column: &str| ReconError::MissingColumn {
        role,
        sheet: sheet.name.clone(),
        column: column.to_string(),
    };

    let code_idx = sheet.column(CODE_COLUMN).ok_or_else(|| missing(CODE_COLUMN))?;
    let qty_idx = sheet
        .column(role.quantity_column())
        .ok_or_else(|| missing(role.quantity_column()))?;
    let label_idx = sheet.column(LABEL_COLUMN);

    let mut stats = LoadStats {
        has_label_column: label_idx.is_some(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(sheet.rows.len());

    for raw in &sheet.rows {
        stats.rows_read += 1;
        let source = SourceRow {
            code: raw.get(code_idx).unwrap_or(&RawCell::Empty),
            label: label_idx.and_then(|i| raw.get(i)),
            quantity: raw.get(qty_idx),
        };

        let code = source.code.display_string().trim().to_string();
        if code.is_empty() {
            stats.blank_codes_dropped += 1;
            continue;
        }

        let quantity = match source.quantity {
            None => 0,
            Some(cell) if cell.is_empty() => 0,
            Some(cell) => coerce_quantity(cell).unwrap_or_else(|| {
                stats.quantities_coerced += 1;
                0
            }),
        };

        rows.push(CanonicalRow {
            code,
            label: normalize_cell(source.label),
            quantity,
        });
    }

    stats.rows_kept = rows.len();
    if stats.blank_codes_dropped > 0 {
        log::warn!(
            "{role} sheet '{}': dropped {} row(s) with a blank '{CODE_COLUMN}'",
            sheet.name,
            stats.blank_codes_dropped
        );
    }
    log::debug!(
        "{role} sheet '{}': {} row(s) read, {} kept, {} quantity cell(s) coerced to 0",
        sheet.name,
        stats.rows_read,
        stats.rows_kept,
        stats.quantities_coerced
    );

    Ok(LoadedTable { role, rows, stats })
}

/// Integer quantity for a non-empty cell, or `None` when it is not numeric.
///
/// Fractions round half away from zero. Text accepts a decimal comma.
/// Magnitudes above [`MAX_QUANTITY`] are treated as non-numeric.
pub fn coerce_quantity(cell: &RawCell) -> Option<i64> {
    let value = match cell {
        RawCell::Number(n) => *n,
        RawCell::Text(s) => parse_numeric_text(s)?,
        RawCell::Empty | RawCell::Bool(_) => return None,
    };
    let rounded = value.round();
    if !rounded.is_finite() || rounded.abs() > MAX_QUANTITY as f64 {
        return None;
    }
    Some(rounded as i64)
}

fn parse_numeric_text(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return Some(v);
    }
    if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
        return trimmed.replace(',', ".").parse::<f64>().ok();
    }
    None
}
