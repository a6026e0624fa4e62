// Excel workbook import (xlsx, xls, xlsb, ods) and report export (xlsx only)
//
// Import: every sheet becomes a RawSheet; the first row is the header row.
// Export: one sheet per partition, header bolded, rows with a non-zero Diff
//         painted by a conditional-format rule so the highlight survives
//         edits in Excel.
// Read-back: values through calamine, highlight rules through the raw XML.

use std::io::Cursor;
use std::time::Instant;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};
use stockcheck_recon::view::{row_cells, COLUMNS, DELTA_COLUMN};
use stockcheck_recon::{
    Membership, Partitions, RawCell, RawSheet, RawWorkbook, ReconError, ReconciledRow,
    DEFAULT_HIGHLIGHT_RGB,
};
use zip::ZipArchive;

use crate::xlsx_highlight::{self, HighlightRule};

/// Per-sheet import statistics
#[derive(Debug, Default, Clone)]
pub struct SheetStats {
    pub name: String,
    pub rows_imported: usize,
    pub cols_imported: usize,
}

/// Result of an Excel import operation
#[derive(Debug, Default)]
pub struct ImportResult {
    pub sheet_stats: Vec<SheetStats>,
    pub import_duration_ms: u128,
}

/// Read a workbook from memory. Format is detected from content.
pub fn read_workbook(bytes: &[u8]) -> Result<(RawWorkbook, ImportResult), ReconError> {
    let start_time = Instant::now();

    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ReconError::Workbook(format!("failed to open workbook: {}", e)))?;

    let mut result = ImportResult::default();
    let mut sheets = Vec::new();
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| ReconError::Workbook(format!("failed to read sheet '{}': {}", sheet_name, e)))?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row.iter().map(|d| data_to_cell(d).display_string()).collect(),
            None => Vec::new(),
        };
        let body: Vec<Vec<RawCell>> = rows.map(|row| row.iter().map(data_to_cell).collect()).collect();

        log::debug!("sheet '{}': {} column(s), {} data row(s)", sheet_name, headers.len(), body.len());
        result.sheet_stats.push(SheetStats {
            name: sheet_name.clone(),
            rows_imported: body.len(),
            cols_imported: headers.len(),
        });
        sheets.push(RawSheet::new(sheet_name.as_str(), headers, body));
    }

    result.import_duration_ms = start_time.elapsed().as_millis();
    Ok((RawWorkbook { sheets }, result))
}

fn data_to_cell(data: &Data) -> RawCell {
    match data {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Bool(b) => RawCell::Bool(*b),
        // Serial date numbers; reconciliation never reads dates
        Data::DateTime(dt) => RawCell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Error(e) => RawCell::Text(format!("#{:?}", e)),
    }
}

// ============================================================================
// Export
// ============================================================================

/// Presentation knobs for the report workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Fill color (0xRRGGBB) for rows with a non-zero Diff
    pub highlight_rgb: u32,
    pub freeze_header: bool,
    pub autofilter: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            highlight_rgb: DEFAULT_HIGHLIGHT_RGB,
            freeze_header: true,
            autofilter: true,
        }
    }
}

/// Result of a report export
#[derive(Debug, Default, Clone)]
pub struct ExportResult {
    pub sheets_exported: usize,
    pub rows_exported: usize,
    pub rules_exported: usize,
    pub export_duration_ms: u128,
}

/// Column width bounds, in characters
const MIN_COL_WIDTH: usize = 8;
const MAX_COL_WIDTH: usize = 48;

/// Build the report workbook in memory.
///
/// Sheets come out in partition order (common, inventory only, reception
/// only) and always exist, even when empty.
pub fn export_report(
    partitions: &Partitions,
    options: &ExportOptions,
) -> Result<(Vec<u8>, ExportResult), ReconError> {
    let start_time = Instant::now();
    let mut result = ExportResult::default();
    let mut xlsx_workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    for (membership, rows) in partitions.iter() {
        let worksheet = xlsx_workbook
            .add_worksheet()
            .set_name(membership.sheet_name())
            .map_err(|e| export_error(format!("failed to create sheet '{}': {}", membership.sheet_name(), e)))?;

        write_partition(worksheet, rows, &header_format)?;

        if !rows.is_empty() {
            let rule = xlsx_highlight::highlight_rule(options.highlight_rgb);
            worksheet
                .add_conditional_format(1, 0, rows.len() as u32, (COLUMNS.len() - 1) as u16, &rule)
                .map_err(|e| export_error(format!("failed to add highlight rule: {}", e)))?;
            result.rules_exported += 1;
        }

        if options.freeze_header {
            worksheet
                .set_freeze_panes(1, 0)
                .map_err(|e| export_error(format!("failed to freeze header: {}", e)))?;
        }
        if options.autofilter {
            worksheet
                .autofilter(0, 0, rows.len() as u32, (COLUMNS.len() - 1) as u16)
                .map_err(|e| export_error(format!("failed to set autofilter: {}", e)))?;
        }

        result.rows_exported += rows.len();
        result.sheets_exported += 1;
    }

    let bytes = xlsx_workbook
        .save_to_buffer()
        .map_err(|e| export_error(format!("failed to save workbook: {}", e)))?;

    result.export_duration_ms = start_time.elapsed().as_millis();
    log::debug!(
        "exported {} row(s) across {} sheet(s), {} highlight rule(s)",
        result.rows_exported,
        result.sheets_exported,
        result.rules_exported
    );
    Ok((bytes, result))
}

fn write_partition(
    worksheet: &mut Worksheet,
    rows: &[ReconciledRow],
    header_format: &Format,
) -> Result<(), ReconError> {
    let write_err = |e: rust_xlsxwriter::XlsxError| export_error(format!("failed to write cell: {}", e));
    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.chars().count()).collect();

    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *name, header_format)
            .map_err(write_err)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        // Codes stay text so leading zeros survive
        worksheet.write_string(r, 0, &row.code).map_err(write_err)?;
        if !row.inventory_label.is_empty() {
            worksheet.write_string(r, 1, &row.inventory_label).map_err(write_err)?;
        }
        if !row.reception_label.is_empty() {
            worksheet.write_string(r, 2, &row.reception_label).map_err(write_err)?;
        }
        worksheet.write_number(r, 3, row.inventory_quantity as f64).map_err(write_err)?;
        worksheet.write_number(r, 4, row.reception_quantity as f64).map_err(write_err)?;
        worksheet.write_string(r, 5, row.membership.label()).map_err(write_err)?;
        worksheet.write_number(r, DELTA_COLUMN as u16, row.delta as f64).map_err(write_err)?;

        for (col, cell) in row_cells(row).iter().enumerate() {
            widths[col] = widths[col].max(cell.chars().count());
        }
    }

    for (col, width) in widths.iter().enumerate() {
        let width = (*width).clamp(MIN_COL_WIDTH, MAX_COL_WIDTH) + 2;
        worksheet
            .set_column_width(col as u16, width as f64)
            .map_err(write_err)?;
    }

    Ok(())
}

fn export_error(message: String) -> ReconError {
    ReconError::Export(message)
}

// ============================================================================
// Read-back
// ============================================================================

/// One report sheet read back from an exported workbook
#[derive(Debug, Clone)]
pub struct ExportedSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<ReconciledRow>,
    pub rules: Vec<HighlightRule>,
    /// Data row indices (0-based, header excluded) painted across every
    /// column by at least one rule
    pub flagged: Vec<usize>,
}

impl ExportedSheet {
    /// Fill color of the first rule painting `row`, if any
    pub fn fill_for(&self, row: usize) -> Option<u32> {
        if !self.flagged.contains(&row) {
            return None;
        }
        self.rules.iter().find_map(|r| r.fill_rgb)
    }
}

/// Read a report workbook back: rows, highlight rules and flagged rows.
pub fn read_export(bytes: &[u8]) -> Result<Vec<ExportedSheet>, ReconError> {
    let (workbook, _) = read_workbook(bytes)?;
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ReconError::Workbook(format!("not an xlsx archive: {}", e)))?;

    let mut sheets = Vec::new();
    for sheet in &workbook.sheets {
        let rules = xlsx_highlight::parse_sheet_highlights(&mut archive, &sheet.name)
            .map_err(ReconError::Workbook)?;

        let rows = sheet
            .rows
            .iter()
            .enumerate()
            .map(|(i, cells)| exported_row(&sheet.name, i, cells))
            .collect::<Result<Vec<_>, _>>()?;

        // Sheet rows are offset by the header row
        let cell_at = |r: usize, c: usize| {
            r.checked_sub(1).and_then(|r| sheet.rows.get(r)).and_then(|row| row.get(c))
        };
        let flagged = (0..rows.len())
            .filter(|&i| {
                (0..COLUMNS.len()).all(|col| rules.iter().any(|rule| rule.applies_to(i + 1, col, cell_at)))
            })
            .collect();

        sheets.push(ExportedSheet {
            name: sheet.name.clone(),
            headers: sheet.headers.clone(),
            rows,
            rules,
            flagged,
        });
    }
    Ok(sheets)
}

fn exported_row(sheet: &str, index: usize, cells: &[RawCell]) -> Result<ReconciledRow, ReconError> {
    let cell = |col: usize| cells.get(col).cloned().unwrap_or(RawCell::Empty);
    let number = |col: usize| -> Result<i64, ReconError> {
        match cell(col) {
            RawCell::Number(n) => Ok(n as i64),
            RawCell::Empty => Ok(0),
            other => Err(ReconError::Workbook(format!(
                "sheet '{}' row {}: expected a number in column {}, found {:?}",
                sheet,
                index + 2,
                COLUMNS[col],
                other.display_string()
            ))),
        }
    };

    let membership_text = cell(5).display_string();
    let membership = Membership::from_label(&membership_text).ok_or_else(|| {
        ReconError::Workbook(format!(
            "sheet '{}' row {}: unknown membership {:?}",
            sheet,
            index + 2,
            membership_text
        ))
    })?;

    Ok(ReconciledRow {
        code: cell(0).display_string(),
        inventory_label: cell(1).display_string(),
        reception_label: cell(2).display_string(),
        inventory_quantity: number(3)?,
        reception_quantity: number(4)?,
        membership,
        delta: number(DELTA_COLUMN)?,
    })
}
