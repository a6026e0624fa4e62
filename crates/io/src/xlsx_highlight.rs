// Row-highlight conditional formatting for report export and read-back
//
// Export: one expression rule per non-empty sheet, `=$G2<>0` anchored at the
// first data row and applied to every data row across all columns, so Excel
// paints whole rows whose Diff cell is non-zero.
// Read-back: parse <conditionalFormatting> blocks out of the worksheet XML
// and evaluate them against cell values to recover the rows a spreadsheet
// viewer would highlight.

use std::io::{Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use rust_xlsxwriter::{Color, ConditionalFormatFormula, Format};
use stockcheck_recon::view::DELTA_COLUMN;
use stockcheck_recon::RawCell;
use zip::ZipArchive;

use crate::xlsx_styles::unescape_xml;

// ============================================================================
// Export
// ============================================================================

/// Formula for the highlight rule, relative to the first data row (row 2).
pub fn highlight_formula() -> String {
    format!("=${}2<>0", col_to_letters(DELTA_COLUMN))
}

/// Conditional format that paints a row with `rgb` when its Diff is non-zero.
pub fn highlight_rule(rgb: u32) -> ConditionalFormatFormula {
    let format = Format::new().set_background_color(Color::RGB(rgb));
    ConditionalFormatFormula::new()
        .set_rule(highlight_formula().as_str())
        .set_format(format)
}

/// Convert a 0-based column index to letters (0 = A, 26 = AA).
pub(crate) fn col_to_letters(mut col: usize) -> String {
    let mut result = String::new();
    loop {
        result.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

// ============================================================================
// Import
// ============================================================================

/// A rectangular cell range, 0-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl CellRange {
    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.start_row && row <= self.end_row
    }

    pub fn spans_columns(&self, first: usize, last: usize) -> bool {
        self.start_col <= first && self.end_col >= last
    }
}

/// One expression rule read back from a worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRule {
    pub ranges: Vec<CellRange>,
    /// Formula text without the leading `=`, entities decoded.
    pub formula: String,
    pub dxf_id: Option<usize>,
    /// Fill color of the referenced dxf, resolved against styles.xml.
    pub fill_rgb: Option<u32>,
}

/// `$G2<>0` style test: one cell compared against zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonZeroTest {
    pub col: usize,
    pub col_absolute: bool,
    pub row: usize,
    pub row_absolute: bool,
}

impl HighlightRule {
    /// Parse the formula as a non-zero test. `None` for any other formula.
    pub fn non_zero_test(&self) -> Option<NonZeroTest> {
        parse_non_zero_test(&self.formula)
    }

    /// Evaluate the rule for one cell at sheet position (`row`, `col`).
    ///
    /// `cell_at` resolves the referenced cell. Relative references shift by
    /// the offset from the top-left of the first range, as Excel does.
    pub fn applies_to<'a, F>(&self, row: usize, col: usize, cell_at: F) -> bool
    where
        F: Fn(usize, usize) -> Option<&'a RawCell>,
    {
        let covered = self
            .ranges
            .iter()
            .any(|r| r.contains_row(row) && col >= r.start_col && col <= r.end_col);
        if !covered {
            return false;
        }
        let (Some(anchor), Some(test)) = (self.ranges.first(), self.non_zero_test()) else {
            return false;
        };

        let ref_row = if test.row_absolute {
            test.row
        } else {
            (test.row + row).checked_sub(anchor.start_row).unwrap_or(usize::MAX)
        };
        let ref_col = if test.col_absolute {
            test.col
        } else {
            (test.col + col).checked_sub(anchor.start_col).unwrap_or(usize::MAX)
        };

        match cell_at(ref_row, ref_col) {
            Some(RawCell::Number(n)) => *n != 0.0,
            Some(RawCell::Bool(b)) => *b,
            Some(RawCell::Text(s)) => !s.is_empty(),
            Some(RawCell::Empty) | None => false,
        }
    }
}

fn parse_non_zero_test(formula: &str) -> Option<NonZeroTest> {
    use std::sync::OnceLock;
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*(\$?)([A-Za-z]{1,3})(\$?)(\d+)\s*<>\s*0\s*$").expect("valid regex")
    });
    let caps = re.captures(formula.trim_start_matches('='))?;
    let col = col_from_letters(&caps[2])?;
    let row: usize = caps[4].parse().ok()?;
    Some(NonZeroTest {
        col,
        col_absolute: !caps[1].is_empty(),
        row: row.checked_sub(1)?,
        row_absolute: !caps[3].is_empty(),
    })
}

/// Read the expression rules of one sheet, with fills resolved.
pub fn parse_sheet_highlights<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_name: &str,
) -> Result<Vec<HighlightRule>, String> {
    let sheet_path = find_worksheet_xml_path(archive, sheet_name)?;
    let sheet_xml = read_zip_file(archive, &sheet_path)?;
    let mut rules = parse_rules_from_xml(&sheet_xml)?;

    if rules.iter().any(|r| r.dxf_id.is_some()) {
        let styles_xml = read_zip_file(archive, "xl/styles.xml")?;
        let fills = crate::xlsx_styles::parse_dxf_fills(&styles_xml)?;
        for rule in &mut rules {
            rule.fill_rgb = rule.dxf_id.and_then(|id| fills.get(id).copied().flatten());
        }
    }

    Ok(rules)
}

/// Find the worksheet XML path for a sheet by name
fn find_worksheet_xml_path<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_name: &str,
) -> Result<String, String> {
    let workbook_xml = read_zip_file(archive, "xl/workbook.xml")?;
    let rid = find_sheet_rid(&workbook_xml, sheet_name)?;

    let rels_xml = read_zip_file(archive, "xl/_rels/workbook.xml.rels")?;
    let target = find_relationship_target(&rels_xml, &rid)?;

    // Targets are relative to xl/ unless rooted
    match target.strip_prefix('/') {
        Some(rooted) => Ok(rooted.to_string()),
        None => Ok(format!("xl/{}", target)),
    }
}

fn find_sheet_rid(workbook_xml: &str, sheet_name: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rid = None;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => {
                            name = Some(unescape_xml(&String::from_utf8_lossy(&attr.value)));
                        }
                        b"r:id" => {
                            rid = Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                        _ => {}
                    }
                }

                if name.as_deref() == Some(sheet_name) {
                    if let Some(r) = rid {
                        return Ok(r);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Err(format!("Sheet '{}' not found in workbook.xml", sheet_name))
}

fn find_relationship_target(rels_xml: &str, rid: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"Target" => target = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        _ => {}
                    }
                }

                if id.as_deref() == Some(rid) {
                    if let Some(t) = target {
                        return Ok(t);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Err(format!("Relationship '{}' not found", rid))
}

pub(crate) fn read_zip_file<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<String, String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| format!("File '{}' not found in XLSX: {}", path, e))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;

    Ok(content)
}

/// Parse `<conditionalFormatting>` blocks, keeping expression rules only.
fn parse_rules_from_xml(xml: &str) -> Result<Vec<HighlightRule>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut rules = Vec::new();
    let mut buf = Vec::new();

    let mut current_ranges: Vec<CellRange> = Vec::new();
    let mut in_block = false;
    // (is_expression, dxf_id) of the open cfRule
    let mut current_rule: Option<(bool, Option<usize>)> = None;
    let mut in_formula = false;
    let mut formula_text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"conditionalFormatting" => {
                in_block = true;
                current_ranges.clear();
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"sqref" {
                        current_ranges = parse_sqref(&String::from_utf8_lossy(&attr.value));
                    }
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"conditionalFormatting" => {
                in_block = false;
            }
            Ok(Event::Start(ref e)) if in_block && e.name().as_ref() == b"cfRule" => {
                let mut is_expression = false;
                let mut dxf_id = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"type" => is_expression = attr.value.as_ref() == b"expression",
                        b"dxfId" => dxf_id = String::from_utf8_lossy(&attr.value).parse().ok(),
                        _ => {}
                    }
                }
                current_rule = Some((is_expression, dxf_id));
                formula_text.clear();
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"cfRule" => {
                if let Some((true, dxf_id)) = current_rule.take() {
                    rules.push(HighlightRule {
                        ranges: current_ranges.clone(),
                        formula: unescape_xml(&formula_text),
                        dxf_id,
                        fill_rgb: None,
                    });
                }
            }
            Ok(Event::Start(ref e)) if current_rule.is_some() && e.name().as_ref() == b"formula" => {
                in_formula = true;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"formula" => {
                in_formula = false;
            }
            // Kept raw and decoded once at the end; entity references may
            // arrive as separate events.
            Ok(Event::Text(ref e)) if in_formula => {
                formula_text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::GeneralRef(ref e)) if in_formula => {
                formula_text.push('&');
                formula_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                formula_text.push(';');
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rules)
}

/// Parse space-separated sqref (e.g., "A1:B10 D1:D10")
fn parse_sqref(sqref: &str) -> Vec<CellRange> {
    sqref.split_whitespace().filter_map(parse_single_range).collect()
}

fn parse_single_range(range_str: &str) -> Option<CellRange> {
    let (start, end) = match range_str.split_once(':') {
        Some((a, b)) => (parse_cell_ref(a)?, parse_cell_ref(b)?),
        None => {
            let cell = parse_cell_ref(range_str)?;
            (cell, cell)
        }
    };
    Some(CellRange {
        start_row: start.0,
        start_col: start.1,
        end_row: end.0,
        end_col: end.1,
    })
}

/// Parse a cell reference like "A1" or "$B$5" to 0-based (row, col)
fn parse_cell_ref(cell_ref: &str) -> Option<(usize, usize)> {
    let cell_ref = cell_ref.replace('$', "");
    let cell_ref = cell_ref.trim();

    let col_end = cell_ref.find(|c: char| c.is_ascii_digit())?;
    if col_end == 0 {
        return None;
    }

    let col = col_from_letters(&cell_ref[..col_end])?;
    let row: usize = cell_ref[col_end..].parse().ok()?;

    // Excel rows are 1-indexed
    Some((row.checked_sub(1)?, col))
}

fn col_from_letters(letters: &str) -> Option<usize> {
    let mut col = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    col.checked_sub(1)
}
