//! Extract one dated dispatch table from a worksheet
//!
//! Sheet layout (both partner formats):
//! - a few free-form title rows, then a header row containing "구분"
//! - data rows until a "합계" (total) row
//! - a per-format filter column that is blank or "0" on padding rows
//!
//! Glovis files: header row 4, filter column M ("오더").
//! Mobis files: filter column P.

use crate::workbook::Sheet;

use super::{Annotations, CellRef, SchemaType};

/// Label that identifies the header row
pub const HEADER_MARKER: &str = "구분";

/// First-column label of the totals row that ends the data block
pub const TOTAL_MARKER: &str = "합계";

/// How many rows from the top are searched for the header
const HEADER_SCAN_ROWS: u32 = 10;

/// Last row (1-based, inclusive) read as data
const MAX_DATA_ROW: u32 = 800;

/// Known header typos and abbreviations, corrected on read
const HEADER_SYNONYMS: &[(&str, &str)] = &[("당당자", "담당자"), ("T", "TYPE")];

/// Headers, rows and notes of one parsed sheet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub annotations: Annotations,
}

/// Zero-based column whose value marks a row as real data
pub fn filter_column(schema_type: SchemaType) -> u32 {
    match schema_type {
        SchemaType::Glovis => 12,
        SchemaType::Mobis => 15,
    }
}

/// Parse a date sheet into headers, data rows and cell notes
///
/// Returns `None` when no header row is found in the first rows; the caller
/// skips such sheets.
pub fn parse_sheet(sheet: &Sheet, schema_type: SchemaType) -> Option<ParsedSheet> {
    let header_row = find_header_row(sheet)?;

    let Some(last_col) = sheet.last_populated_col(header_row) else {
        return Some(ParsedSheet::default());
    };
    let width = last_col + 1;

    let headers: Vec<String> = (0..width)
        .map(|col| normalize_header(&sheet.cell(header_row, col).display_text(), col))
        .collect();

    let filter_col = filter_column(schema_type);
    let mut rows = Vec::new();
    let mut annotations = Annotations::new();

    for row in (header_row + 1)..MAX_DATA_ROW {
        if sheet.cell(row, 0).display_text().contains(TOTAL_MARKER) {
            break;
        }

        let filter_value = sheet.cell(row, filter_col).display_text();
        if filter_value.is_empty() || filter_value == "0" {
            continue;
        }

        let row_index = rows.len();
        let values: Vec<String> = (0..width).map(|col| sheet.cell(row, col).display_text()).collect();

        for col in 0..width {
            if let Some(note) = sheet.note(row, col) {
                let note = note.trim();
                if !note.is_empty() {
                    annotations.insert(CellRef::new(row_index, col as usize), note.to_string());
                }
            }
        }

        rows.push(values);
    }

    log::debug!(
        "Parsed sheet '{}' as {}: header row {}, {} columns, {} rows, {} notes",
        sheet.name,
        schema_type,
        header_row + 1,
        headers.len(),
        rows.len(),
        annotations.len()
    );

    Some(ParsedSheet {
        headers,
        rows,
        annotations,
    })
}

fn row_has_marker(sheet: &Sheet, row: u32) -> bool {
    match sheet.last_populated_col(row) {
        Some(last) => (0..=last).any(|col| sheet.cell(row, col).display_text().contains(HEADER_MARKER)),
        None => false,
    }
}

fn find_header_row(sheet: &Sheet) -> Option<u32> {
    let candidates: Vec<u32> = (0..HEADER_SCAN_ROWS)
        .filter(|&row| row_has_marker(sheet, row))
        .collect();

    match candidates.as_slice() {
        [] => {
            log::warn!(
                "Sheet '{}': no header row containing '{}' in the first {} rows",
                sheet.name,
                HEADER_MARKER,
                HEADER_SCAN_ROWS
            );
            None
        }
        [only] => Some(*only),
        [first, ..] => {
            log::warn!(
                "Sheet '{}': {} candidate header rows ({}), using row {}",
                sheet.name,
                candidates.len(),
                candidates
                    .iter()
                    .map(|r| (r + 1).to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                first + 1
            );
            Some(*first)
        }
    }
}

fn normalize_header(raw: &str, col: u32) -> String {
    let collapsed = raw.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let trimmed = collapsed.trim();

    if trimmed.is_empty() {
        return format!("col_{}", col + 1);
    }

    HEADER_SYNONYMS
        .iter()
        .find(|(from, _)| *from == trimmed)
        .map(|(_, to)| to.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
