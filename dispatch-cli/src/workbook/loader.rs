//! Parse `.xlsx` bytes into the in-memory [`Workbook`] model

use std::collections::HashSet;
use std::io::Cursor;

use anyhow::{Context, Result};
use calamine::{Data, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};

use super::notes::read_sheet_notes;
use super::{CellValue, Sheet, Workbook};

/// Load every worksheet of an `.xlsx` package
///
/// Values come from calamine (formula cells resolve to their cached result);
/// cell notes are read separately since calamine does not expose them. A
/// package whose notes cannot be read still loads, without notes.
pub fn load_workbook(bytes: &[u8]) -> Result<Workbook> {
    let mut xlsx: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).context("Failed to open workbook package")?;

    let mut notes = read_sheet_notes(bytes).unwrap_or_else(|e| {
        log::warn!("Ignoring cell notes: {:#}", e);
        Default::default()
    });

    let mut sheets = Vec::new();
    for sheet_name in xlsx.sheet_names() {
        let range = xlsx
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

        // Formula positions let us mark cached results; a sheet whose formula
        // part cannot be read is still usable through its values.
        let formula_cells: HashSet<(u32, u32)> = match xlsx.worksheet_formula(&sheet_name) {
            Ok(formulas) => {
                let (r0, c0) = formulas.start().unwrap_or((0, 0));
                formulas
                    .used_cells()
                    .filter(|(_, _, f)| !f.is_empty())
                    .map(|(r, c, _)| (r0 + r as u32, c0 + c as u32))
                    .collect()
            }
            Err(e) => {
                log::debug!("No formulas read for sheet '{}': {}", sheet_name, e);
                HashSet::new()
            }
        };

        let mut sheet = Sheet::new(sheet_name.clone());
        let (r0, c0) = range.start().unwrap_or((0, 0));
        for (r, c, data) in range.used_cells() {
            let pos = (r0 + r as u32, c0 + c as u32);
            let value = cell_from_data(data);
            let value = if formula_cells.contains(&pos) {
                CellValue::Formula(Box::new(value))
            } else {
                value
            };
            sheet.set(pos.0, pos.1, value);
        }

        // Formulas without a cached value never show up in the value range
        for &(row, col) in &formula_cells {
            if matches!(sheet.cell(row, col), CellValue::Empty) {
                sheet.set(row, col, CellValue::Formula(Box::new(CellValue::Empty)));
            }
        }

        if let Some(sheet_notes) = notes.remove(&sheet_name) {
            for ((row, col), text) in sheet_notes {
                sheet.set_note(row, col, text);
            }
        }

        log::debug!(
            "Loaded sheet '{}' ({} rows, {} notes)",
            sheet.name,
            sheet.row_count(),
            sheet.note_count()
        );
        sheets.push(sheet);
    }

    Ok(Workbook { sheets })
}

/// Convert a calamine cell to the board's value model
fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                return CellValue::Other;
            }
            match dt.as_datetime() {
                Some(value) => CellValue::DateTime(value),
                None => CellValue::Other,
            }
        }
        Data::DateTimeIso(s) => parse_iso(s),
        Data::DurationIso(_) => CellValue::Other,
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}

fn parse_iso(s: &str) -> CellValue {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return CellValue::DateTime(dt);
    }
    match NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d") {
        Ok(d) => CellValue::Date(d),
        Err(_) => CellValue::Other,
    }
}
