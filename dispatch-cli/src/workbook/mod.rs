//! In-memory workbook model
//!
//! Sheets are addressed with zero-based absolute (row, column) positions, the
//! same way calamine reports them once the range start offset is applied.

mod loader;
mod notes;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

pub use loader::load_workbook;

/// Value of a single cell as read from the package
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    /// Plain or rich text; rich-text runs are already concatenated
    Text(String),
    Number(f64),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// `#REF!`, `#VALUE!` and friends
    Error(String),
    /// Formula cell carrying its cached result (`Empty` if never calculated)
    Formula(Box<CellValue>),
    /// Values with no meaningful flat rendering (durations and the like)
    Other,
}

static EMPTY: CellValue = CellValue::Empty;

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Formula(result) => result.is_empty(),
            _ => false,
        }
    }

    /// Render the value the way it is shown on the dispatch board
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(f) => format_number(*f),
            CellValue::Int(i) => i.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::DateTime(dt) => dt.date().format("%Y-%m-%d").to_string(),
            CellValue::Error(_) => String::new(),
            CellValue::Formula(result) => match result.as_ref() {
                // Nested formulas never come out of the loader
                CellValue::Formula(_) => String::new(),
                inner => inner.display_text(),
            },
            CellValue::Other => String::new(),
        }
    }
}

fn format_number(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// One worksheet: dense cell grid plus sparse cell notes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<CellValue>>,
    notes: HashMap<(u32, u32), String>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn set(&mut self, row: u32, col: u32, value: CellValue) {
        let (r, c) = (row as usize, col as usize);
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let cells = &mut self.rows[r];
        if cells.len() <= c {
            cells.resize(c + 1, CellValue::Empty);
        }
        cells[c] = value;
    }

    pub fn set_note(&mut self, row: u32, col: u32, text: impl Into<String>) {
        self.notes.insert((row, col), text.into());
    }

    /// Builder used by fixtures: text values laid out from column 0
    pub fn with_row(mut self, row: u32, values: &[&str]) -> Self {
        for (col, value) in values.iter().enumerate() {
            if !value.is_empty() {
                self.set(row, col as u32, CellValue::Text(value.to_string()));
            }
        }
        self
    }

    pub fn cell(&self, row: u32, col: u32) -> &CellValue {
        self.rows
            .get(row as usize)
            .and_then(|cells| cells.get(col as usize))
            .unwrap_or(&EMPTY)
    }

    pub fn note(&self, row: u32, col: u32) -> Option<&str> {
        self.notes.get(&(row, col)).map(|s| s.as_str())
    }

    /// Number of rows holding at least one stored cell slot
    pub fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Zero-based index of the last non-empty cell in a row
    pub fn last_populated_col(&self, row: u32) -> Option<u32> {
        self.rows
            .get(row as usize)?
            .iter()
            .rposition(|cell| !cell.is_empty())
            .map(|c| c as u32)
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }
}

/// All worksheets of a package, in workbook order
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text_renders_flat_strings() {
        assert_eq!(CellValue::Number(5.0).display_text(), "5");
        assert_eq!(CellValue::Number(2.5).display_text(), "2.5");
        assert_eq!(CellValue::Int(-3).display_text(), "-3");
        assert_eq!(CellValue::Bool(true).display_text(), "true");
        assert_eq!(
            CellValue::Date(NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()).display_text(),
            "2026-03-05"
        );
        assert_eq!(CellValue::Error("#REF!".into()).display_text(), "");
        assert_eq!(CellValue::Other.display_text(), "");
    }

    #[test]
    fn test_formula_renders_cached_result() {
        let cached = CellValue::Formula(Box::new(CellValue::Number(12.0)));
        assert_eq!(cached.display_text(), "12");

        let failed = CellValue::Formula(Box::new(CellValue::Error("#VALUE!".into())));
        assert_eq!(failed.display_text(), "");

        let uncalculated = CellValue::Formula(Box::new(CellValue::Empty));
        assert!(uncalculated.is_empty());
    }

    #[test]
    fn test_sheet_grid_access() {
        let mut sheet = Sheet::new("3.5").with_row(1, &["a", "", "c"]);
        sheet.set(4, 6, CellValue::Int(1));
        sheet.set_note(1, 2, "memo");

        assert_eq!(sheet.cell(1, 0), &CellValue::Text("a".into()));
        assert_eq!(sheet.cell(1, 1), &CellValue::Empty);
        assert_eq!(sheet.cell(99, 99), &CellValue::Empty);
        assert_eq!(sheet.last_populated_col(1), Some(2));
        assert_eq!(sheet.last_populated_col(0), None);
        assert_eq!(sheet.row_count(), 5);
        assert_eq!(sheet.note(1, 2), Some("memo"));
        assert_eq!(sheet.note(1, 0), None);
    }
}
