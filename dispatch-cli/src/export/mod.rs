//! Write dispatch board reads to `.xlsx`
//!
//! Only data goes out: headers, rows and cell notes. Layout follows the board
//! downloads: one sheet for a single date, or one "전체" sheet with a leading
//! date label column for every date, newest first.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{Note, Workbook, Worksheet};
use sqlx::SqlitePool;

use crate::dispatch::{
    Annotations, DispatchView, SchemaType, SnapshotFilter, ViewType, read_view,
};

const ALL_SHEET_NAME: &str = "전체";
const DATE_COLUMN: &str = "날짜";
const WEEKDAYS: [&str; 7] = ["일", "월", "화", "수", "목", "금", "토"];

/// Which dates end up in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    Date(NaiveDate),
    All { month: Option<u32> },
}

impl ExportScope {
    pub fn filter(&self) -> SnapshotFilter {
        match self {
            ExportScope::Date(date) => SnapshotFilter::on(*date),
            ExportScope::All { month: Some(m) } => SnapshotFilter::month(*m),
            ExportScope::All { month: None } => SnapshotFilter::default(),
        }
    }
}

/// Borrowed view of one dated table, raw or integrated
#[derive(Debug, Clone, Copy)]
struct DatedTable<'a> {
    target_date: NaiveDate,
    headers: &'a [String],
    rows: &'a [Vec<String>],
    annotations: &'a Annotations,
}

fn dated_tables(view: &DispatchView) -> Vec<DatedTable<'_>> {
    match view {
        DispatchView::Snapshots(items) => items
            .iter()
            .map(|s| DatedTable {
                target_date: s.target_date,
                headers: &s.headers,
                rows: &s.rows,
                annotations: &s.annotations,
            })
            .collect(),
        DispatchView::Integrated(items) => items
            .iter()
            .map(|r| DatedTable {
                target_date: r.target_date,
                headers: &r.headers,
                rows: &r.rows,
                annotations: &r.annotations,
            })
            .collect(),
    }
}

/// `3/5(목)`
pub fn date_label(date: NaiveDate) -> String {
    format!(
        "{}/{}({})",
        date.month(),
        date.day(),
        WEEKDAYS[date.weekday().num_days_from_sunday() as usize]
    )
}

/// Download file name, e.g. `asan_글로비스KD_2026-03-05.xlsx`
pub fn export_file_name(branch_id: &str, view: ViewType, scope: ExportScope) -> String {
    let label = match view {
        ViewType::Raw(SchemaType::Glovis) => "글로비스KD",
        ViewType::Raw(SchemaType::Mobis) => "모비스AS",
        ViewType::Integrated => "통합",
    };
    let date_part = match scope {
        ExportScope::Date(date) => date.format("%Y-%m-%d").to_string(),
        ExportScope::All { month: Some(m) } => format!("{}월", m),
        ExportScope::All { month: None } => "전체".to_string(),
    };
    format!("{}_{}_{}.xlsx", branch_id, label, date_part)
}

/// Lay out a read result as a workbook
pub fn build_workbook(view: &DispatchView, scope: ExportScope) -> Result<Workbook> {
    let mut tables = dated_tables(view);
    if tables.is_empty() {
        bail!("No dispatch data to export");
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    match scope {
        ExportScope::Date(date) => {
            let Some(table) = tables.iter().find(|t| t.target_date == date) else {
                bail!("No dispatch data for {}", date);
            };
            worksheet.set_name(date.format("%Y-%m-%d").to_string())?;
            write_headers(worksheet, 0, table.headers)?;
            write_table(worksheet, 1, 0, table)?;
        }
        ExportScope::All { .. } => {
            // Newest first; stable so same-date tables keep their read order
            tables.sort_by(|a, b| b.target_date.cmp(&a.target_date));

            worksheet.set_name(ALL_SHEET_NAME)?;
            worksheet.write_string(0, 0, DATE_COLUMN)?;
            write_headers(worksheet, 1, tables[0].headers)?;

            let mut next_row: u32 = 1;
            for table in &tables {
                let label = date_label(table.target_date);
                for offset in 0..table.rows.len() {
                    worksheet.write_string(next_row + offset as u32, 0, &label)?;
                }
                write_table(worksheet, next_row, 1, table)?;
                next_row += table.rows.len() as u32;
            }
        }
    }

    Ok(workbook)
}

fn write_headers(ws: &mut Worksheet, first_col: u16, headers: &[String]) -> Result<()> {
    for (i, header) in headers.iter().enumerate() {
        ws.write_string(0, first_col + i as u16, header)?;
    }
    Ok(())
}

fn write_table(ws: &mut Worksheet, first_row: u32, first_col: u16, table: &DatedTable<'_>) -> Result<()> {
    for (r, row) in table.rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                ws.write_string(first_row + r as u32, first_col + c as u16, value)?;
            }
        }
    }
    for (cell, text) in table.annotations {
        ws.insert_note(
            first_row + cell.row as u32,
            first_col + cell.col as u16,
            &Note::new(text.as_str()).add_author_prefix(false),
        )?;
    }
    Ok(())
}

/// Write a read result to `path`
pub fn write_export(view: &DispatchView, scope: ExportScope, path: &Path) -> Result<()> {
    let mut workbook = build_workbook(view, scope)?;
    workbook
        .save(path)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;
    Ok(())
}

/// Read from the store and export, returning the written path
///
/// Without an explicit `output` the file lands in `dir` under the
/// conventional download name.
pub async fn export_view(
    pool: &SqlitePool,
    branch_id: &str,
    view: ViewType,
    scope: ExportScope,
    output: Option<PathBuf>,
    dir: &Path,
) -> Result<PathBuf> {
    let data = read_view(pool, branch_id, view, &scope.filter()).await?;
    if data.is_empty() {
        bail!("No {} dispatch data for branch '{}'", view, branch_id);
    }

    let path = output.unwrap_or_else(|| dir.join(export_file_name(branch_id, view, scope)));
    write_export(&data, scope, &path)?;
    log::info!("Exported {} {} tables to {}", data.len(), view, path.display());
    Ok(path)
}
