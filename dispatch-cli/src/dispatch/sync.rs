//! Full resync of a branch from its partner workbooks
//!
//! Each schema type is handled on its own: a missing path or unreadable file
//! fails that type only. Stored snapshots of a type are replaced wholesale so
//! renamed or removed sheets never leave stale rows behind.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::repository::dispatch::{delete_snapshots, insert_snapshot};
use crate::config::repository::settings::get_settings;
use crate::share::FileShare;
use crate::workbook::{Workbook, load_workbook};

use super::parser::parse_sheet;
use super::{DispatchSnapshot, SchemaType};

static DATE_SHEET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\.(\d+)").expect("date sheet pattern is valid"));

/// A sheet dated more than this many months after today belongs to last year
const YEAR_ROLLOVER_MONTHS: u32 = 3;

/// Outcome of syncing one schema type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSyncResult {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheets: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TypeSyncResult {
    pub fn succeeded(schema_type: SchemaType, sheets: usize) -> Self {
        Self {
            schema_type,
            success: true,
            sheets: Some(sheets),
            error: None,
        }
    }

    pub fn failed(schema_type: SchemaType, error: impl Into<String>) -> Self {
        Self {
            schema_type,
            success: false,
            sheets: None,
            error: Some(error.into()),
        }
    }
}

/// Resync a branch using today's date in the given time zone
pub async fn sync_branch(
    pool: &SqlitePool,
    share: &dyn FileShare,
    branch_id: &str,
    timezone: Tz,
) -> Result<Vec<TypeSyncResult>> {
    let today = Utc::now().with_timezone(&timezone).date_naive();
    sync_branch_at(pool, share, branch_id, today).await
}

/// Resync a branch, resolving sheet years against `today`
pub async fn sync_branch_at(
    pool: &SqlitePool,
    share: &dyn FileShare,
    branch_id: &str,
    today: NaiveDate,
) -> Result<Vec<TypeSyncResult>> {
    let settings = get_settings(pool, branch_id)
        .await?
        .with_context(|| format!("No dispatch settings for branch '{}'", branch_id))?;

    let mut results = Vec::with_capacity(SchemaType::ALL.len());
    for schema_type in SchemaType::ALL {
        let result = match settings.path_for(schema_type) {
            None => TypeSyncResult::failed(schema_type, "Source file path not configured"),
            Some(path) => match sync_type(pool, share, branch_id, schema_type, path, today).await {
                Ok(sheets) => TypeSyncResult::succeeded(schema_type, sheets),
                Err(e) => TypeSyncResult::failed(schema_type, format!("{:#}", e)),
            },
        };

        match &result.error {
            None => log::info!(
                "Synced {} for '{}': {} sheets",
                schema_type,
                branch_id,
                result.sheets.unwrap_or(0)
            ),
            Some(error) => log::warn!("Sync of {} for '{}' failed: {}", schema_type, branch_id, error),
        }
        results.push(result);
    }

    Ok(results)
}

async fn sync_type(
    pool: &SqlitePool,
    share: &dyn FileShare,
    branch_id: &str,
    schema_type: SchemaType,
    path: &str,
    today: NaiveDate,
) -> Result<usize> {
    let stat = share.stat(path).await?;
    let bytes = share.fetch(path).await?;
    let workbook = load_workbook(&bytes).with_context(|| format!("Failed to load workbook {}", path))?;

    let snapshots = extract_snapshots(
        &workbook,
        branch_id,
        schema_type,
        today,
        stat.modified,
        Utc::now(),
    );

    let removed = delete_snapshots(pool, branch_id, schema_type).await?;
    log::debug!("Removed {} stored {} snapshots for '{}'", removed, schema_type, branch_id);

    let mut inserted = 0;
    for snapshot in &snapshots {
        match insert_snapshot(pool, snapshot).await {
            Ok(_) => inserted += 1,
            Err(e) => log::error!("{:#}", e),
        }
    }

    Ok(inserted)
}

/// Parse every date sheet of a workbook into snapshots
///
/// Sheets without a date name, without a header row or without data rows are
/// skipped.
pub fn extract_snapshots(
    workbook: &Workbook,
    branch_id: &str,
    schema_type: SchemaType,
    today: NaiveDate,
    file_modified_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
) -> Vec<DispatchSnapshot> {
    let mut snapshots = Vec::new();

    for sheet in &workbook.sheets {
        let Some(target_date) = sheet_target_date(&sheet.name, today) else {
            log::debug!("Skipping non-date sheet '{}'", sheet.name);
            continue;
        };

        let Some(parsed) = parse_sheet(sheet, schema_type) else {
            continue;
        };
        if parsed.rows.is_empty() {
            log::debug!("Skipping sheet '{}': no data rows", sheet.name);
            continue;
        }

        snapshots.push(DispatchSnapshot {
            branch_id: branch_id.to_string(),
            schema_type,
            target_date,
            headers: parsed.headers,
            rows: parsed.rows,
            annotations: parsed.annotations,
            file_modified_at,
            updated_at,
        });
    }

    snapshots
}

/// Date of a `<month>.<day>` sheet relative to `today`
///
/// The year is today's, unless the sheet's month lies more than three months
/// ahead, which means a sheet from the end of last year.
pub fn sheet_target_date(name: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = DATE_SHEET.captures(name)?;
    let month: u32 = caps.get(1)?.as_str().parse().ok()?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;

    let year = if month > today.month() + YEAR_ROLLOVER_MONTHS {
        today.year() - 1
    } else {
        today.year()
    };

    let date = NaiveDate::from_ymd_opt(year, month, day);
    if date.is_none() {
        log::warn!("Sheet '{}' does not name a valid date", name);
    }
    date
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::database::connect_in_memory;
    use crate::config::repository::settings::save_settings;
    use crate::dispatch::{CellRef, SnapshotFilter, list_snapshots};
    use crate::share::LocalShare;
    use rust_xlsxwriter::{Note, Workbook as XlsxWorkbook};
    use std::path::Path;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sheet_in_current_year() {
        assert_eq!(sheet_target_date("3.5", ymd(2026, 4, 10)), Some(ymd(2026, 3, 5)));
    }

    #[test]
    fn test_year_end_sheet_rolls_back() {
        assert_eq!(sheet_target_date("12.20", ymd(2026, 2, 3)), Some(ymd(2025, 12, 20)));
        // Within three months ahead stays in the current year
        assert_eq!(sheet_target_date("5.1", ymd(2026, 2, 3)), Some(ymd(2026, 5, 1)));
        assert_eq!(sheet_target_date("6.1", ymd(2026, 2, 3)), Some(ymd(2025, 6, 1)));
    }

    #[test]
    fn test_non_date_sheet_names() {
        let today = ymd(2026, 4, 10);
        assert_eq!(sheet_target_date("memo", today), None);
        assert_eq!(sheet_target_date("2.30", today), None);
        assert_eq!(sheet_target_date("13.1", today), None);
        assert_eq!(sheet_target_date("3.6 (금)", today), Some(ymd(2026, 3, 6)));
    }

    /// Write a partner workbook: one sheet per (name, row count)
    fn write_workbook(path: &Path, filter_col: u16, sheets: &[(&str, usize)]) {
        let mut workbook = XlsxWorkbook::new();
        for (name, rows) in sheets {
            let sheet = workbook.add_worksheet();
            sheet.set_name(*name).unwrap();
            sheet.write_string(0, 0, "아산지점 배차판").unwrap();
            sheet.write_string(3, 0, "구분").unwrap();
            sheet.write_string(3, 1, "화주").unwrap();
            sheet.write_string(3, filter_col, "오더").unwrap();
            for i in 0..*rows {
                let row = 4 + i as u32;
                sheet.write_string(row, 0, "수출").unwrap();
                sheet.write_string(row, 1, format!("shipper {}", i)).unwrap();
                sheet.write_number(row, filter_col, (i + 1) as f64).unwrap();
            }
            sheet
                .insert_note(4, 1, &Note::new("first shipper note").add_author_prefix(false))
                .unwrap();
            sheet.write_string(4 + *rows as u32, 0, "합계").unwrap();
        }
        workbook.save(path).unwrap();
    }

    async fn setup(glovis: Option<&str>) -> (tempfile::TempDir, SqlitePool, LocalShare) {
        let dir = tempfile::tempdir().unwrap();
        write_workbook(&dir.path().join("glovis.xlsx"), 12, &[("3.5", 3), ("3.6", 2), ("memo", 1)]);
        write_workbook(&dir.path().join("mobis.xlsx"), 15, &[("3.5", 2), ("12.20", 1)]);

        let pool = connect_in_memory().await.unwrap();
        save_settings(&pool, "asan", glovis.unwrap_or(""), "/mobis.xlsx")
            .await
            .unwrap();
        let share = LocalShare::new(dir.path());
        (dir, pool, share)
    }

    #[tokio::test]
    async fn test_sync_reports_unset_path_and_syncs_sibling() {
        let (_dir, pool, share) = setup(None).await;

        let results = sync_branch_at(&pool, &share, "asan", ymd(2026, 4, 10)).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].schema_type, SchemaType::Glovis);
        assert!(!results[0].success);
        assert!(results[0].error.is_some());
        assert_eq!(results[1], TypeSyncResult::succeeded(SchemaType::Mobis, 2));

        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json[0]["type"], "glovis");
        assert!(json[0].get("sheets").is_none());
        assert_eq!(json[1]["sheets"], 2);

        let stored = list_snapshots(&pool, "asan", None, &SnapshotFilter::default())
            .await
            .unwrap();
        let dates: Vec<NaiveDate> = stored.iter().map(|s| s.target_date).collect();
        assert_eq!(dates, vec![ymd(2025, 12, 20), ymd(2026, 3, 5)]);
    }

    #[tokio::test]
    async fn test_missing_file_fails_only_its_type() {
        let (_dir, pool, share) = setup(Some("/nowhere/glovis.xlsx")).await;

        let results = sync_branch_at(&pool, &share, "asan", ymd(2026, 4, 10)).await.unwrap();
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("glovis.xlsx"));
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn test_sync_parses_date_sheets_with_notes() {
        let (_dir, pool, share) = setup(Some("/glovis.xlsx")).await;

        let results = sync_branch_at(&pool, &share, "asan", ymd(2026, 4, 10)).await.unwrap();
        assert_eq!(results[0], TypeSyncResult::succeeded(SchemaType::Glovis, 2));

        let glovis = list_snapshots(&pool, "asan", Some(SchemaType::Glovis), &SnapshotFilter::default())
            .await
            .unwrap();
        assert_eq!(glovis.len(), 2);
        let first = &glovis[0];
        assert_eq!(first.target_date, ymd(2026, 3, 5));
        assert_eq!(first.rows.len(), 3);
        assert_eq!(first.rows[2][12], "3");
        assert!(first.rows.iter().all(|r| r.len() == first.headers.len()));
        assert!(first.annotations[&CellRef::new(0, 1)].contains("first shipper note"));
        assert!(first.file_modified_at.is_some());
    }

    #[tokio::test]
    async fn test_sync_is_idempotent_and_drops_removed_sheets() {
        let (dir, pool, share) = setup(Some("/glovis.xlsx")).await;
        let today = ymd(2026, 4, 10);

        sync_branch_at(&pool, &share, "asan", today).await.unwrap();
        let first = list_snapshots(&pool, "asan", None, &SnapshotFilter::default())
            .await
            .unwrap();
        sync_branch_at(&pool, &share, "asan", today).await.unwrap();
        let second = list_snapshots(&pool, "asan", None, &SnapshotFilter::default())
            .await
            .unwrap();

        // updated_at records the run itself; everything read from the file matches
        let strip = |items: &[DispatchSnapshot]| -> Vec<DispatchSnapshot> {
            items
                .iter()
                .cloned()
                .map(|mut s| {
                    s.updated_at = DateTime::<Utc>::MIN_UTC;
                    s
                })
                .collect()
        };
        assert_eq!(strip(first.as_slice()), strip(second.as_slice()));

        // Upstream removes the 3.6 sheet
        write_workbook(&dir.path().join("glovis.xlsx"), 12, &[("3.5", 3)]);
        sync_branch_at(&pool, &share, "asan", today).await.unwrap();
        let glovis = list_snapshots(&pool, "asan", Some(SchemaType::Glovis), &SnapshotFilter::default())
            .await
            .unwrap();
        assert_eq!(glovis.len(), 1);
        assert_eq!(glovis[0].target_date, ymd(2026, 3, 5));
    }

    #[tokio::test]
    async fn test_sheet_without_qualifying_rows_is_skipped() {
        let (dir, pool, share) = setup(Some("/glovis.xlsx")).await;

        let mut workbook = XlsxWorkbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("3.5").unwrap();
        sheet.write_string(3, 0, "구분").unwrap();
        sheet.write_string(3, 12, "오더").unwrap();
        sheet.write_string(4, 0, "수출").unwrap();
        sheet.write_number(4, 12, 1).unwrap();
        // Only zero or blank orders: nothing dispatched that day
        let sheet = workbook.add_worksheet();
        sheet.set_name("3.7").unwrap();
        sheet.write_string(3, 0, "구분").unwrap();
        sheet.write_string(3, 12, "오더").unwrap();
        sheet.write_string(4, 0, "수출").unwrap();
        sheet.write_number(4, 12, 0).unwrap();
        sheet.write_string(5, 0, "수입").unwrap();
        workbook.save(dir.path().join("glovis.xlsx")).unwrap();

        let results = sync_branch_at(&pool, &share, "asan", ymd(2026, 4, 10)).await.unwrap();
        assert_eq!(results[0], TypeSyncResult::succeeded(SchemaType::Glovis, 1));

        let glovis = list_snapshots(&pool, "asan", Some(SchemaType::Glovis), &SnapshotFilter::default())
            .await
            .unwrap();
        let dates: Vec<NaiveDate> = glovis.iter().map(|s| s.target_date).collect();
        assert_eq!(dates, vec![ymd(2026, 3, 5)]);
    }

    #[tokio::test]
    async fn test_sync_without_settings_is_an_error() {
        let pool = connect_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let share = LocalShare::new(dir.path());
        assert!(sync_branch_at(&pool, &share, "asan", ymd(2026, 4, 10)).await.is_err());
    }
}
