//! Dispatch snapshot repository

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::dispatch::{Annotations, DispatchSnapshot, SchemaType, SnapshotFilter};

/// Delete every snapshot of a branch and schema type, returning the count
pub async fn delete_snapshots(
    pool: &SqlitePool,
    branch_id: &str,
    schema_type: SchemaType,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM branch_dispatch WHERE branch_id = ? AND type = ?")
        .bind(branch_id)
        .bind(schema_type.as_str())
        .execute(pool)
        .await
        .context("Failed to delete dispatch snapshots")?;

    Ok(result.rows_affected())
}

/// Insert one snapshot, returning its row id
pub async fn insert_snapshot(pool: &SqlitePool, snapshot: &DispatchSnapshot) -> Result<i64> {
    let headers = serde_json::to_string(&snapshot.headers).context("Failed to serialize headers")?;
    let data = serde_json::to_string(&snapshot.rows).context("Failed to serialize rows")?;
    let comments =
        serde_json::to_string(&snapshot.annotations).context("Failed to serialize comments")?;

    let result = sqlx::query(
        "INSERT INTO branch_dispatch
            (branch_id, type, target_date, headers, data, comments, file_modified_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&snapshot.branch_id)
    .bind(snapshot.schema_type.as_str())
    .bind(snapshot.target_date.format("%Y-%m-%d").to_string())
    .bind(headers)
    .bind(data)
    .bind(comments)
    .bind(snapshot.file_modified_at.map(|t| t.to_rfc3339()))
    .bind(snapshot.updated_at.to_rfc3339())
    .execute(pool)
    .await
    .with_context(|| {
        format!(
            "Failed to insert {} snapshot for {}",
            snapshot.schema_type, snapshot.target_date
        )
    })?;

    Ok(result.last_insert_rowid())
}

/// Filtered read, ascending by date then type
pub async fn fetch_snapshots(
    pool: &SqlitePool,
    branch_id: &str,
    schema_type: Option<SchemaType>,
    filter: &SnapshotFilter,
) -> Result<Vec<DispatchSnapshot>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT branch_id, type, target_date, headers, data, comments, file_modified_at, updated_at
         FROM branch_dispatch WHERE branch_id = ",
    );
    query.push_bind(branch_id);

    if let Some(schema_type) = schema_type {
        query.push(" AND type = ").push_bind(schema_type.as_str());
    }
    if let Some(date) = filter.date {
        query.push(" AND target_date = ").push_bind(format_date(date));
    }
    if let Some(from) = filter.from {
        query.push(" AND target_date >= ").push_bind(format_date(from));
    }
    if let Some(to) = filter.to {
        query.push(" AND target_date <= ").push_bind(format_date(to));
    }
    if let Some(month) = filter.month {
        query
            .push(" AND substr(target_date, 6, 2) = ")
            .push_bind(format!("{:02}", month));
    }
    query.push(" ORDER BY target_date ASC, type ASC, id ASC");

    let rows = query
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to list dispatch snapshots")?;

    rows.iter().map(snapshot_from_row).collect()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn snapshot_from_row(row: &SqliteRow) -> Result<DispatchSnapshot> {
    let type_str: String = row.try_get("type")?;
    let date_str: String = row.try_get("target_date")?;
    let headers_json: String = row.try_get("headers")?;
    let data_json: String = row.try_get("data")?;
    let comments_json: String = row.try_get("comments")?;
    let file_modified_at: Option<String> = row.try_get("file_modified_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    let headers: Vec<String> =
        serde_json::from_str(&headers_json).context("Failed to deserialize headers")?;
    let rows: Vec<Vec<String>> =
        serde_json::from_str(&data_json).context("Failed to deserialize rows")?;
    let annotations: Annotations =
        serde_json::from_str(&comments_json).context("Failed to deserialize comments")?;

    Ok(DispatchSnapshot {
        branch_id: row.try_get("branch_id")?,
        schema_type: type_str.parse()?,
        target_date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .with_context(|| format!("Invalid target_date: {}", date_str))?,
        headers,
        rows,
        annotations,
        file_modified_at: file_modified_at.as_deref().map(parse_timestamp).transpose()?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp: {}", value))?
        .with_timezone(&Utc))
}
