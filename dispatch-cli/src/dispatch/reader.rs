//! Read side of the dispatch board: raw snapshots or the integrated view

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::repository::dispatch::fetch_snapshots;

use super::merge::merge_snapshots;
use super::{DispatchSnapshot, IntegratedRecord, SchemaType};

/// Date restrictions for a snapshot read; all set fields must hold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Month of year (1-12), any year
    pub month: Option<u32>,
}

impl SnapshotFilter {
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Default::default()
        }
    }

    pub fn range(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        }
    }

    pub fn month(month: u32) -> Self {
        Self {
            month: Some(month),
            ..Default::default()
        }
    }
}

/// Which table the caller wants to see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewType {
    Raw(SchemaType),
    Integrated,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::Raw(schema_type) => schema_type.as_str(),
            ViewType::Integrated => "integrated",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ViewType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "integrated" => Ok(ViewType::Integrated),
            "glovis" => Ok(ViewType::Raw(SchemaType::Glovis)),
            "mobis" => Ok(ViewType::Raw(SchemaType::Mobis)),
            other => bail!("Unknown view type: {} (expected glovis, mobis or integrated)", other),
        }
    }
}

/// Result of a read query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DispatchView {
    Snapshots(Vec<DispatchSnapshot>),
    Integrated(Vec<IntegratedRecord>),
}

impl DispatchView {
    pub fn len(&self) -> usize {
        match self {
            DispatchView::Snapshots(items) => items.len(),
            DispatchView::Integrated(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stored snapshots of a branch, ascending by date
pub async fn list_snapshots(
    pool: &SqlitePool,
    branch_id: &str,
    schema_type: Option<SchemaType>,
    filter: &SnapshotFilter,
) -> Result<Vec<DispatchSnapshot>> {
    fetch_snapshots(pool, branch_id, schema_type, filter).await
}

/// Answer a read query: raw snapshots of one type, or both types merged
pub async fn read_view(
    pool: &SqlitePool,
    branch_id: &str,
    view: ViewType,
    filter: &SnapshotFilter,
) -> Result<DispatchView> {
    match view {
        ViewType::Raw(schema_type) => Ok(DispatchView::Snapshots(
            list_snapshots(pool, branch_id, Some(schema_type), filter).await?,
        )),
        ViewType::Integrated => {
            let snapshots = list_snapshots(pool, branch_id, None, filter).await?;
            Ok(DispatchView::Integrated(merge_snapshots(&snapshots)))
        }
    }
}
