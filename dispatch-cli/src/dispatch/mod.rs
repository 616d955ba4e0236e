//! Branch dispatch board engine
//!
//! Write path: [`sync`] pulls both partner workbooks from the file share,
//! [`parser`] extracts one table per date sheet and the store is replaced
//! wholesale per branch and schema type.
//!
//! Read path: [`reader`] lists stored snapshots and, for the integrated view,
//! [`merge`] folds both schema types into the canonical column set described
//! in [`schema`].

pub mod merge;
pub mod parser;
pub mod reader;
pub mod schema;
pub mod sync;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use merge::merge_snapshots;
pub use parser::{ParsedSheet, parse_sheet};
pub use reader::{DispatchView, SnapshotFilter, ViewType, list_snapshots, read_view};
pub use schema::{CANONICAL_COLUMNS, CanonicalColumn, ColumnMapping, canonical_headers, resolve_column};
pub use sync::{TypeSyncResult, sync_branch, sync_branch_at};

/// Source spreadsheet format
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Glovis,
    Mobis,
}

impl SchemaType {
    /// Both types, in the order a sync visits them
    pub const ALL: [SchemaType; 2] = [SchemaType::Glovis, SchemaType::Mobis];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Glovis => "glovis",
            SchemaType::Mobis => "mobis",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SchemaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "glovis" => Ok(SchemaType::Glovis),
            "mobis" => Ok(SchemaType::Mobis),
            other => bail!("Unknown schema type: {}", other),
        }
    }
}

/// Zero-based cell coordinate inside a snapshot's row/column space
///
/// Stored as `"row:col"` so persisted comment maps stay readable by other
/// consumers of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

impl FromStr for CellRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (row, col) = s
            .split_once(':')
            .with_context(|| format!("Invalid cell reference: {}", s))?;
        Ok(CellRef {
            row: row.trim().parse().with_context(|| format!("Invalid row in cell reference: {}", s))?,
            col: col.trim().parse().with_context(|| format!("Invalid column in cell reference: {}", s))?,
        })
    }
}

impl Serialize for CellRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Sparse cell notes, ordered row-major
pub type Annotations = BTreeMap<CellRef, String>;

/// One branch + type + date table as extracted from a source sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSnapshot {
    pub branch_id: String,
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    pub target_date: NaiveDate,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub annotations: Annotations,
    pub file_modified_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Both schema types merged into the canonical columns for one date
///
/// Computed on every read, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegratedRecord {
    pub target_date: NaiveDate,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub annotations: Annotations,
    pub file_modified_at: Option<DateTime<Utc>>,
}
