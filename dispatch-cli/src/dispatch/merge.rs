//! Fold same-date snapshots of both schema types into the canonical view

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::schema::{ColumnMapping, canonical_headers};
use super::{Annotations, CellRef, DispatchSnapshot, IntegratedRecord};

/// Merge snapshots into one integrated record per date, ascending by date
///
/// Rows are appended glovis first, then mobis. Notes are re-keyed into the
/// merged row/column space; notes on columns with no canonical counterpart
/// are dropped.
pub fn merge_snapshots(snapshots: &[DispatchSnapshot]) -> Vec<IntegratedRecord> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&DispatchSnapshot>> = BTreeMap::new();
    for snapshot in snapshots {
        by_date.entry(snapshot.target_date).or_default().push(snapshot);
    }

    let headers = canonical_headers();

    by_date
        .into_iter()
        .map(|(target_date, mut contributors)| {
            // Stable sort keeps store order among same-type duplicates
            contributors.sort_by_key(|s| s.schema_type);

            let mut rows: Vec<Vec<String>> = Vec::new();
            let mut annotations = Annotations::new();
            let mut max_modified = None;

            for snapshot in contributors {
                let mapping = ColumnMapping::new(&snapshot.headers, snapshot.schema_type);
                let row_offset = rows.len();

                rows.extend(snapshot.rows.iter().map(|row| mapping.project_row(row)));

                for (cell, text) in &snapshot.annotations {
                    if cell.row >= snapshot.rows.len() {
                        log::warn!(
                            "{} {} note at {} is outside its {} rows, dropped",
                            snapshot.schema_type,
                            target_date,
                            cell,
                            snapshot.rows.len()
                        );
                        continue;
                    }
                    if let Some(canonical_col) = mapping.canonical_index_of(cell.col) {
                        annotations.insert(
                            CellRef::new(row_offset + cell.row, canonical_col),
                            text.clone(),
                        );
                    }
                }

                max_modified = max_modified.max(snapshot.file_modified_at);
            }

            IntegratedRecord {
                target_date,
                headers: headers.clone(),
                rows,
                annotations,
                file_modified_at: max_modified,
            }
        })
        .collect()
}
