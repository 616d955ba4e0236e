//! Per-branch source file settings repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::dispatch::SchemaType;

/// Where a branch's partner workbooks live on the file share
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchSettings {
    pub branch_id: String,
    pub glovis_path: String,
    pub mobis_path: String,
    pub updated_at: DateTime<Utc>,
}

impl BranchSettings {
    /// Configured path for a schema type; empty strings count as unset
    pub fn path_for(&self, schema_type: SchemaType) -> Option<&str> {
        let path = match schema_type {
            SchemaType::Glovis => self.glovis_path.trim(),
            SchemaType::Mobis => self.mobis_path.trim(),
        };
        (!path.is_empty()).then_some(path)
    }
}

/// Get the settings row for a branch
pub async fn get_settings(pool: &SqlitePool, branch_id: &str) -> Result<Option<BranchSettings>> {
    let row = sqlx::query(
        "SELECT branch_id, glovis_path, mobis_path, updated_at
         FROM branch_dispatch_settings WHERE branch_id = ?",
    )
    .bind(branch_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get branch settings")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let updated_at: String = row.try_get("updated_at")?;
    Ok(Some(BranchSettings {
        branch_id: row.try_get("branch_id")?,
        glovis_path: row.try_get("glovis_path")?,
        mobis_path: row.try_get("mobis_path")?,
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .with_context(|| format!("Invalid updated_at: {}", updated_at))?
            .with_timezone(&Utc),
    }))
}

/// Insert or replace the settings for a branch
pub async fn save_settings(
    pool: &SqlitePool,
    branch_id: &str,
    glovis_path: &str,
    mobis_path: &str,
) -> Result<BranchSettings> {
    let updated_at = Utc::now();

    sqlx::query(
        "INSERT INTO branch_dispatch_settings (branch_id, glovis_path, mobis_path, updated_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(branch_id)
         DO UPDATE SET glovis_path = excluded.glovis_path,
                       mobis_path = excluded.mobis_path,
                       updated_at = excluded.updated_at",
    )
    .bind(branch_id)
    .bind(glovis_path)
    .bind(mobis_path)
    .bind(updated_at.to_rfc3339())
    .execute(pool)
    .await
    .context("Failed to save branch settings")?;

    log::info!("Saved dispatch settings for branch '{}'", branch_id);

    Ok(BranchSettings {
        branch_id: branch_id.to_string(),
        glovis_path: glovis_path.to_string(),
        mobis_path: mobis_path.to_string(),
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::database::connect_in_memory;

    #[tokio::test]
    async fn test_save_upserts_by_branch() {
        let pool = connect_in_memory().await.unwrap();
        assert_eq!(get_settings(&pool, "asan").await.unwrap(), None);

        save_settings(&pool, "asan", "/dispatch/glovis.xlsx", "").await.unwrap();
        save_settings(&pool, "asan", "/dispatch/glovis.xlsx", "/dispatch/mobis.xlsx")
            .await
            .unwrap();

        let settings = get_settings(&pool, "asan").await.unwrap().unwrap();
        assert_eq!(settings.mobis_path, "/dispatch/mobis.xlsx");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM branch_dispatch_settings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_blank_path_is_unset() {
        let settings = BranchSettings {
            branch_id: "asan".to_string(),
            glovis_path: "   ".to_string(),
            mobis_path: "/dispatch/mobis.xlsx".to_string(),
            updated_at: Utc::now(),
        };
        assert_eq!(settings.path_for(SchemaType::Glovis), None);
        assert_eq!(settings.path_for(SchemaType::Mobis), Some("/dispatch/mobis.xlsx"));
    }
}
