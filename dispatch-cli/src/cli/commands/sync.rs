//! `sync` command

use anyhow::{Result, bail};
use colored::*;
use sqlx::SqlitePool;

use crate::cli::{SyncArgs, validate_branch};
use crate::config::Config;
use crate::dispatch::sync_branch;

pub async fn handle_sync_command(args: SyncArgs, config: &Config, pool: &SqlitePool) -> Result<()> {
    validate_branch(&args.branch)?;
    let share = config.file_share()?;
    let timezone = config.timezone()?;

    let results = sync_branch(pool, share.as_ref(), &args.branch, timezone).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            if result.success {
                println!(
                    "{} {:<7} {} sheets",
                    "✓".green(),
                    result.schema_type.to_string().bold(),
                    result.sheets.unwrap_or(0)
                );
            } else {
                println!(
                    "{} {:<7} {}",
                    "✗".red(),
                    result.schema_type.to_string().bold(),
                    result.error.as_deref().unwrap_or("unknown error").red()
                );
            }
        }
    }

    if results.iter().all(|r| !r.success) {
        bail!("Sync failed for every schema type of branch '{}'", args.branch);
    }
    Ok(())
}
