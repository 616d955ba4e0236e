//! `export` command

use anyhow::{Context, Result};
use colored::*;
use sqlx::SqlitePool;

use crate::cli::{ExportArgs, validate_branch};
use crate::export::{ExportScope, export_view};

pub async fn handle_export_command(args: ExportArgs, pool: &SqlitePool) -> Result<()> {
    validate_branch(&args.branch)?;

    let scope = match args.date {
        Some(date) => ExportScope::Date(date),
        None => ExportScope::All { month: args.month },
    };
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;

    let path = export_view(pool, &args.branch, args.view, scope, args.output, &cwd).await?;
    println!("{} Exported to {}", "✓".green(), path.display().to_string().cyan());
    Ok(())
}
