//! `list` command

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use colored::*;
use sqlx::SqlitePool;

use crate::cli::{ListArgs, OutputFormat, validate_branch};
use crate::dispatch::{Annotations, DispatchView, read_view};

pub async fn handle_list_command(args: ListArgs, pool: &SqlitePool) -> Result<()> {
    validate_branch(&args.branch)?;

    let view = read_view(pool, &args.branch, args.view, &args.dates.filter()).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Table => {
            if view.is_empty() {
                println!("No {} dispatch data for branch '{}'", args.view, args.branch.yellow());
                return Ok(());
            }
            match &view {
                DispatchView::Snapshots(items) => {
                    for s in items {
                        print_table(
                            s.target_date,
                            s.schema_type.as_str(),
                            &s.headers,
                            &s.rows,
                            &s.annotations,
                            s.file_modified_at,
                        );
                    }
                }
                DispatchView::Integrated(items) => {
                    for r in items {
                        print_table(
                            r.target_date,
                            "integrated",
                            &r.headers,
                            &r.rows,
                            &r.annotations,
                            r.file_modified_at,
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_table(
    date: NaiveDate,
    label: &str,
    headers: &[String],
    rows: &[Vec<String>],
    annotations: &Annotations,
    modified: Option<DateTime<Utc>>,
) {
    let modified = modified
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());
    println!(
        "{} {} {} rows, {} notes, file modified {}",
        date.to_string().bold(),
        format!("[{}]", label).cyan(),
        rows.len(),
        annotations.len(),
        modified.dimmed()
    );
    println!("  {}", headers.join(" | ").bold());
    for row in rows {
        println!("  {}", row.join(" | "));
    }
    for (cell, text) in annotations {
        let header = headers.get(cell.col).map(String::as_str).unwrap_or("?");
        println!(
            "  {} row {} {}: {}",
            "note".yellow(),
            cell.row + 1,
            header,
            text.replace('\n', " ")
        );
    }
    println!();
}
