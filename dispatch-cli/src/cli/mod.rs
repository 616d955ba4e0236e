//! Command-line interface definitions

pub mod commands;

use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::dispatch::SnapshotFilter;
use crate::dispatch::ViewType;

#[derive(Parser)]
#[command(name = "dispatch-cli")]
#[command(about = "Branch dispatch board: sync partner workbooks and read the board")]
#[command(version)]
pub struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Re-read both partner workbooks and replace the stored snapshots
    Sync(SyncArgs),
    /// Show stored snapshots or the integrated view
    List(ListArgs),
    /// Write a view to an .xlsx file
    Export(ExportArgs),
    /// Show or change a branch's source file paths
    #[command(subcommand)]
    Settings(SettingsCommands),
}

#[derive(Args)]
pub struct SyncArgs {
    /// Branch identifier
    #[arg(short, long)]
    pub branch: String,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct DateArgs {
    /// Only this date (YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub date: Option<NaiveDate>,

    /// Earliest date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Month of year (1-12), any year
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,
}

impl DateArgs {
    pub fn filter(&self) -> SnapshotFilter {
        SnapshotFilter {
            date: self.date,
            from: self.from,
            to: self.to,
            month: self.month,
        }
    }
}

#[derive(Args)]
pub struct ListArgs {
    /// Branch identifier
    #[arg(short, long)]
    pub branch: String,

    /// glovis, mobis or integrated
    #[arg(short = 't', long = "type", default_value = "glovis", value_parser = parse_view)]
    pub view: ViewType,

    #[command(flatten)]
    pub dates: DateArgs,

    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Branch identifier
    #[arg(short, long)]
    pub branch: String,

    /// glovis, mobis or integrated
    #[arg(short = 't', long = "type", default_value = "glovis", value_parser = parse_view)]
    pub view: ViewType,

    /// Single date to export (YYYY-MM-DD); omit for all dates
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// With all dates, restrict to this month (1-12)
    #[arg(long, conflicts_with = "date", value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    /// Output file (defaults to the download name in the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show the configured paths
    Show {
        #[arg(short, long)]
        branch: String,
    },
    /// Set the share paths of the partner workbooks (empty string clears)
    Set {
        #[arg(short, long)]
        branch: String,
        #[arg(long, default_value = "")]
        glovis: String,
        #[arg(long, default_value = "")]
        mobis: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

fn parse_view(s: &str) -> Result<ViewType> {
    s.parse()
}

/// Branch ids end up in file names and store keys
pub fn validate_branch(branch: &str) -> Result<()> {
    if branch.is_empty()
        || !branch
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        bail!("Invalid branch id '{}': use letters, digits, '-' or '_'", branch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::SchemaType;

    #[test]
    fn test_parse_list_command() {
        let cli = Cli::try_parse_from([
            "dispatch-cli", "list", "-b", "asan", "--type", "integrated", "--month", "3",
        ])
        .unwrap();
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.view, ViewType::Integrated);
        assert_eq!(args.dates.filter(), SnapshotFilter::month(3));
    }

    #[test]
    fn test_rejects_bad_month_and_conflicting_dates() {
        assert!(Cli::try_parse_from(["dispatch-cli", "list", "-b", "asan", "--month", "13"]).is_err());
        assert!(
            Cli::try_parse_from([
                "dispatch-cli", "list", "-b", "asan", "--date", "2026-03-05", "--from", "2026-03-01",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_export_defaults_to_glovis() {
        let cli = Cli::try_parse_from(["dispatch-cli", "export", "-b", "asan"]).unwrap();
        let Commands::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.view, ViewType::Raw(SchemaType::Glovis));
        assert!(args.date.is_none());
    }

    #[test]
    fn test_export_rejects_month_with_date() {
        assert!(
            Cli::try_parse_from([
                "dispatch-cli", "export", "-b", "asan", "--date", "2026-03-05", "--month", "3",
            ])
            .is_err()
        );
        assert!(Cli::try_parse_from(["dispatch-cli", "export", "-b", "asan", "--month", "3"]).is_ok());
    }

    #[test]
    fn test_validate_branch() {
        assert!(validate_branch("asan").is_ok());
        assert!(validate_branch("asan_2").is_ok());
        assert!(validate_branch("").is_err());
        assert!(validate_branch("../asan").is_err());
    }
}
