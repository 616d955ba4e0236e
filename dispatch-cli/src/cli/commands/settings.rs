//! `settings` command

use anyhow::Result;
use colored::*;
use sqlx::SqlitePool;

use crate::cli::{SettingsCommands, validate_branch};
use crate::config::repository::settings::{BranchSettings, get_settings, save_settings};

pub async fn handle_settings_command(cmd: SettingsCommands, pool: &SqlitePool) -> Result<()> {
    match cmd {
        SettingsCommands::Show { branch } => {
            validate_branch(&branch)?;
            match get_settings(pool, &branch).await? {
                Some(settings) => print_settings(&settings),
                None => println!("No dispatch settings for branch '{}'", branch.yellow()),
            }
        }
        SettingsCommands::Set {
            branch,
            glovis,
            mobis,
        } => {
            validate_branch(&branch)?;
            let settings = save_settings(pool, &branch, glovis.trim(), mobis.trim()).await?;
            println!("{} Saved settings for '{}'", "✓".green(), branch);
            print_settings(&settings);
        }
    }
    Ok(())
}

fn print_settings(settings: &BranchSettings) {
    let show = |path: &str| {
        if path.is_empty() {
            "(not set)".dimmed().to_string()
        } else {
            path.to_string()
        }
    };
    println!("{}", settings.branch_id.bold());
    println!("  glovis:  {}", show(&settings.glovis_path));
    println!("  mobis:   {}", show(&settings.mobis_path));
    println!("  updated: {}", settings.updated_at.to_rfc3339().dimmed());
}
