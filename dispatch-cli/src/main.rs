use anyhow::Result;
use clap::Parser;

use dispatch_cli::cli::commands::{
    handle_export_command, handle_list_command, handle_settings_command, handle_sync_command,
};
use dispatch_cli::cli::{Cli, Commands};
use dispatch_cli::config::{Config, database};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let pool = database::connect(&config.database_path).await?;

    let result = match cli.command {
        Commands::Sync(args) => handle_sync_command(args, &config, &pool).await,
        Commands::List(args) => handle_list_command(args, &pool).await,
        Commands::Export(args) => handle_export_command(args, &pool).await,
        Commands::Settings(cmd) => handle_settings_command(cmd, &pool).await,
    };

    pool.close().await;
    result
}
