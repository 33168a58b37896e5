use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::{
    import::{run_import, ImportArgs},
    settings::{run_settings, SettingsArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(author, version)]
struct Cli {
    /// The directory where viewer settings are stored
    #[arg(long, global = true, default_value = ".")]
    settings_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Import(ImportArgs),
    Settings(SettingsArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Import(args) => run_import(args, &cli.settings_dir),
        Commands::Settings(args) => run_settings(args, &cli.settings_dir),
    }
}
