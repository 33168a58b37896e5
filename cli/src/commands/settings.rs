use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use gisview_core::settings::{
    file::FileSettingsStore, load_settings, reset_settings, update_settings, Settings,
    SettingsUpdate, STORAGE_KEY,
};

/// Show or change the viewer settings
#[derive(Args, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    command: SettingsCommand,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the current settings
    Show,

    /// Change a single setting (e.g. `simplifyTolerance 0.01`)
    Set { key: String, value: String },

    /// Restore the default settings
    Reset,
}

fn print_settings(settings: &Settings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

/// Run the `settings` command
pub fn run_settings(args: SettingsArgs, settings_dir: &Path) -> Result<()> {
    let mut store = FileSettingsStore::new(settings_dir);
    let settings = match args.command {
        SettingsCommand::Show => load_settings(&store),
        SettingsCommand::Set { key, value } => {
            let update = SettingsUpdate::parse(&key, &value)?;
            let s = update_settings(&mut store, &update)?;
            eprintln!("Saved settings to `{}'", store.path(STORAGE_KEY).display());
            s
        }
        SettingsCommand::Reset => {
            let s = reset_settings(&mut store)?;
            eprintln!("Settings reset to defaults");
            s
        }
    };
    print_settings(&settings)
}
