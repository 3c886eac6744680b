//! `sgrid settings` - the user settings file.

use clap::Subcommand;

use salesgrid_config::Settings;

use crate::inputs::Context;
use crate::CliError;

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print where settings are read from ($SALESGRID_CONFIG overrides)
    Path,

    /// Print the effective settings as TOML
    Show,

    /// Write a settings file with default values
    #[command(after_help = "\
Examples:
  sgrid settings init
  SALESGRID_CONFIG=./team.settings.toml sgrid settings init --force")]
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn cmd_settings(ctx: &Context, cmd: SettingsCommands) -> Result<(), CliError> {
    match cmd {
        SettingsCommands::Path => {
            println!("{}", Settings::config_path().display());
            Ok(())
        }
        SettingsCommands::Show => {
            let text = toml::to_string_pretty(&ctx.settings)
                .map_err(|e| CliError::io(format!("cannot render settings: {e}")))?;
            print!("{text}");
            Ok(())
        }
        SettingsCommands::Init { force } => {
            let path = Settings::config_path();
            if path.exists() && !force {
                return Err(CliError::args(format!("{} already exists", path.display()))
                    .with_hint("pass --force to overwrite"));
            }
            Settings::default()
                .save()
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            println!("wrote {}", path.display());
            Ok(())
        }
    }
}
