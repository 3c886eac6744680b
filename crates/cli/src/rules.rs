//! `sgrid rules` - inspect reconciliation rules files.

use std::path::PathBuf;

use clap::Subcommand;

use salesgrid_recon::ReconRules;

use crate::inputs::{read_rules, Context};
use crate::CliError;

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Parse and validate a rules TOML without running anything
    #[command(after_help = "\
Examples:
  sgrid rules validate branch-office.rules.toml")]
    Validate {
        /// Rules file (default: --rules, then the settings file)
        file: Option<PathBuf>,
    },

    /// Print the effective rules as TOML
    #[command(after_help = "\
Examples:
  sgrid rules show > my.rules.toml
  sgrid --rules branch-office.rules.toml rules show")]
    Show,
}

pub fn cmd_rules(ctx: &Context, cmd: RulesCommands) -> Result<(), CliError> {
    match cmd {
        RulesCommands::Validate { file } => {
            let path = file
                .or_else(|| ctx.rules_path().map(PathBuf::from))
                .ok_or_else(|| {
                    CliError::args("no rules file to validate")
                        .with_hint("pass a file or --rules <TOML>")
                })?;
            read_rules(&path)?;
            println!("{}: ok", path.display());
            Ok(())
        }
        RulesCommands::Show => {
            let rules: ReconRules = ctx.rules()?;
            print!("{}", rules.to_toml()?);
            Ok(())
        }
    }
}
