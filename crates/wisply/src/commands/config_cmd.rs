//! Config command handlers. These run before any database connection.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(wisply_config::config_path);

    match args.command {
        ConfigCommand::Init => {
            if path.exists() {
                if !global.quiet {
                    eprintln!("Config already exists at {}", path.display());
                }
                return Ok(());
            }
            wisply_config::write_default(&path)?;
            if !global.quiet {
                eprintln!("Wrote starter config to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let config = wisply_config::load(&path)?;
            let rendered =
                toml::to_string_pretty(&config).map_err(wisply_config::ConfigError::from)?;
            println!("{rendered}");
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}
