//! Command dispatch: bridges CLI args -> core components -> output formatting.

pub mod audit;
pub mod config_cmd;
pub mod customers;
pub mod monitor;
pub mod profiles;
pub mod routers;
pub mod scan;
pub mod util;

use std::time::Duration;

use wisply_core::{CoreConfig, Store};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Shared state for database-bound commands: resolved configuration and
/// an open store.
pub struct Context {
    pub store: Store,
    pub core_config: CoreConfig,
    pub config: wisply_config::Config,
}

impl Context {
    /// Load the config file, apply CLI overrides, and open the database.
    pub async fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let path = global
            .config
            .clone()
            .unwrap_or_else(wisply_config::config_path);
        let mut config = wisply_config::load(&path)?;

        if let Some(ref database) = global.database {
            config.database = database.clone();
        }

        let mut core_config = config.core_config();
        if let Some(secs) = global.timeout {
            core_config.connect.timeout = Duration::from_secs(secs);
        }

        let store = Store::connect(&config.database_url()).await?;
        Ok(Self {
            store,
            core_config,
            config,
        })
    }
}

/// Dispatch a database-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Scan(args) => scan::handle(ctx, args, global).await,
        Command::Monitor(args) => monitor::handle(ctx, args, global).await,
        Command::Profiles(args) => profiles::handle(ctx, args, global).await,
        Command::Customers(args) => customers::handle(ctx, args, global).await,
        Command::Audit => audit::handle(ctx, global).await,
        Command::Routers(args) => routers::handle(ctx, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
