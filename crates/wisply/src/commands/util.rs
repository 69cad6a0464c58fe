//! Shared helpers for command handlers.

use wisply_core::model::{Customer, Router};
use wisply_core::store::{customers, routers};

use crate::commands::Context;
use crate::error::CliError;

/// Resolve a customer by PPPoE username.
pub async fn resolve_customer(ctx: &Context, pppoe_user: &str) -> Result<Customer, CliError> {
    customers::find_by_pppoe_user(ctx.store.pool(), pppoe_user)
        .await
        .map_err(CliError::from)?
        .ok_or_else(|| CliError::NotFound {
            resource_type: "customer".into(),
            identifier: pppoe_user.into(),
            list_command: "customers show <pppoe-user>".into(),
        })
}

/// Resolve the routers a batch command should touch: one by name, or all.
pub async fn resolve_routers(
    ctx: &Context,
    name: Option<&str>,
) -> Result<Vec<Router>, CliError> {
    match name {
        Some(name) => {
            let router = routers::find_by_name(ctx.store.pool(), name)
                .await
                .map_err(CliError::from)?
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "router".into(),
                    identifier: name.into(),
                    list_command: "routers list".into(),
                })?;
            Ok(vec![router])
        }
        None => routers::list_all(ctx.store.pool())
            .await
            .map_err(CliError::from),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Turn a batch outcome count into the command result: success when every
/// router succeeded, `PartialFailure` otherwise.
pub fn batch_result(failed: usize, total: usize) -> Result<(), CliError> {
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::PartialFailure { failed, total })
    }
}
