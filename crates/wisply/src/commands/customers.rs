//! Customer enforcement command handlers.
//!
//! Each action is a discrete unit of work: resolve the customer, run the
//! enforcer (which owns its own device session), report the outcome. A
//! failure message here is the operator's window into the enforcement
//! contract, so it stays specific.

use wisply_core::{AccessEnforcer, EnforcementOutcome};

use crate::cli::{CustomersArgs, CustomersCommand, GlobalOpts};
use crate::commands::{Context, util};
use crate::error::CliError;
use crate::output;

fn detail(c: &wisply_core::Customer) -> String {
    let lines = vec![
        format!("Name:              {}", c.name),
        format!("PPPoE user:        {}", c.pppoe_user),
        format!("Status:            {}", c.status),
        format!(
            "Router:            {}",
            c.router_id.map_or_else(|| "-".into(), |id| id.to_string())
        ),
        format!(
            "Previous profile:  {}",
            c.previous_profile.as_deref().unwrap_or("-")
        ),
        format!("Created:           {}", c.created_at.format("%Y-%m-%d")),
    ];
    lines.join("\n")
}

/// Serializable projection for `-o json` (credentials stay out of it).
#[derive(serde::Serialize)]
struct CustomerView {
    id: i64,
    name: String,
    pppoe_user: String,
    status: String,
    router_id: Option<i64>,
    previous_profile: Option<String>,
}

impl From<&wisply_core::Customer> for CustomerView {
    fn from(c: &wisply_core::Customer) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            pppoe_user: c.pppoe_user.clone(),
            status: c.status.to_string(),
            router_id: c.router_id,
            previous_profile: c.previous_profile.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &Context,
    args: CustomersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let enforcer = AccessEnforcer::new(ctx.store.clone(), ctx.core_config.clone());

    match args.command {
        CustomersCommand::Show { pppoe_user } => {
            let customer = util::resolve_customer(ctx, &pppoe_user).await?;
            let view = CustomerView::from(&customer);
            let out = output::render_single(
                &global.output,
                &view,
                |_| detail(&customer),
                |v| v.pppoe_user.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CustomersCommand::Activate { pppoe_user } => {
            let customer = util::resolve_customer(ctx, &pppoe_user).await?;
            let outcome = enforcer.activate(customer.id).await?;
            report(&pppoe_user, "activated", &outcome, global);
            Ok(())
        }

        CustomersCommand::Isolate { pppoe_user } => {
            let customer = util::resolve_customer(ctx, &pppoe_user).await?;
            let outcome = enforcer.isolate(customer.id).await?;
            report(&pppoe_user, "isolated", &outcome, global);
            Ok(())
        }

        CustomersCommand::Reconnect { pppoe_user } => {
            let customer = util::resolve_customer(ctx, &pppoe_user).await?;
            let outcome = enforcer.reconnect(customer.id).await?;
            report(&pppoe_user, "reconnected", &outcome, global);
            Ok(())
        }

        CustomersCommand::Terminate { pppoe_user } => {
            let customer = util::resolve_customer(ctx, &pppoe_user).await?;
            if !util::confirm(
                &format!("Terminate {pppoe_user}? This is a business-level offboarding."),
                global.yes,
            )? {
                return Ok(());
            }
            let outcome = enforcer.terminate(customer.id).await?;
            report(&pppoe_user, "terminated", &outcome, global);
            Ok(())
        }
    }
}

fn report(pppoe_user: &str, action: &str, outcome: &EnforcementOutcome, global: &GlobalOpts) {
    if global.quiet {
        return;
    }
    match outcome {
        EnforcementOutcome::Applied => eprintln!("Customer {pppoe_user} {action} (verified)"),
        EnforcementOutcome::AlreadyDone => {
            eprintln!("Customer {pppoe_user} already {action}; nothing to do");
        }
    }
}
