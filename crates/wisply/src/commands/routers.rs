//! Router management command handlers.

use serde::Serialize;
use tabled::Tabled;

use wisply_core::store::routers;

use crate::cli::{GlobalOpts, RoutersArgs, RoutersCommand};
use crate::commands::Context;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled, Serialize)]
struct RouterRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Reachable")]
    reachable: String,
    #[tabled(rename = "Isolation profile")]
    isolation_profile: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Secrets")]
    secrets: String,
    #[tabled(rename = "Last check")]
    last_check: String,
    #[tabled(rename = "Last scan")]
    last_scan: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: RoutersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        RoutersCommand::List => list(ctx, global).await,
        RoutersCommand::Seed => seed(ctx, global).await,
    }
}

async fn list(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let all = routers::list_all(ctx.store.pool())
        .await
        .map_err(CliError::from)?;

    let rows: Vec<RouterRow> = all
        .iter()
        .map(|r| RouterRow {
            name: r.name.clone(),
            address: format!("{}:{}", r.address, r.port),
            reachable: if r.is_active { "yes".into() } else { "no".into() },
            isolation_profile: output::dash(r.isolation_profile.as_deref()),
            online: r
                .current_online_count
                .map_or_else(|| "-".into(), |n| n.to_string()),
            secrets: r
                .total_pppoe_count
                .map_or_else(|| "-".into(), |n| n.to_string()),
            last_check: r
                .last_health_check_at
                .map_or_else(|| "never".into(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
            last_scan: r
                .last_scanned_at
                .map_or_else(|| "never".into(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
        })
        .collect();

    let out = output::render_list(&global.output, &rows, |r| r.name.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn seed(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let seeds = ctx.config.seed_routers();
    if seeds.is_empty() {
        if !global.quiet {
            eprintln!("No [[routers]] entries in the config file; nothing to seed.");
        }
        return Ok(());
    }

    for seed in &seeds {
        routers::upsert_seed(ctx.store.pool(), seed)
            .await
            .map_err(CliError::from)?;
        if !global.quiet {
            eprintln!("Seeded router '{}' ({}:{})", seed.name, seed.address, seed.port);
        }
    }
    Ok(())
}
