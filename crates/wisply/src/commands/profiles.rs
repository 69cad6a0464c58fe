//! Profile cache command handlers.

use std::collections::HashMap;

use serde::Serialize;
use tabled::Tabled;

use wisply_core::ProfileSync;
use wisply_core::store::{profiles, routers};

use crate::cli::{GlobalOpts, ProfilesArgs, ProfilesCommand};
use crate::commands::{Context, util};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled, Serialize)]
struct SyncRow {
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "Discovered")]
    discovered: String,
    #[tabled(rename = "Synced")]
    synced: String,
    #[tabled(rename = "Skipped")]
    skipped: String,
    #[tabled(rename = "Pruned")]
    pruned: String,
    #[tabled(rename = "Result")]
    result: String,
}

#[derive(Tabled, Serialize)]
struct AnalyzeRow {
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "Live")]
    live: String,
    #[tabled(rename = "Missing in cache")]
    missing: String,
    #[tabled(rename = "Stale in cache")]
    stale: String,
}

#[derive(Tabled, Serialize)]
struct CachedRow {
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Bandwidth")]
    bandwidth: String,
    #[tabled(rename = "Rate limit")]
    rate_limit: String,
    #[tabled(rename = "Synced at")]
    synced_at: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &Context,
    args: ProfilesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ProfilesCommand::Sync { router } => sync(ctx, router.as_deref(), global).await,
        ProfilesCommand::Analyze => analyze(ctx, global).await,
        ProfilesCommand::List { router } => list(ctx, router.as_deref(), global).await,
    }
}

async fn sync(ctx: &Context, router: Option<&str>, global: &GlobalOpts) -> Result<(), CliError> {
    let sync = ProfileSync::new(ctx.store.clone(), ctx.core_config.clone());
    let targets = util::resolve_routers(ctx, router).await?;
    let total = targets.len();

    let mut rows = Vec::with_capacity(total);
    let mut failed = 0usize;
    for router in &targets {
        match sync.sync_router(router).await {
            Ok(report) => rows.push(SyncRow {
                router: router.name.clone(),
                discovered: report.discovered.to_string(),
                synced: report.synced.to_string(),
                skipped: report.skipped.to_string(),
                pruned: report.pruned.to_string(),
                result: "ok".into(),
            }),
            Err(e) => {
                failed += 1;
                rows.push(SyncRow {
                    router: router.name.clone(),
                    discovered: "-".into(),
                    synced: "-".into(),
                    skipped: "-".into(),
                    pruned: "-".into(),
                    result: format!("failed: {e}"),
                });
            }
        }
    }

    let out = output::render_list(&global.output, &rows, |r| r.router.clone());
    output::print_output(&out, global.quiet);

    util::batch_result(failed, total)
}

async fn analyze(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let sync = ProfileSync::new(ctx.store.clone(), ctx.core_config.clone());
    let outcomes = sync.analyze().await.map_err(CliError::from)?;
    let total = outcomes.len();

    let mut rows = Vec::with_capacity(total);
    let mut failed = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(diff) => rows.push(AnalyzeRow {
                router: outcome.router.name.clone(),
                live: diff.live_total.to_string(),
                missing: join_or_dash(&diff.missing_in_cache),
                stale: join_or_dash(&diff.stale_in_cache),
            }),
            Err(e) => {
                failed += 1;
                rows.push(AnalyzeRow {
                    router: outcome.router.name.clone(),
                    live: format!("failed: {e}"),
                    missing: "-".into(),
                    stale: "-".into(),
                });
            }
        }
    }

    let out = output::render_list(&global.output, &rows, |r| r.router.clone());
    output::print_output(&out, global.quiet);

    let out_of_date = outcomes.iter().any(|o| {
        o.result
            .as_ref()
            .is_ok_and(|d| !d.missing_in_cache.is_empty() || !d.stale_in_cache.is_empty())
    });
    if out_of_date && !global.quiet {
        eprintln!("Cache is out of date -- run: wisply profiles sync");
    }

    util::batch_result(failed, total)
}

async fn list(ctx: &Context, router: Option<&str>, global: &GlobalOpts) -> Result<(), CliError> {
    let pool = ctx.store.pool();

    let cached = match router {
        Some(name) => {
            let router = util::resolve_routers(ctx, Some(name)).await?.remove(0);
            profiles::list_by_router(pool, router.id).await.map_err(CliError::from)?
        }
        None => profiles::list_all(pool).await.map_err(CliError::from)?,
    };

    let names: HashMap<i64, String> = routers::list_all(pool)
        .await
        .map_err(CliError::from)?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();

    let rows: Vec<CachedRow> = cached
        .iter()
        .map(|p| CachedRow {
            router: names
                .get(&p.router_id)
                .cloned()
                .unwrap_or_else(|| p.router_id.to_string()),
            name: p.name.clone(),
            bandwidth: output::dash(p.bandwidth.as_deref()),
            rate_limit: output::dash(p.rate_limit.as_deref()),
            synced_at: p.synced_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();

    let out = output::render_list(&global.output, &rows, |r| r.name.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

fn join_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "-".into()
    } else {
        names.join(", ")
    }
}
