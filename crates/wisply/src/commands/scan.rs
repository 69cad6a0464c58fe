//! Scan command handler.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Tabled;

use wisply_core::NetworkScanner;

use crate::cli::{GlobalOpts, ScanArgs};
use crate::commands::{Context, util};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled, Serialize)]
struct ScanRow {
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "Secrets")]
    secrets: String,
    #[tabled(rename = "Matched")]
    matched: String,
    #[tabled(rename = "Orphaned")]
    orphaned: String,
    #[tabled(rename = "Result")]
    result: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: ScanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let scanner = NetworkScanner::new(ctx.store.clone(), ctx.core_config.clone());
    let targets = util::resolve_routers(ctx, args.router.as_deref()).await?;
    let total = targets.len();

    let bar = progress_bar(total, global.quiet);

    let mut rows = Vec::with_capacity(total);
    let mut failed = 0usize;
    for router in &targets {
        bar.set_message(router.name.clone());
        match scanner.scan_router(router, args.dry_run).await {
            Ok(report) => rows.push(ScanRow {
                router: router.name.clone(),
                secrets: report.secrets_total.to_string(),
                matched: report.matched.to_string(),
                orphaned: report.orphaned.to_string(),
                result: if report.dry_run { "ok (dry-run)".into() } else { "ok".into() },
            }),
            Err(e) => {
                failed += 1;
                rows.push(ScanRow {
                    router: router.name.clone(),
                    secrets: "-".into(),
                    matched: "-".into(),
                    orphaned: "-".into(),
                    result: format!("failed: {e}"),
                });
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let out = output::render_list(&global.output, &rows, |r| r.router.clone());
    output::print_output(&out, global.quiet);

    if args.dry_run && !global.quiet {
        eprintln!("Dry-run: nothing was saved.");
    }

    util::batch_result(failed, total)
}

fn progress_bar(total: usize, quiet: bool) -> ProgressBar {
    if quiet || total <= 1 {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}
