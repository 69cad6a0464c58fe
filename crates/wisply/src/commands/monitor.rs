//! Health-check command handler.

use serde::Serialize;
use tabled::Tabled;

use wisply_core::HealthMonitor;

use crate::cli::{GlobalOpts, MonitorArgs};
use crate::commands::{Context, util};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled, Serialize)]
struct HealthRow {
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Identity")]
    identity: String,
    #[tabled(rename = "Board")]
    board: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "Online")]
    online: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: MonitorArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let monitor = HealthMonitor::new(ctx.store.clone(), ctx.core_config.clone());
    let targets = util::resolve_routers(ctx, args.router.as_deref()).await?;
    let total = targets.len();

    let mut rows = Vec::with_capacity(total);
    let mut failed = 0usize;
    for router in &targets {
        match monitor.check(router).await {
            Ok(report) => rows.push(HealthRow {
                router: router.name.clone(),
                state: "online".into(),
                identity: output::dash(report.identity.as_deref()),
                board: output::dash(report.resource.board_name.as_deref()),
                version: output::dash(report.resource.version.as_deref()),
                cpu: report
                    .resource
                    .cpu_load
                    .map_or_else(|| "-".into(), |cpu| format!("{cpu}%")),
                uptime: output::dash(report.resource.uptime.as_deref()),
                online: report.online_count.to_string(),
            }),
            Err(e) => {
                failed += 1;
                rows.push(HealthRow {
                    router: router.name.clone(),
                    state: format!("offline: {e}"),
                    identity: "-".into(),
                    board: "-".into(),
                    version: "-".into(),
                    cpu: "-".into(),
                    uptime: "-".into(),
                    online: "-".into(),
                });
            }
        }
    }

    let out = output::render_list(&global.output, &rows, |r| r.router.clone());
    output::print_output(&out, global.quiet);

    util::batch_result(failed, total)
}
