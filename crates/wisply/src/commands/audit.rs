//! Audit command handler: database vs. live device truth, read-only.

use serde::Serialize;
use tabled::Tabled;

use wisply_core::NetworkAudit;
use wisply_core::audit::MismatchKind;

use crate::cli::GlobalOpts;
use crate::commands::{Context, util};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled, Serialize)]
struct AuditRow {
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "Secrets")]
    secrets: String,
    #[tabled(rename = "Matched")]
    matched: String,
    #[tabled(rename = "Orphaned")]
    orphaned: String,
    #[tabled(rename = "Mismatches")]
    mismatches: String,
}

#[derive(Tabled, Serialize)]
struct MismatchRow {
    #[tabled(rename = "PPPoE user")]
    pppoe_user: String,
    #[tabled(rename = "DB status")]
    status: String,
    #[tabled(rename = "Live profile")]
    live_profile: String,
    #[tabled(rename = "Finding")]
    finding: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let audit = NetworkAudit::new(ctx.store.clone(), ctx.core_config.clone());
    let report = audit.run().await.map_err(CliError::from)?;

    let total = report.routers.len();
    let mut failed = 0usize;
    let mut rows = Vec::with_capacity(total);
    let mut mismatch_rows = Vec::new();

    for outcome in &report.routers {
        match &outcome.result {
            Ok(router_audit) => {
                rows.push(AuditRow {
                    router: outcome.router.name.clone(),
                    secrets: router_audit.secrets_total.to_string(),
                    matched: router_audit.matched.to_string(),
                    orphaned: router_audit.orphaned.to_string(),
                    mismatches: router_audit.mismatches.len().to_string(),
                });
                for mismatch in &router_audit.mismatches {
                    mismatch_rows.push(MismatchRow {
                        pppoe_user: mismatch.pppoe_user.clone(),
                        status: mismatch.status.to_string(),
                        live_profile: mismatch.live_profile.clone(),
                        finding: match mismatch.kind {
                            MismatchKind::IsolatedInDbOnly => {
                                "DB isolated, device unrestricted".into()
                            }
                            MismatchKind::IsolatedOnDeviceOnly => {
                                "device isolated, DB disagrees".into()
                            }
                        },
                    });
                }
            }
            Err(e) => {
                failed += 1;
                rows.push(AuditRow {
                    router: outcome.router.name.clone(),
                    secrets: format!("failed: {e}"),
                    matched: "-".into(),
                    orphaned: "-".into(),
                    mismatches: "-".into(),
                });
            }
        }
    }

    let out = output::render_list(&global.output, &rows, |r| r.router.clone());
    output::print_output(&out, global.quiet);

    if !mismatch_rows.is_empty() {
        let out = output::render_list(&global.output, &mismatch_rows, |r| r.pppoe_user.clone());
        output::print_output(&out, global.quiet);
    }

    if !global.quiet {
        eprintln!(
            "Customers: {} total, {} found on routers, {} missing",
            report.total_customers, report.found, report.missing
        );
        if !mismatch_rows.is_empty() {
            eprintln!(
                "{} enforcement mismatch(es) found -- these are reported, never auto-healed.",
                mismatch_rows.len()
            );
        }
    }

    util::batch_result(failed, total)
}
