// ── Network scanner ──
//
// Reconciles "which customers live on which router" against device truth:
// one connection per router, one pass over its secrets, matching on the
// unique PPPoE username. Assigns `router_id` only -- status is the
// enforcer's to change, and drift between status and the live profile is
// the audit's to report.

use tracing::{debug, info};

use crate::config::CoreConfig;
use crate::device::open_session;
use crate::error::CoreError;
use crate::model::Router;
use crate::store::{Store, customers, routers};

/// Counts from scanning one router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Secrets present on the device.
    pub secrets_total: usize,
    /// Secrets whose name matched a known customer.
    pub matched: usize,
    /// Secrets with no matching customer record.
    pub orphaned: usize,
    /// `true` when nothing was persisted.
    pub dry_run: bool,
}

/// Per-router outcome of a batch scan. One router failing must not abort
/// the rest of the batch.
pub struct ScanOutcome {
    pub router: Router,
    pub result: Result<ScanReport, CoreError>,
}

pub struct NetworkScanner {
    store: Store,
    config: CoreConfig,
}

impl NetworkScanner {
    pub fn new(store: Store, config: CoreConfig) -> Self {
        Self { store, config }
    }

    /// Scan one router. On device failure the router is marked
    /// unreachable (unless dry-run) and the error returned as data for
    /// the caller's per-router report.
    pub async fn scan_router(
        &self,
        router: &Router,
        dry_run: bool,
    ) -> Result<ScanReport, CoreError> {
        let pool = self.store.pool();

        let secrets = match self.list_secrets(router).await {
            Ok(secrets) => secrets,
            Err(e) => {
                if !dry_run {
                    routers::mark_unreachable(pool, router.id).await?;
                }
                return Err(e);
            }
        };

        let mut report = ScanReport {
            secrets_total: secrets.len(),
            dry_run,
            ..ScanReport::default()
        };

        for secret in &secrets {
            match customers::find_by_pppoe_user(pool, &secret.name).await? {
                Some(customer) => {
                    report.matched += 1;
                    if !dry_run {
                        customers::assign_router(pool, customer.id, router.id).await?;
                    }
                }
                None => report.orphaned += 1,
            }
        }

        if !dry_run {
            routers::record_scan(
                pool,
                router.id,
                report.matched as i64,
                report.secrets_total as i64,
            )
            .await?;
        }

        info!(
            router = router.name,
            secrets = report.secrets_total,
            matched = report.matched,
            orphaned = report.orphaned,
            dry_run,
            "scan complete"
        );
        Ok(report)
    }

    /// Scan every router sequentially -- one slow device must not starve
    /// the rest, and the device CPUs are small enough that parallel API
    /// sessions from one orchestrator would hurt them.
    ///
    /// Includes inactive routers so a recovered device is re-adopted.
    pub async fn scan_all(&self, dry_run: bool) -> Result<Vec<ScanOutcome>, CoreError> {
        let all = routers::list_all(self.store.pool()).await?;
        let mut outcomes = Vec::with_capacity(all.len());
        for router in all {
            debug!(router = router.name, "scanning");
            let result = self.scan_router(&router, dry_run).await;
            outcomes.push(ScanOutcome { router, result });
        }
        Ok(outcomes)
    }

    async fn list_secrets(
        &self,
        router: &Router,
    ) -> Result<Vec<wisply_ros::ppp::PppSecret>, CoreError> {
        let mut session = open_session(router, &self.config).await?;
        let secrets = session
            .list_secrets()
            .await
            .map_err(|e| CoreError::from_device(&router.name, e))?;
        session.close().await;
        Ok(secrets)
    }
}
