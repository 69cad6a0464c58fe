// ── Health monitor ──
//
// Periodic sampling of router vitals. Owns the `is_active` flag and the
// health snapshot columns; always stamps `last_health_check_at`, success
// or failure, so "never checked" stays distinguishable from "checked and
// unreachable".

use tracing::{debug, info};

use wisply_ros::system::SystemResource;

use crate::config::CoreConfig;
use crate::device::open_session;
use crate::error::CoreError;
use crate::model::Router;
use crate::store::{Store, routers};

/// Vitals read from one reachable router.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub identity: Option<String>,
    pub resource: SystemResource,
    pub online_count: usize,
}

/// Per-router outcome of a batch health check.
pub struct HealthOutcome {
    pub router: Router,
    pub result: Result<HealthReport, CoreError>,
}

pub struct HealthMonitor {
    store: Store,
    config: CoreConfig,
}

impl HealthMonitor {
    pub fn new(store: Store, config: CoreConfig) -> Self {
        Self { store, config }
    }

    /// Check one router and persist the result either way.
    pub async fn check(&self, router: &Router) -> Result<HealthReport, CoreError> {
        let pool = self.store.pool();

        let report = match self.sample(router).await {
            Ok(report) => report,
            Err(e) => {
                routers::record_health_failure(pool, router.id).await?;
                return Err(e);
            }
        };

        routers::record_health(
            pool,
            router.id,
            &report.resource,
            report.online_count as i64,
        )
        .await?;

        info!(
            router = router.name,
            online = report.online_count,
            cpu = report.resource.cpu_load,
            "health check ok"
        );
        Ok(report)
    }

    /// Check every router sequentially, including ones currently marked
    /// inactive -- that is how a recovered router comes back.
    pub async fn check_all(&self) -> Result<Vec<HealthOutcome>, CoreError> {
        let all = routers::list_all(self.store.pool()).await?;
        let mut outcomes = Vec::with_capacity(all.len());
        for router in all {
            debug!(router = router.name, "checking health");
            let result = self.check(&router).await;
            outcomes.push(HealthOutcome { router, result });
        }
        Ok(outcomes)
    }

    async fn sample(&self, router: &Router) -> Result<HealthReport, CoreError> {
        let mut session = open_session(router, &self.config).await?;
        let wrap = |e| CoreError::from_device(&router.name, e);

        let identity = session.system_identity().await.map_err(wrap)?;
        let resource = session.system_resource().await.map_err(wrap)?;
        let online = session.active_sessions().await.map_err(wrap)?;
        session.close().await;

        Ok(HealthReport {
            identity,
            resource,
            online_count: online.len(),
        })
    }
}
