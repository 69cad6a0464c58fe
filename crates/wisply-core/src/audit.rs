// ── Network audit ──
//
// Read-only diff between the database and device truth. A customer is
// "enforced" only when DB status and the live secret profile agree; any
// disagreement is reported here, never auto-healed -- silently rewriting
// either side would hide the defect that caused the drift.

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::config::CoreConfig;
use crate::device::open_session;
use crate::error::CoreError;
use crate::model::{Customer, CustomerStatus, Router};
use crate::store::{Store, customers, routers};

/// A customer whose DB status disagrees with the live secret profile.
#[derive(Debug, Clone)]
pub struct Mismatch {
    pub pppoe_user: String,
    pub status: CustomerStatus,
    pub live_profile: String,
    pub kind: MismatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    /// DB says isolated, device shows an unrestricted profile.
    IsolatedInDbOnly,
    /// Device shows the isolation profile, DB says otherwise.
    IsolatedOnDeviceOnly,
}

/// Findings for one reachable router.
#[derive(Debug, Clone, Default)]
pub struct RouterAudit {
    pub secrets_total: usize,
    /// Secrets that matched a DB customer.
    pub matched: usize,
    /// Secrets with no DB customer (provisioned out-of-band).
    pub orphaned: usize,
    pub mismatches: Vec<Mismatch>,
}

pub struct AuditOutcome {
    pub router: Router,
    pub result: Result<RouterAudit, CoreError>,
}

/// Whole-network audit report.
pub struct AuditReport {
    pub total_customers: usize,
    /// Customers found on at least one reachable router.
    pub found: usize,
    /// Customers found on no reachable router.
    pub missing: usize,
    pub routers: Vec<AuditOutcome>,
}

pub struct NetworkAudit {
    store: Store,
    config: CoreConfig,
}

impl NetworkAudit {
    pub fn new(store: Store, config: CoreConfig) -> Self {
        Self { store, config }
    }

    /// Audit every active router. Per-router failures are collected, not
    /// propagated.
    pub async fn run(&self) -> Result<AuditReport, CoreError> {
        let pool = self.store.pool();
        let all_customers = customers::list_all(pool).await?;
        let by_user: HashMap<&str, &Customer> = all_customers
            .iter()
            .map(|c| (c.pppoe_user.as_str(), c))
            .collect();

        let mut found: HashSet<String> = HashSet::new();
        let mut outcomes = Vec::new();

        for router in routers::list_active(pool).await? {
            let result = self.audit_router(&router, &by_user, &mut found).await;
            outcomes.push(AuditOutcome { router, result });
        }

        let report = AuditReport {
            total_customers: all_customers.len(),
            found: found.len(),
            missing: all_customers.len() - found.len(),
            routers: outcomes,
        };
        info!(
            customers = report.total_customers,
            found = report.found,
            missing = report.missing,
            "network audit complete"
        );
        Ok(report)
    }

    async fn audit_router(
        &self,
        router: &Router,
        by_user: &HashMap<&str, &Customer>,
        found: &mut HashSet<String>,
    ) -> Result<RouterAudit, CoreError> {
        let mut session = open_session(router, &self.config).await?;
        let secrets = session
            .list_secrets()
            .await
            .map_err(|e| CoreError::from_device(&router.name, e))?;
        session.close().await;

        let mut audit = RouterAudit {
            secrets_total: secrets.len(),
            ..RouterAudit::default()
        };

        for secret in &secrets {
            let Some(customer) = by_user.get(secret.name.as_str()) else {
                audit.orphaned += 1;
                continue;
            };
            audit.matched += 1;
            found.insert(secret.name.clone());

            let Some(isolation) = router.isolation_profile.as_deref() else {
                continue;
            };
            let on_isolation = secret.profile == isolation;
            let db_isolated = customer.status == CustomerStatus::Isolated;
            // Pending/terminated customers have no enforcement expectation.
            let enforceable = matches!(
                customer.status,
                CustomerStatus::Active | CustomerStatus::Isolated
            );
            if !enforceable {
                continue;
            }

            if db_isolated && !on_isolation {
                audit.mismatches.push(Mismatch {
                    pppoe_user: secret.name.clone(),
                    status: customer.status,
                    live_profile: secret.profile.clone(),
                    kind: MismatchKind::IsolatedInDbOnly,
                });
            } else if !db_isolated && on_isolation {
                audit.mismatches.push(Mismatch {
                    pppoe_user: secret.name.clone(),
                    status: customer.status,
                    live_profile: secret.profile.clone(),
                    kind: MismatchKind::IsolatedOnDeviceOnly,
                });
            }
        }

        Ok(audit)
    }
}
