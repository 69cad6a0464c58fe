// ── Access enforcement state machine ──
//
// Isolates or restores a single customer's network access, verifying every
// state-changing write against the live device before persisting anything.
// A write the device accepted but did not apply must never be reported as
// success -- the customer's real-world access state would be unknown.
//
// Each action is a discrete unit of work: it takes the per-customer lock,
// opens its own DeviceSession, and releases both on every exit path.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use wisply_ros::DeviceSession;

use crate::config::CoreConfig;
use crate::device::open_session;
use crate::error::CoreError;
use crate::model::{Customer, CustomerStatus, Router};
use crate::store::{Store, customers, routers};

/// Result of an enforcement action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcementOutcome {
    /// The device was mutated (or re-confirmed) and the DB updated.
    Applied,
    /// The customer was already in the target status; no device traffic.
    AlreadyDone,
}

/// The enforcement state machine.
///
/// Transitions: `pending_installation → active` (activate), `active →
/// isolated` (isolate), `isolated → active` (reconnect), `any →
/// terminated` (terminate). Status rows are mutated exclusively through
/// these methods so `previous_profile` always reflects the profile
/// captured at isolation time.
pub struct AccessEnforcer {
    store: Store,
    config: CoreConfig,
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl AccessEnforcer {
    pub fn new(store: Store, config: CoreConfig) -> Self {
        Self {
            store,
            config,
            locks: DashMap::new(),
        }
    }

    /// No two enforcement actions for the same customer may interleave:
    /// isolate and reconnect racing would leave `previous_profile`
    /// undefined.
    async fn lock_customer(&self, customer_id: i64) -> OwnedMutexGuard<()> {
        // Clone the Arc out of the map before awaiting so the shard lock
        // is not held across the await point.
        let lock = {
            let entry = self.locks.entry(customer_id).or_default();
            Arc::clone(entry.value())
        };
        lock.lock_owned().await
    }

    async fn load_customer(&self, customer_id: i64) -> Result<Customer, CoreError> {
        customers::find_by_id(self.store.pool(), customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound {
                identifier: customer_id.to_string(),
            })
    }

    async fn load_router(&self, customer: &Customer) -> Result<Router, CoreError> {
        let router_id = customer.router_id.ok_or_else(|| CoreError::NoRouterAssigned {
            pppoe_user: customer.pppoe_user.clone(),
        })?;
        routers::find_by_id(self.store.pool(), router_id)
            .await?
            .ok_or_else(|| CoreError::RouterNotFound {
                identifier: router_id.to_string(),
            })
    }

    /// `pending_installation → active`.
    ///
    /// The NOC provisions the account out-of-band; this only flips the
    /// software status, and refuses when the device has no such account --
    /// the DB must never claim "active" for a secret that does not exist.
    pub async fn activate(&self, customer_id: i64) -> Result<EnforcementOutcome, CoreError> {
        let _guard = self.lock_customer(customer_id).await;
        let customer = self.load_customer(customer_id).await?;
        if customer.status == CustomerStatus::Active {
            return Ok(EnforcementOutcome::AlreadyDone);
        }
        let router = self.load_router(&customer).await?;

        let mut session = open_session(&router, &self.config).await?;
        let secret = self
            .find_secret(&mut session, &router, &customer.pppoe_user)
            .await?;
        session.close().await;

        debug!(
            pppoe_user = customer.pppoe_user,
            profile = secret.profile,
            "secret present, activating"
        );
        customers::set_status(self.store.pool(), customer.id, CustomerStatus::Active).await?;
        info!(pppoe_user = customer.pppoe_user, router = router.name, "customer activated");
        Ok(EnforcementOutcome::Applied)
    }

    /// `active → isolated`.
    ///
    /// Captures the live profile, writes the isolation profile, reads the
    /// secret back, and only persists `status=isolated` together with
    /// `previous_profile` once the read-back confirms the change.
    pub async fn isolate(&self, customer_id: i64) -> Result<EnforcementOutcome, CoreError> {
        let _guard = self.lock_customer(customer_id).await;
        let customer = self.load_customer(customer_id).await?;
        if customer.status == CustomerStatus::Isolated {
            return Ok(EnforcementOutcome::AlreadyDone);
        }
        let router = self.load_router(&customer).await?;
        let isolation = router.isolation_profile.clone().ok_or_else(|| {
            CoreError::IsolationProfileMissing {
                router: router.name.clone(),
            }
        })?;

        let mut session = open_session(&router, &self.config).await?;
        let secret = self
            .find_secret(&mut session, &router, &customer.pppoe_user)
            .await?;

        // Keep the profile captured by an earlier attempt if the secret is
        // already isolated (retried job after a timed-out write).
        let previous = if secret.profile == isolation {
            customer.previous_profile.clone()
        } else {
            Some(secret.profile.clone())
        };

        session
            .set_secret_profile(&secret.id, &isolation)
            .await
            .map_err(|e| CoreError::from_device(&router.name, e))?;

        let verified = self
            .find_secret(&mut session, &router, &customer.pppoe_user)
            .await?;
        if verified.profile != isolation {
            session.close().await;
            return Err(CoreError::VerificationFailed {
                pppoe_user: customer.pppoe_user.clone(),
                router: router.name.clone(),
                expected: isolation,
                found: verified.profile,
            });
        }

        kick_session(&mut session, &customer.pppoe_user).await;
        session.close().await;

        customers::record_isolated(self.store.pool(), customer.id, previous.as_deref()).await?;
        info!(
            pppoe_user = customer.pppoe_user,
            router = router.name,
            profile = isolation,
            "customer isolated"
        );
        Ok(EnforcementOutcome::Applied)
    }

    /// `isolated → active`.
    ///
    /// Restores the captured `previous_profile` (or the configured default
    /// when none was captured), verifies the secret left the isolation
    /// profile, then persists `status=active` and clears the capture. On
    /// verification failure the DB stays `isolated`.
    pub async fn reconnect(&self, customer_id: i64) -> Result<EnforcementOutcome, CoreError> {
        let _guard = self.lock_customer(customer_id).await;
        let customer = self.load_customer(customer_id).await?;
        if customer.status == CustomerStatus::Active {
            return Ok(EnforcementOutcome::AlreadyDone);
        }
        let router = self.load_router(&customer).await?;

        let target = customer
            .previous_profile
            .clone()
            .unwrap_or_else(|| self.config.restore_profile.clone());

        let mut session = open_session(&router, &self.config).await?;
        let secret = self
            .find_secret(&mut session, &router, &customer.pppoe_user)
            .await?;

        session
            .set_secret_profile(&secret.id, &target)
            .await
            .map_err(|e| CoreError::from_device(&router.name, e))?;

        let verified = self
            .find_secret(&mut session, &router, &customer.pppoe_user)
            .await?;
        let restored = match router.isolation_profile.as_deref() {
            Some(isolation) => verified.profile != isolation,
            None => verified.profile == target,
        };
        if !restored {
            session.close().await;
            return Err(CoreError::VerificationFailed {
                pppoe_user: customer.pppoe_user.clone(),
                router: router.name.clone(),
                expected: target,
                found: verified.profile,
            });
        }

        kick_session(&mut session, &customer.pppoe_user).await;
        session.close().await;

        customers::record_reconnected(self.store.pool(), customer.id).await?;
        info!(
            pppoe_user = customer.pppoe_user,
            router = router.name,
            profile = target,
            "customer reconnected"
        );
        Ok(EnforcementOutcome::Applied)
    }

    /// `any → terminated`.
    ///
    /// Kicks the active session best-effort so the subscriber drops
    /// offline immediately, but the status change never waits on router
    /// reachability -- "this person stopped being a customer" is a
    /// business fact, not a network one.
    pub async fn terminate(&self, customer_id: i64) -> Result<EnforcementOutcome, CoreError> {
        let _guard = self.lock_customer(customer_id).await;
        let customer = self.load_customer(customer_id).await?;
        if customer.status == CustomerStatus::Terminated {
            return Ok(EnforcementOutcome::AlreadyDone);
        }

        match self.load_router(&customer).await {
            Ok(router) => match open_session(&router, &self.config).await {
                Ok(mut session) => {
                    kick_session(&mut session, &customer.pppoe_user).await;
                    session.close().await;
                }
                Err(e) => {
                    warn!(
                        pppoe_user = customer.pppoe_user,
                        router = router.name,
                        error = %e,
                        "could not kick session during termination"
                    );
                }
            },
            Err(e) => {
                warn!(pppoe_user = customer.pppoe_user, error = %e, "terminating without session kick");
            }
        }

        customers::set_status(self.store.pool(), customer.id, CustomerStatus::Terminated).await?;
        info!(pppoe_user = customer.pppoe_user, "customer terminated");
        Ok(EnforcementOutcome::Applied)
    }

    /// Read the customer's secret, mapping absence to `NotProvisioned`.
    async fn find_secret(
        &self,
        session: &mut DeviceSession,
        router: &Router,
        pppoe_user: &str,
    ) -> Result<wisply_ros::ppp::PppSecret, CoreError> {
        session
            .find_secret(pppoe_user)
            .await
            .map_err(|e| CoreError::from_device(&router.name, e))?
            .ok_or_else(|| CoreError::NotProvisioned {
                pppoe_user: pppoe_user.to_owned(),
                router: router.name.clone(),
            })
    }
}

/// Drop the customer's active PPPoE session if one is online. Non-fatal
/// side effect: failures are logged and never abort the enforcement
/// action that requested the kick.
async fn kick_session(session: &mut DeviceSession, pppoe_user: &str) {
    match session.find_active(pppoe_user).await {
        Ok(Some(active)) => {
            if let Err(e) = session.remove_active(&active.id).await {
                warn!(pppoe_user, error = %e, "failed to kick active session");
            } else {
                debug!(pppoe_user, "active session kicked");
            }
        }
        Ok(None) => {}
        Err(e) => warn!(pppoe_user, error = %e, "failed to look up active session"),
    }
}
