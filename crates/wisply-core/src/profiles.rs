// ── Profile sync ──
//
// Mirrors each router's PPP profile catalog into the local cache so
// package configuration can offer live profile names without a device
// round trip. System profiles and policy profiles (isolation, speed test)
// are filtered out by configured name patterns, not hardcoded branches.

use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::device::open_session;
use crate::error::CoreError;
use crate::model::Router;
use crate::store::{Store, profiles, routers};

/// Counts from syncing one router's profile catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSyncReport {
    /// Profiles reported by the device.
    pub discovered: usize,
    /// System/policy profiles skipped by the filters.
    pub skipped: usize,
    /// Profiles upserted into the cache.
    pub synced: usize,
    /// Stale cache rows removed.
    pub pruned: u64,
}

/// Per-router outcome of a batch profile sync.
pub struct ProfileSyncOutcome {
    pub router: Router,
    pub result: Result<ProfileSyncReport, CoreError>,
}

pub struct ProfileSync {
    store: Store,
    config: CoreConfig,
}

impl ProfileSync {
    pub fn new(store: Store, config: CoreConfig) -> Self {
        Self { store, config }
    }

    /// Sync one router's profiles into the cache.
    pub async fn sync_router(&self, router: &Router) -> Result<ProfileSyncReport, CoreError> {
        let mut session = open_session(router, &self.config).await?;
        let discovered = session
            .list_profiles()
            .await
            .map_err(|e| CoreError::from_device(&router.name, e))?;
        session.close().await;

        let pool = self.store.pool();
        let mut report = ProfileSyncReport {
            discovered: discovered.len(),
            ..ProfileSyncReport::default()
        };
        let mut kept = Vec::new();

        for profile in &discovered {
            if self.config.is_system_profile(&profile.name)
                || self.config.is_policy_profile(&profile.name)
            {
                debug!(router = router.name, profile = profile.name, "skipping profile");
                report.skipped += 1;
                continue;
            }

            let bandwidth = extract_bandwidth(profile.rate_limit.as_deref());
            if bandwidth.is_none() && profile.rate_limit.is_some() {
                warn!(
                    router = router.name,
                    profile = profile.name,
                    rate_limit = profile.rate_limit,
                    "rate limit did not match the expected convention"
                );
            }

            profiles::upsert(pool, router.id, profile, bandwidth.as_deref()).await?;
            kept.push(profile.name.clone());
            report.synced += 1;
        }

        report.pruned = profiles::prune_missing(pool, router.id, &kept).await?;

        info!(
            router = router.name,
            discovered = report.discovered,
            synced = report.synced,
            skipped = report.skipped,
            pruned = report.pruned,
            "profile sync complete"
        );
        Ok(report)
    }

    /// Sync every router sequentially, collecting per-router outcomes.
    pub async fn sync_all(&self) -> Result<Vec<ProfileSyncOutcome>, CoreError> {
        let all = routers::list_all(self.store.pool()).await?;
        let mut outcomes = Vec::with_capacity(all.len());
        for router in all {
            let result = self.sync_router(&router).await;
            outcomes.push(ProfileSyncOutcome { router, result });
        }
        Ok(outcomes)
    }

    /// Diagnostic diff between live router profiles and the local cache,
    /// without writing anything. Walks reachable routers only; failures
    /// are collected per router.
    pub async fn analyze(&self) -> Result<Vec<ProfileAnalysisOutcome>, CoreError> {
        let pool = self.store.pool();
        let mut outcomes = Vec::new();

        for router in routers::list_active(pool).await? {
            let result = self.analyze_router(&router).await;
            outcomes.push(ProfileAnalysisOutcome { router, result });
        }
        Ok(outcomes)
    }

    async fn analyze_router(&self, router: &Router) -> Result<ProfileDiff, CoreError> {
        let mut session = open_session(router, &self.config).await?;
        let live = session
            .list_profiles()
            .await
            .map_err(|e| CoreError::from_device(&router.name, e))?;
        session.close().await;

        let live_names: Vec<String> = live
            .into_iter()
            .map(|p| p.name)
            .filter(|name| {
                !self.config.is_system_profile(name) && !self.config.is_policy_profile(name)
            })
            .collect();

        let cached = profiles::list_by_router(self.store.pool(), router.id).await?;
        let cached_names: Vec<&str> = cached.iter().map(|p| p.name.as_str()).collect();

        Ok(ProfileDiff {
            live_total: live_names.len(),
            missing_in_cache: live_names
                .iter()
                .filter(|name| !cached_names.contains(&name.as_str()))
                .cloned()
                .collect(),
            stale_in_cache: cached
                .iter()
                .filter(|p| !live_names.contains(&p.name))
                .map(|p| p.name.clone())
                .collect(),
        })
    }
}

/// What `analyze` found for one reachable router.
#[derive(Debug, Clone, Default)]
pub struct ProfileDiff {
    /// Live profiles after filtering, i.e. what the cache should hold.
    pub live_total: usize,
    /// On the device but not in the cache -- the cache is behind.
    pub missing_in_cache: Vec<String>,
    /// In the cache but gone from the device -- stale rows.
    pub stale_in_cache: Vec<String>,
}

pub struct ProfileAnalysisOutcome {
    pub router: Router,
    pub result: Result<ProfileDiff, CoreError>,
}

/// Derive a short bandwidth label from a RouterOS rate-limit string.
///
/// The operator convention is `"<rx-burst>/<rx-max> <tx-burst>/<tx-max> ..."`;
/// the label is the configured maximum of the second token -- e.g.
/// `"2560k/15M 5120k/20M"` yields `"20M"`. Best-effort parse over a
/// convention, not a schema: anything malformed yields `None`.
pub fn extract_bandwidth(rate_limit: Option<&str>) -> Option<String> {
    let second = rate_limit?.split_whitespace().nth(1)?;
    let (_, max) = second.split_once('/')?;
    if max.is_empty() {
        return None;
    }
    Some(max.to_owned())
}
