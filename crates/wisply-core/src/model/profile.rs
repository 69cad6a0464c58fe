use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Cached mirror of one device `/ppp/profile` entry.
///
/// Fully owned by ProfileSync: upserted on every sync run, pruned when the
/// profile disappears from the device, never hand-edited. Feeds package
/// configuration with live profile names without a device round trip.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RouterProfile {
    pub id: i64,
    pub router_id: i64,
    /// Profile name, unique per router.
    pub name: String,
    pub rate_limit: Option<String>,
    /// Short label derived from the rate limit's configured maximum
    /// (e.g. `"20M"`). Best-effort parse; `None` when the operator
    /// convention doesn't hold.
    pub bandwidth: Option<String>,
    pub local_address: Option<String>,
    pub remote_address: Option<String>,
    pub only_one: Option<String>,
    pub synced_at: DateTime<Utc>,
}
