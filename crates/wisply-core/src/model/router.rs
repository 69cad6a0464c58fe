use chrono::{DateTime, Utc};
use secrecy::SecretString;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// A managed RouterOS device.
///
/// `is_active` is a reachability flag owned by the health monitor, not an
/// admin toggle. The monitoring and scan snapshot fields are each owned by
/// one component and updated with field-scoped writes so overlapping
/// schedules cannot clobber each other.
#[derive(Debug, Clone)]
pub struct Router {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Name of the PPP profile that represents "no service". Must name a
    /// profile that exists on the device; isolation fails loudly when
    /// unset.
    pub isolation_profile: Option<String>,
    pub is_active: bool,

    // ── Health snapshot (owned by HealthMonitor) ────────────────────
    pub cpu_load: Option<u8>,
    pub uptime: Option<String>,
    pub version: Option<String>,
    pub board_name: Option<String>,
    pub current_online_count: Option<i64>,
    pub last_health_check_at: Option<DateTime<Utc>>,

    // ── Scan snapshot (owned by NetworkScanner) ─────────────────────
    pub total_pppoe_count: Option<i64>,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub last_scan_customers_count: Option<i64>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Router {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let password: String = row.try_get("password")?;
        let cpu_load: Option<i64> = row.try_get("cpu_load")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            port: row.try_get("port")?,
            username: row.try_get("username")?,
            password: SecretString::from(password),
            isolation_profile: row.try_get("isolation_profile")?,
            is_active: row.try_get("is_active")?,
            cpu_load: cpu_load.and_then(|v| u8::try_from(v).ok()),
            uptime: row.try_get("uptime")?,
            version: row.try_get("version")?,
            board_name: row.try_get("board_name")?,
            current_online_count: row.try_get("current_online_count")?,
            last_health_check_at: row.try_get("last_health_check_at")?,
            total_pppoe_count: row.try_get("total_pppoe_count")?,
            last_scanned_at: row.try_get("last_scanned_at")?,
            last_scan_customers_count: row.try_get("last_scan_customers_count")?,
        })
    }
}

/// Fields needed to register a router (seed or admin form).
#[derive(Debug, Clone)]
pub struct NewRouter {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub isolation_profile: Option<String>,
}
