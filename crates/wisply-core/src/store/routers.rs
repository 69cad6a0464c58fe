// Router queries. Snapshot writes are field-scoped per component.

use chrono::Utc;
use secrecy::ExposeSecret;
use sqlx::SqlitePool;

use crate::error::CoreError;
use crate::model::{NewRouter, Router};
use wisply_ros::system::SystemResource;

/// Register a router and return the stored row.
pub async fn create(pool: &SqlitePool, new: &NewRouter) -> Result<Router, CoreError> {
    let result = sqlx::query(
        "INSERT INTO routers (name, address, port, username, password, isolation_profile)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&new.name)
    .bind(&new.address)
    .bind(new.port)
    .bind(&new.username)
    .bind(new.password.expose_secret())
    .bind(&new.isolation_profile)
    .execute(pool)
    .await?;

    find_by_id(pool, result.last_insert_rowid())
        .await?
        .ok_or_else(|| CoreError::RouterNotFound {
            identifier: new.name.clone(),
        })
}

/// Insert-or-update a router by name. Used by config seeding; never
/// touches the snapshot columns.
pub async fn upsert_seed(pool: &SqlitePool, new: &NewRouter) -> Result<Router, CoreError> {
    sqlx::query(
        "INSERT INTO routers (name, address, port, username, password, isolation_profile)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (name) DO UPDATE SET
             address = excluded.address,
             port = excluded.port,
             username = excluded.username,
             password = excluded.password,
             isolation_profile = excluded.isolation_profile",
    )
    .bind(&new.name)
    .bind(&new.address)
    .bind(new.port)
    .bind(&new.username)
    .bind(new.password.expose_secret())
    .bind(&new.isolation_profile)
    .execute(pool)
    .await?;

    find_by_name(pool, &new.name)
        .await?
        .ok_or_else(|| CoreError::RouterNotFound {
            identifier: new.name.clone(),
        })
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Router>, CoreError> {
    let router = sqlx::query_as::<_, Router>("SELECT * FROM routers WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(router)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Router>, CoreError> {
    let router = sqlx::query_as::<_, Router>("SELECT * FROM routers WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(router)
}

/// All routers, reachable or not -- batch flows include inactive routers
/// so a recovered device is picked up automatically.
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Router>, CoreError> {
    let routers = sqlx::query_as::<_, Router>("SELECT * FROM routers ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(routers)
}

/// Only routers currently marked reachable.
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Router>, CoreError> {
    let routers =
        sqlx::query_as::<_, Router>("SELECT * FROM routers WHERE is_active = 1 ORDER BY name")
            .fetch_all(pool)
            .await?;
    Ok(routers)
}

pub async fn set_isolation_profile(
    pool: &SqlitePool,
    id: i64,
    profile: Option<&str>,
) -> Result<(), CoreError> {
    sqlx::query("UPDATE routers SET isolation_profile = ? WHERE id = ?")
        .bind(profile)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Persist a successful health check: vitals snapshot + reachable.
pub async fn record_health(
    pool: &SqlitePool,
    id: i64,
    resource: &SystemResource,
    online_count: i64,
) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE routers SET
             is_active = 1,
             cpu_load = ?,
             uptime = ?,
             version = ?,
             board_name = ?,
             current_online_count = ?,
             last_health_check_at = ?
         WHERE id = ?",
    )
    .bind(resource.cpu_load)
    .bind(&resource.uptime)
    .bind(&resource.version)
    .bind(&resource.board_name)
    .bind(online_count)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Persist a failed health check. The timestamp is stamped even on
/// failure so "never checked" and "checked and failed" stay
/// distinguishable.
pub async fn record_health_failure(pool: &SqlitePool, id: i64) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE routers SET is_active = 0, last_health_check_at = ? WHERE id = ?",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Persist a successful scan: scan snapshot + reachable.
pub async fn record_scan(
    pool: &SqlitePool,
    id: i64,
    matched: i64,
    total_secrets: i64,
) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE routers SET
             is_active = 1,
             last_scanned_at = ?,
             last_scan_customers_count = ?,
             total_pppoe_count = ?
         WHERE id = ?",
    )
    .bind(Utc::now())
    .bind(matched)
    .bind(total_secrets)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Flag a router unreachable without touching any snapshot column.
pub async fn mark_unreachable(pool: &SqlitePool, id: i64) -> Result<(), CoreError> {
    sqlx::query("UPDATE routers SET is_active = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
