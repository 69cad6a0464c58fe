// Profile cache queries. ProfileSync is the only writer.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::CoreError;
use crate::model::RouterProfile;
use wisply_ros::ppp::PppProfile;

/// Insert-or-refresh one cached profile, keyed by (router, name).
pub async fn upsert(
    pool: &SqlitePool,
    router_id: i64,
    profile: &PppProfile,
    bandwidth: Option<&str>,
) -> Result<(), CoreError> {
    sqlx::query(
        "INSERT INTO router_profiles
             (router_id, name, rate_limit, bandwidth, local_address, remote_address, only_one, synced_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (router_id, name) DO UPDATE SET
             rate_limit = excluded.rate_limit,
             bandwidth = excluded.bandwidth,
             local_address = excluded.local_address,
             remote_address = excluded.remote_address,
             only_one = excluded.only_one,
             synced_at = excluded.synced_at",
    )
    .bind(router_id)
    .bind(&profile.name)
    .bind(&profile.rate_limit)
    .bind(bandwidth)
    .bind(&profile.local_address)
    .bind(&profile.remote_address)
    .bind(&profile.only_one)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Drop cached rows for profiles no longer present on the device.
/// Returns the number of rows pruned.
pub async fn prune_missing(
    pool: &SqlitePool,
    router_id: i64,
    keep: &[String],
) -> Result<u64, CoreError> {
    if keep.is_empty() {
        let result = sqlx::query("DELETE FROM router_profiles WHERE router_id = ?")
            .bind(router_id)
            .execute(pool)
            .await?;
        return Ok(result.rows_affected());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("DELETE FROM router_profiles WHERE router_id = ");
    builder.push_bind(router_id);
    builder.push(" AND name NOT IN (");
    let mut separated = builder.separated(", ");
    for name in keep {
        separated.push_bind(name);
    }
    separated.push_unseparated(")");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn list_by_router(
    pool: &SqlitePool,
    router_id: i64,
) -> Result<Vec<RouterProfile>, CoreError> {
    let profiles = sqlx::query_as::<_, RouterProfile>(
        "SELECT * FROM router_profiles WHERE router_id = ? ORDER BY name",
    )
    .bind(router_id)
    .fetch_all(pool)
    .await?;
    Ok(profiles)
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<RouterProfile>, CoreError> {
    let profiles =
        sqlx::query_as::<_, RouterProfile>("SELECT * FROM router_profiles ORDER BY router_id, name")
            .fetch_all(pool)
            .await?;
    Ok(profiles)
}
