// Customer queries. Status and previous_profile writes are single
// statements so a status transition and its captured profile land
// together or not at all.

use chrono::Utc;
use secrecy::ExposeSecret;
use sqlx::SqlitePool;

use crate::error::CoreError;
use crate::model::{Customer, CustomerStatus, NewCustomer};

pub async fn create(pool: &SqlitePool, new: &NewCustomer) -> Result<Customer, CoreError> {
    let result = sqlx::query(
        "INSERT INTO customers (name, pppoe_user, pppoe_pass, status, router_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&new.name)
    .bind(&new.pppoe_user)
    .bind(new.pppoe_pass.as_ref().map(ExposeSecret::expose_secret))
    .bind(new.status.to_string())
    .bind(new.router_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    find_by_id(pool, result.last_insert_rowid())
        .await?
        .ok_or_else(|| CoreError::CustomerNotFound {
            identifier: new.pppoe_user.clone(),
        })
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Customer>, CoreError> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(customer)
}

/// Exact match on the unique PPPoE username.
pub async fn find_by_pppoe_user(
    pool: &SqlitePool,
    pppoe_user: &str,
) -> Result<Option<Customer>, CoreError> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE pppoe_user = ?")
        .bind(pppoe_user)
        .fetch_optional(pool)
        .await?;
    Ok(customer)
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Customer>, CoreError> {
    let customers = sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY pppoe_user")
        .fetch_all(pool)
        .await?;
    Ok(customers)
}

pub async fn list_by_router(pool: &SqlitePool, router_id: i64) -> Result<Vec<Customer>, CoreError> {
    let customers =
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE router_id = ? ORDER BY pppoe_user")
            .bind(router_id)
            .fetch_all(pool)
            .await?;
    Ok(customers)
}

/// Scanner ownership: assign the router a live secret was found on.
pub async fn assign_router(
    pool: &SqlitePool,
    customer_id: i64,
    router_id: i64,
) -> Result<(), CoreError> {
    sqlx::query("UPDATE customers SET router_id = ? WHERE id = ?")
        .bind(router_id)
        .bind(customer_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Persist a verified isolation: status and the captured profile change
/// in the same statement.
pub async fn record_isolated(
    pool: &SqlitePool,
    customer_id: i64,
    previous_profile: Option<&str>,
) -> Result<(), CoreError> {
    sqlx::query("UPDATE customers SET status = ?, previous_profile = ? WHERE id = ?")
        .bind(CustomerStatus::Isolated.to_string())
        .bind(previous_profile)
        .bind(customer_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Persist a verified reconnect: back to active, captured profile cleared.
pub async fn record_reconnected(pool: &SqlitePool, customer_id: i64) -> Result<(), CoreError> {
    sqlx::query("UPDATE customers SET status = ?, previous_profile = NULL WHERE id = ?")
        .bind(CustomerStatus::Active.to_string())
        .bind(customer_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_status(
    pool: &SqlitePool,
    customer_id: i64,
    status: CustomerStatus,
) -> Result<(), CoreError> {
    sqlx::query("UPDATE customers SET status = ? WHERE id = ?")
        .bind(status.to_string())
        .bind(customer_id)
        .execute(pool)
        .await?;
    Ok(())
}
