//! Aggregate counts for the admin and superadmin dashboards.

use harmony_core::{Role, User};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::users::{count_users_by_role, list_users};
use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AdminStats {
    pub total_products: i64,
    pub total_shops: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuperadminStats {
    pub total_admins: i64,
    pub total_shops: i64,
    pub pending_requests: i64,
    pub total_products: i64,
    pub admins: Vec<User>,
}

/// Counts for the shops owned by `owner_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn admin_stats(pool: &PgPool, owner_id: Uuid) -> Result<AdminStats, DbError> {
    let stats = sqlx::query_as::<_, AdminStats>(
        "SELECT \
             (SELECT COUNT(*) FROM products p JOIN shops s ON s.id = p.shop_id \
              WHERE s.owner_id = $1) AS total_products, \
             (SELECT COUNT(*) FROM shops WHERE owner_id = $1) AS total_shops",
    )
    .bind(owner_id)
    .fetch_one(pool)
    .await?;
    Ok(stats)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn superadmin_stats(pool: &PgPool) -> Result<SuperadminStats, DbError> {
    let (total_shops, pending_requests, total_products) = sqlx::query_as::<_, (i64, i64, i64)>(
        "SELECT \
             (SELECT COUNT(*) FROM shops), \
             (SELECT COUNT(*) FROM shop_requests WHERE status = 'pending'), \
             (SELECT COUNT(*) FROM products)",
    )
    .fetch_one(pool)
    .await?;

    let total_admins = count_users_by_role(pool, Role::Admin).await?;
    let admins = list_users(pool, Some(Role::Admin)).await?;

    Ok(SuperadminStats {
        total_admins,
        total_shops,
        pending_requests,
        total_products,
        admins,
    })
}
