//! Database operations for `shops`.

use chrono::{DateTime, Utc};
use harmony_core::Shop;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::DbError;

/// A row from the `shops` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShopRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub province: Option<String>,
    pub open_time: String,
    pub close_time: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ShopRow> for Shop {
    fn from(row: ShopRow) -> Self {
        Shop {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description,
            address: row.address,
            phone: row.phone,
            province: row.province,
            open_time: row.open_time,
            close_time: row.close_time,
            latitude: row.latitude,
            longitude: row.longitude,
            is_approved: row.is_approved,
            created_at: row.created_at,
        }
    }
}

pub(crate) const SHOP_COLUMNS: &str = "id, owner_id, name, description, address, phone, province, \
     open_time, close_time, latitude, longitude, is_approved, created_at";

/// Fields for a new shop row. Hours must already be validated.
#[derive(Debug, Clone)]
pub(crate) struct NewShop<'a> {
    pub owner_id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub address: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub province: Option<&'a str>,
    pub open_time: &'a str,
    pub close_time: &'a str,
    pub coordinates: Option<(f64, f64)>,
    pub is_approved: bool,
}

/// Owner-editable settings; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ShopSettings {
    pub name: Option<String>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    pub coordinates: Option<(f64, f64)>,
}

pub(crate) async fn insert_shop(
    conn: &mut PgConnection,
    new: &NewShop<'_>,
) -> Result<ShopRow, DbError> {
    let (latitude, longitude) = new.coordinates.unzip();
    let row = sqlx::query_as::<_, ShopRow>(&format!(
        "INSERT INTO shops (owner_id, name, description, address, phone, province, \
                            open_time, close_time, latitude, longitude, is_approved) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {SHOP_COLUMNS}"
    ))
    .bind(new.owner_id)
    .bind(new.name)
    .bind(new.description)
    .bind(new.address)
    .bind(new.phone)
    .bind(new.province)
    .bind(new.open_time)
    .bind(new.close_time)
    .bind(latitude)
    .bind(longitude)
    .bind(new.is_approved)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_shop(pool: &PgPool, id: Uuid) -> Result<Option<Shop>, DbError> {
    let row = sqlx::query_as::<_, ShopRow>(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Shop::from))
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_shops_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Shop>, DbError> {
    let rows = sqlx::query_as::<_, ShopRow>(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops WHERE owner_id = $1 ORDER BY created_at"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Shop::from).collect())
}

pub(crate) async fn list_shops_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Shop>, DbError> {
    let rows = sqlx::query_as::<_, ShopRow>(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Shop::from).collect())
}

/// Applies owner settings to a shop.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no shop has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_shop_settings(
    pool: &PgPool,
    id: Uuid,
    settings: &ShopSettings,
) -> Result<Shop, DbError> {
    let (latitude, longitude) = settings.coordinates.unzip();
    let row = sqlx::query_as::<_, ShopRow>(&format!(
        "UPDATE shops SET \
             name = COALESCE($2, name), \
             open_time = COALESCE($3, open_time), \
             close_time = COALESCE($4, close_time), \
             latitude = COALESCE($5, latitude), \
             longitude = COALESCE($6, longitude), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {SHOP_COLUMNS}"
    ))
    .bind(id)
    .bind(settings.name.as_deref())
    .bind(settings.open_time.as_deref())
    .bind(settings.close_time.as_deref())
    .bind(latitude)
    .bind(longitude)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Ok(row.into())
}
