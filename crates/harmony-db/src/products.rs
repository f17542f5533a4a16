//! Product writes. Images and delivery links are written with their product
//! in one transaction.

use harmony_core::{Product, ProductType, Suitability};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::catalog::{ProductRow, PRODUCT_COLUMNS};
use crate::DbError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryUrls {
    pub gofood_url: Option<String>,
    pub grabfood_url: Option<String>,
    pub shopeefood_url: Option<String>,
}

impl DeliveryUrls {
    fn is_empty(&self) -> bool {
        self.gofood_url.is_none() && self.grabfood_url.is_none() && self.shopeefood_url.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub product_type: ProductType,
    pub price: Decimal,
    pub description: Option<String>,
    pub weather_suitability: Suitability,
    /// Stored in the given order.
    pub images: Vec<String>,
    pub delivery: DeliveryUrls,
}

/// Partial update. `images` and `delivery`, when present, replace the
/// existing set entirely.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub product_type: Option<ProductType>,
    pub price: Option<Decimal>,
    /// `Some("")` clears the stored description.
    pub description: Option<String>,
    pub weather_suitability: Option<Suitability>,
    pub images: Option<Vec<String>>,
    pub delivery: Option<DeliveryUrls>,
}

/// Creates a product under `shop_id` together with its images and links.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any write fails; nothing is persisted then.
pub async fn create_product(
    pool: &PgPool,
    shop_id: Uuid,
    new: &NewProduct,
) -> Result<Product, DbError> {
    let mut tx = pool.begin().await?;
    let product = insert_product(&mut *tx, shop_id, new).await?;
    tx.commit().await?;
    Ok(product)
}

pub(crate) async fn insert_product(
    conn: &mut PgConnection,
    shop_id: Uuid,
    new: &NewProduct,
) -> Result<Product, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products (shop_id, name, product_type, price, description, weather_suitability) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(shop_id)
    .bind(new.name.trim())
    .bind(new.product_type.as_str())
    .bind(new.price)
    .bind(new.description.as_deref())
    .bind(new.weather_suitability.as_str())
    .fetch_one(&mut *conn)
    .await?;

    replace_images(conn, row.id, &new.images).await?;
    replace_delivery_links(conn, row.id, &new.delivery).await?;

    row.into_product()
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has `id`, or [`DbError::Sqlx`]
/// if any write fails; nothing is persisted then.
pub async fn update_product(
    pool: &PgPool,
    id: Uuid,
    update: &ProductUpdate,
) -> Result<Product, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "UPDATE products SET \
             name = COALESCE($2, name), \
             product_type = COALESCE($3, product_type), \
             price = COALESCE($4, price), \
             description = CASE WHEN $5 = '' THEN NULL ELSE COALESCE($5, description) END, \
             weather_suitability = COALESCE($6, weather_suitability), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(update.name.as_deref().map(str::trim))
    .bind(update.product_type.map(ProductType::as_str))
    .bind(update.price)
    .bind(update.description.as_deref())
    .bind(update.weather_suitability.map(Suitability::as_str))
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    if let Some(images) = &update.images {
        replace_images(&mut *tx, id, images).await?;
    }
    if let Some(delivery) = &update.delivery {
        replace_delivery_links(&mut *tx, id, delivery).await?;
    }

    tx.commit().await?;
    row.into_product()
}

/// Returns `true` if a row was deleted. Images and links cascade.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Owner of the shop that sells product `id`, for authorization checks.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn product_owner(pool: &PgPool, id: Uuid) -> Result<Option<Uuid>, DbError> {
    let owner = sqlx::query_scalar::<_, Uuid>(
        "SELECT s.owner_id FROM products p JOIN shops s ON s.id = p.shop_id WHERE p.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(owner)
}

async fn replace_images(
    conn: &mut PgConnection,
    product_id: Uuid,
    images: &[String],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM product_images WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    for (position, url) in images.iter().enumerate() {
        sqlx::query(
            "INSERT INTO product_images (product_id, image_url, position) VALUES ($1, $2, $3)",
        )
        .bind(product_id)
        .bind(url)
        .bind(i32::try_from(position).unwrap_or(i32::MAX))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn replace_delivery_links(
    conn: &mut PgConnection,
    product_id: Uuid,
    delivery: &DeliveryUrls,
) -> Result<(), DbError> {
    if delivery.is_empty() {
        sqlx::query("DELETE FROM delivery_links WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO delivery_links (product_id, gofood_url, grabfood_url, shopeefood_url) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (product_id) DO UPDATE SET \
             gofood_url = EXCLUDED.gofood_url, \
             grabfood_url = EXCLUDED.grabfood_url, \
             shopeefood_url = EXCLUDED.shopeefood_url",
    )
    .bind(product_id)
    .bind(delivery.gofood_url.as_deref())
    .bind(delivery.grabfood_url.as_deref())
    .bind(delivery.shopeefood_url.as_deref())
    .execute(&mut *conn)
    .await?;
    Ok(())
}
