//! Catalog reads: fetch the four collections and hand them to the assembler.

use chrono::{DateTime, Utc};
use harmony_core::{
    assemble_catalog, CatalogEntry, DeliveryLink, Product, ProductImage, ProductType,
    Suitability, TimeOfDay,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::shops::list_shops_by_ids;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub product_type: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub weather_suitability: String,
    pub created_at: DateTime<Utc>,
}

impl ProductRow {
    pub(crate) fn into_product(self) -> Result<Product, DbError> {
        Ok(Product {
            id: self.id,
            shop_id: self.shop_id,
            name: self.name,
            product_type: self.product_type.parse()?,
            price: self.price,
            description: self.description,
            weather_suitability: self.weather_suitability.parse()?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ImageRow {
    id: Uuid,
    product_id: Uuid,
    image_url: String,
    position: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct DeliveryLinkRow {
    id: Uuid,
    product_id: Uuid,
    gofood_url: Option<String>,
    grabfood_url: Option<String>,
    shopeefood_url: Option<String>,
}

pub(crate) const PRODUCT_COLUMNS: &str =
    "id, shop_id, name, product_type, price, description, weather_suitability, created_at";

/// Filters for a catalog listing. All are optional and combine with AND.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogQuery {
    pub product_type: Option<ProductType>,
    pub shop_id: Option<Uuid>,
    /// Keep only products suitable for this band (wildcard-tagged included).
    pub band: Option<Suitability>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Lists denormalized catalog entries, newest product first. The band
/// filter and limit run in the query, so only the returned page is loaded.
///
/// # Errors
///
/// Returns [`DbError::Core`] if a product references a missing shop or a
/// stored value fails to parse, or [`DbError::Sqlx`] if a query fails.
pub async fn fetch_catalog(
    pool: &PgPool,
    query: &CatalogQuery,
    now: TimeOfDay,
) -> Result<Vec<CatalogEntry>, DbError> {
    let products = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE ($1::text IS NULL OR product_type = $1) \
           AND ($2::uuid IS NULL OR shop_id = $2) \
           AND ($3::text IS NULL OR weather_suitability = $3 OR weather_suitability = 'all') \
         ORDER BY created_at DESC, id \
         LIMIT $4"
    ))
    .bind(query.product_type.map(ProductType::as_str))
    .bind(query.shop_id)
    .bind(query.band.map(Suitability::as_str))
    .bind(query.limit.map(|limit| limit.max(0)))
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(ProductRow::into_product)
    .collect::<Result<Vec<_>, _>>()?;

    assemble(pool, products, now).await
}

/// Fetches one catalog entry by product id.
///
/// # Errors
///
/// Same as [`fetch_catalog`].
pub async fn fetch_catalog_entry(
    pool: &PgPool,
    product_id: Uuid,
    now: TimeOfDay,
) -> Result<Option<CatalogEntry>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let product = row.into_product()?;
    Ok(assemble(pool, vec![product], now).await?.into_iter().next())
}

async fn assemble(
    pool: &PgPool,
    products: Vec<Product>,
    now: TimeOfDay,
) -> Result<Vec<CatalogEntry>, DbError> {
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let mut shop_ids: Vec<Uuid> = products.iter().map(|p| p.shop_id).collect();
    shop_ids.sort_unstable();
    shop_ids.dedup();

    let shops = list_shops_by_ids(pool, &shop_ids).await?;

    let images = sqlx::query_as::<_, ImageRow>(
        "SELECT id, product_id, image_url, position FROM product_images \
         WHERE product_id = ANY($1) \
         ORDER BY product_id, position, created_at",
    )
    .bind(&product_ids)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|r| ProductImage {
        id: r.id,
        product_id: r.product_id,
        image_url: r.image_url,
        position: r.position,
    })
    .collect();

    let links = sqlx::query_as::<_, DeliveryLinkRow>(
        "SELECT id, product_id, gofood_url, grabfood_url, shopeefood_url FROM delivery_links \
         WHERE product_id = ANY($1)",
    )
    .bind(&product_ids)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|r| DeliveryLink {
        id: Some(r.id),
        product_id: r.product_id,
        gofood_url: r.gofood_url,
        grabfood_url: r.grabfood_url,
        shopeefood_url: r.shopeefood_url,
    })
    .collect();

    Ok(assemble_catalog(products, &shops, images, links, now)?)
}
