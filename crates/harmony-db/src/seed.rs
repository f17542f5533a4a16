use harmony_core::seed::{SeedProduct, SeedShop};
use harmony_core::{normalize_email, spans_midnight, CatalogFile};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::products::{insert_product, DeliveryUrls, NewProduct};
use crate::shops::{insert_shop, NewShop};
use crate::DbError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub owners: usize,
    pub shops_created: usize,
    pub products_created: usize,
}

/// Loads the demo catalog. Owners are upserted as `admin` accounts sharing
/// `owner_password_hash`; shops and products that already exist by name are
/// left untouched.
///
/// All writes run inside a single transaction; if any operation fails
/// the entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_catalog(
    pool: &PgPool,
    catalog: &CatalogFile,
    owner_password_hash: &str,
) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for shop in &catalog.shops {
        let owner_id = upsert_owner(&mut *tx, shop, owner_password_hash).await?;
        summary.owners += 1;

        let shop_id = match find_shop(&mut *tx, owner_id, &shop.name).await? {
            Some(id) => id,
            None => {
                let row = insert_shop(
                    &mut *tx,
                    &NewShop {
                        owner_id,
                        name: &shop.name,
                        description: shop.description.as_deref(),
                        address: shop.address.as_deref(),
                        phone: shop.phone.as_deref(),
                        province: shop.province.as_deref(),
                        open_time: &shop.open_time,
                        close_time: &shop.close_time,
                        coordinates: shop.latitude.zip(shop.longitude),
                        is_approved: true,
                    },
                )
                .await?;
                summary.shops_created += 1;
                row.id
            }
        };

        for product in &shop.products {
            if product_exists(&mut *tx, shop_id, &product.name).await? {
                continue;
            }
            insert_product(&mut *tx, shop_id, &to_new_product(product)).await?;
            summary.products_created += 1;
        }
    }

    tx.commit().await?;
    Ok(summary)
}

async fn upsert_owner(
    conn: &mut PgConnection,
    shop: &SeedShop,
    password_hash: &str,
) -> Result<Uuid, DbError> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (name, email, password_hash, role) \
         VALUES ($1, $2, $3, 'admin') \
         ON CONFLICT (email) DO UPDATE SET \
             name = EXCLUDED.name, \
             role = CASE WHEN users.role = 'superadmin' THEN users.role ELSE 'admin' END, \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(&shop.owner.name)
    .bind(normalize_email(&shop.owner.email))
    .bind(password_hash)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

async fn find_shop(
    conn: &mut PgConnection,
    owner_id: Uuid,
    name: &str,
) -> Result<Option<Uuid>, DbError> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM shops WHERE owner_id = $1 AND lower(name) = lower($2) LIMIT 1",
    )
    .bind(owner_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

async fn product_exists(conn: &mut PgConnection, shop_id: Uuid, name: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM products WHERE shop_id = $1 AND lower(name) = lower($2))",
    )
    .bind(shop_id)
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

fn to_new_product(product: &SeedProduct) -> NewProduct {
    NewProduct {
        name: product.name.clone(),
        product_type: product.product_type,
        price: product.price,
        description: product.description.clone(),
        weather_suitability: product.weather_suitability,
        images: product.images.clone(),
        delivery: DeliveryUrls {
            gofood_url: product.delivery.gofood.clone(),
            grabfood_url: product.delivery.grabfood.clone(),
            shopeefood_url: product.delivery.shopeefood.clone(),
        },
    }
}

/// Shops whose close time is earlier than their open time. These are
/// stored as-is and always report closed.
#[must_use]
pub fn overnight_shops(catalog: &CatalogFile) -> Vec<&str> {
    catalog
        .shops
        .iter()
        .filter(|s| spans_midnight(&s.open_time, &s.close_time).unwrap_or(false))
        .map(|s| s.name.as_str())
        .collect()
}
