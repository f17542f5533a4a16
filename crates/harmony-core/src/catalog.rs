//! Catalog records and the assembler that denormalizes them.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hours::{is_open_at, TimeOfDay};
use crate::weather::Suitability;
use crate::CoreError;

pub const DEFAULT_OPEN_TIME: &str = "07:00";
pub const DEFAULT_CLOSE_TIME: &str = "21:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Food,
    Beverage,
}

impl ProductType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::Food => "food",
            ProductType::Beverage => "beverage",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "food" => Ok(ProductType::Food),
            "beverage" => Ok(ProductType::Beverage),
            other => Err(CoreError::InvalidEnumValue {
                kind: "product type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    /// Price in rupiah.
    pub price: Decimal,
    pub description: Option<String>,
    pub weather_suitability: Suitability,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
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

impl Shop {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimeOfDay`] if the stored hours are malformed.
    pub fn is_open_at(&self, now: TimeOfDay) -> Result<bool, CoreError> {
        is_open_at(&self.open_time, &self.close_time, now)
    }

    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    pub position: i32,
}

/// Delivery platform links for a product. A product without a stored row
/// gets [`DeliveryLink::empty`], so consumers never see a missing object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLink {
    pub id: Option<Uuid>,
    pub product_id: Uuid,
    pub gofood_url: Option<String>,
    pub grabfood_url: Option<String>,
    pub shopeefood_url: Option<String>,
}

impl DeliveryLink {
    #[must_use]
    pub fn empty(product_id: Uuid) -> Self {
        Self {
            id: None,
            product_id,
            gofood_url: None,
            grabfood_url: None,
            shopeefood_url: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gofood_url.is_none() && self.grabfood_url.is_none() && self.shopeefood_url.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLinks {
    pub embed_url: String,
    pub directions_url: String,
}

/// One denormalized catalog card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub product: Product,
    pub shop: Shop,
    pub images: Vec<ProductImage>,
    pub delivery_links: DeliveryLink,
    pub is_shop_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maps: Option<MapLinks>,
}

/// Joins products with their shop, images, and delivery links.
///
/// Output order follows `products`. Images are ordered by `position`, ties
/// keep input order. When several links exist for a product the first wins.
/// `maps` is left empty for the caller to fill.
///
/// # Errors
///
/// Returns [`CoreError::MissingShop`] if a product's shop is absent, or
/// [`CoreError::InvalidTimeOfDay`] if a shop's stored hours are malformed.
pub fn assemble_catalog(
    products: Vec<Product>,
    shops: &[Shop],
    images: Vec<ProductImage>,
    links: Vec<DeliveryLink>,
    now: TimeOfDay,
) -> Result<Vec<CatalogEntry>, CoreError> {
    let shops_by_id: HashMap<Uuid, &Shop> = shops.iter().map(|s| (s.id, s)).collect();

    let mut images_by_product: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
    for image in images {
        images_by_product
            .entry(image.product_id)
            .or_default()
            .push(image);
    }

    let mut links_by_product: HashMap<Uuid, DeliveryLink> = HashMap::new();
    for link in links {
        links_by_product.entry(link.product_id).or_insert(link);
    }

    let mut open_cache: HashMap<Uuid, bool> = HashMap::new();
    let mut entries = Vec::with_capacity(products.len());

    for product in products {
        let shop = shops_by_id
            .get(&product.shop_id)
            .copied()
            .ok_or(CoreError::MissingShop {
                product_id: product.id,
                shop_id: product.shop_id,
            })?;

        let is_shop_open = match open_cache.get(&shop.id) {
            Some(open) => *open,
            None => {
                let open = shop.is_open_at(now)?;
                open_cache.insert(shop.id, open);
                open
            }
        };

        let mut product_images = images_by_product.remove(&product.id).unwrap_or_default();
        product_images.sort_by_key(|img| img.position);

        let delivery_links = links_by_product
            .remove(&product.id)
            .unwrap_or_else(|| DeliveryLink::empty(product.id));

        entries.push(CatalogEntry {
            shop: shop.clone(),
            images: product_images,
            delivery_links,
            is_shop_open,
            maps: None,
            product,
        });
    }

    Ok(entries)
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
