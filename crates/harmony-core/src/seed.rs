//! Demo catalog definition loaded from `config/catalog.yaml`.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::catalog::ProductType;
use crate::hours::TimeOfDay;
use crate::provinces::find_province;
use crate::weather::Suitability;
use crate::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct SeedOwner {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedDeliveryLinks {
    pub gofood: Option<String>,
    pub grabfood: Option<String>,
    pub shopeefood: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub price: Decimal,
    pub description: Option<String>,
    pub weather_suitability: Suitability,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub delivery: SeedDeliveryLinks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedShop {
    pub name: String,
    pub owner: SeedOwner,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub province: Option<String>,
    pub open_time: String,
    pub close_time: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub shops: Vec<SeedShop>,
}

/// Load and validate the demo catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SeedFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_catalog(&content)
}

/// Parse and validate catalog YAML.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_catalog(content: &str) -> Result<CatalogFile, ConfigError> {
    let catalog: CatalogFile = serde_yaml::from_str(content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut seen_shops = HashSet::new();

    for shop in &catalog.shops {
        if shop.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "shop name must be non-empty".to_string(),
            ));
        }
        if !seen_shops.insert(shop.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate shop name: '{}'",
                shop.name
            )));
        }
        if !shop.owner.email.contains('@') {
            return Err(ConfigError::Validation(format!(
                "shop '{}' has invalid owner email '{}'",
                shop.name, shop.owner.email
            )));
        }
        for raw in [&shop.open_time, &shop.close_time] {
            TimeOfDay::parse(raw).map_err(|e| {
                ConfigError::Validation(format!("shop '{}': {e}", shop.name))
            })?;
        }
        if let Some(province) = &shop.province {
            if find_province(province).is_none() {
                return Err(ConfigError::Validation(format!(
                    "shop '{}' has unknown province '{province}'",
                    shop.name
                )));
            }
        }
        if shop.latitude.is_some() != shop.longitude.is_some() {
            return Err(ConfigError::Validation(format!(
                "shop '{}' must set both latitude and longitude or neither",
                shop.name
            )));
        }

        let mut seen_products = HashSet::new();
        for product in &shop.products {
            if product.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "shop '{}' has a product with an empty name",
                    shop.name
                )));
            }
            if !seen_products.insert(product.name.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "shop '{}' lists product '{}' twice",
                    shop.name, product.name
                )));
            }
            if product.price.is_sign_negative() {
                return Err(ConfigError::Validation(format!(
                    "product '{}' has negative price {}",
                    product.name, product.price
                )));
            }
        }
    }

    Ok(())
}
