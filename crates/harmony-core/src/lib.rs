pub mod app_config;
pub mod catalog;
pub mod config;
pub mod hours;
pub mod provinces;
pub mod seed;
pub mod shop_requests;
pub mod users;
pub mod weather;

pub use app_config::{AppConfig, Environment};
pub use catalog::{
    assemble_catalog, CatalogEntry, DeliveryLink, MapLinks, Product, ProductImage, ProductType,
    Shop, DEFAULT_CLOSE_TIME, DEFAULT_OPEN_TIME,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use hours::{is_open_at, local_time_of_day, minutes_since_midnight, spans_midnight, TimeOfDay};
pub use provinces::{find_province, Province, PROVINCES};
pub use seed::{load_catalog, CatalogFile};
pub use shop_requests::{ReviewDecision, ShopRequest, ShopRequestStatus};
pub use users::{normalize_email, Role, User};
pub use weather::{band_for_temperature, is_suitable, Suitability, WeatherReading};

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("product {product_id} references missing shop {shop_id}")]
    MissingShop { product_id: Uuid, shop_id: Uuid },
    #[error("invalid time of day '{0}': expected HH:MM")]
    InvalidTimeOfDay(String),
    #[error("invalid {kind}: {value}")]
    InvalidEnumValue { kind: &'static str, value: String },
    #[error("shop request is already {current}; only pending requests can be reviewed")]
    RequestAlreadyReviewed { current: ShopRequestStatus },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read seed file {path}: {source}")]
    SeedFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse seed file: {0}")]
    SeedFileParse(#[from] serde_yaml::Error),
    #[error("seed validation failed: {0}")]
    Validation(String),
}
