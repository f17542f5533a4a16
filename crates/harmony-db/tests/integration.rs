//! Offline tests for harmony-db pool configuration and row conversions.
//! These tests do not require a live database connection.

use chrono::Utc;
use harmony_core::{AppConfig, Environment, Role, Shop};
use harmony_db::{DbError, PoolConfig, ShopRow, UserRow, UserUpdate};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        jwt_secret: "secret".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        token_ttl_days: 7,
        shop_utc_offset_minutes: 420,
        http_timeout_secs: 10,
        weather_api_key: None,
        weather_api_url: "http://weather".to_string(),
        google_maps_api_key: None,
        ai_api_key: None,
        ai_api_url: "http://ai".to_string(),
        ai_model: "model".to_string(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn user_row_into_user_parses_role_and_drops_hash() {
    let row = UserRow {
        id: Uuid::new_v4(),
        name: "Siti".to_string(),
        email: "siti@warung.id".to_string(),
        password_hash: "$2b$12$hash".to_string(),
        role: "admin".to_string(),
        created_at: Utc::now(),
    };

    let user = row.clone().into_user().expect("valid role");
    assert_eq!(user.id, row.id);
    assert_eq!(user.role, Role::Admin);

    let json = serde_json::to_value(&user).expect("serialize");
    assert!(json.get("password_hash").is_none());
}

#[test]
fn user_row_with_unknown_role_is_a_core_error() {
    let row = UserRow {
        id: Uuid::new_v4(),
        name: "X".to_string(),
        email: "x@y.z".to_string(),
        password_hash: String::new(),
        role: "owner".to_string(),
        created_at: Utc::now(),
    };
    assert!(matches!(row.into_user(), Err(DbError::Core(_))));
}

#[test]
fn shop_row_converts_field_for_field() {
    let row = ShopRow {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        name: "Cendol Dawet Ayu".to_string(),
        description: None,
        address: Some("Jl. Kebon Sirih".to_string()),
        phone: None,
        province: Some("jakarta".to_string()),
        open_time: "09:00".to_string(),
        close_time: "21:00".to_string(),
        latitude: Some(-6.21),
        longitude: Some(106.85),
        is_approved: true,
        created_at: Utc::now(),
    };
    let shop: Shop = row.clone().into();
    assert_eq!(shop.id, row.id);
    assert_eq!(shop.coordinates(), Some((-6.21, 106.85)));
    assert_eq!(shop.open_time, "09:00");
}

#[test]
fn empty_user_update_is_detected() {
    assert!(UserUpdate::default().is_empty());
    let update = UserUpdate {
        role: Some(Role::Admin),
        ..UserUpdate::default()
    };
    assert!(!update.is_empty());
}
