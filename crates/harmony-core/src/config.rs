use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_AI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_AI_MODEL: &str = "gpt-3.5-turbo";
/// Longest session token lifetime accepted from the environment.
pub const MAX_TOKEN_TTL_DAYS: i64 = 365;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Blank optional keys count as unset so `.env` templates can leave them empty.
    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        or_default(var, default)
            .parse::<i64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_i32 = |var: &str, default: &str| -> Result<i32, ConfigError> {
        or_default(var, default)
            .parse::<i32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let jwt_secret = require("JWT_SECRET")?;

    let env = parse_environment(&or_default("HARMONY_ENV", "development"))?;
    let bind_addr = parse_addr("HARMONY_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("HARMONY_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("HARMONY_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("HARMONY_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("HARMONY_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let token_ttl_days = parse_i64("HARMONY_TOKEN_TTL_DAYS", "7")?;
    if !(1..=MAX_TOKEN_TTL_DAYS).contains(&token_ttl_days) {
        return Err(invalid(
            "HARMONY_TOKEN_TTL_DAYS",
            format!("must be between 1 and {MAX_TOKEN_TTL_DAYS}, got {token_ttl_days}"),
        ));
    }

    let shop_utc_offset_minutes = parse_i32("HARMONY_SHOP_UTC_OFFSET_MINUTES", "420")?;
    if !(-14 * 60..=14 * 60).contains(&shop_utc_offset_minutes) {
        return Err(invalid(
            "HARMONY_SHOP_UTC_OFFSET_MINUTES",
            format!("must be within ±840 minutes, got {shop_utc_offset_minutes}"),
        ));
    }

    let http_timeout_secs = parse_u64("HARMONY_HTTP_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        jwt_secret,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        token_ttl_days,
        shop_utc_offset_minutes,
        http_timeout_secs,
        weather_api_key: optional("WEATHER_API_KEY"),
        weather_api_url: or_default("WEATHER_API_URL", DEFAULT_WEATHER_API_URL),
        google_maps_api_key: optional("GOOGLE_MAPS_API_KEY"),
        ai_api_key: optional("AI_API_KEY"),
        ai_api_url: or_default("AI_API_URL", DEFAULT_AI_API_URL),
        ai_model: or_default("AI_MODEL", DEFAULT_AI_MODEL),
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "HARMONY_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
