use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub token_ttl_days: i64,
    /// Offset applied to the server clock before comparing against shop hours.
    pub shop_utc_offset_minutes: i32,
    pub http_timeout_secs: u64,
    pub weather_api_key: Option<String>,
    pub weather_api_url: String,
    pub google_maps_api_key: Option<String>,
    pub ai_api_key: Option<String>,
    pub ai_api_url: String,
    pub ai_model: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("jwt_secret", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("token_ttl_days", &self.token_ttl_days)
            .field("shop_utc_offset_minutes", &self.shop_utc_offset_minutes)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field(
                "weather_api_key",
                &self.weather_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("weather_api_url", &self.weather_api_url)
            .field(
                "google_maps_api_key",
                &self.google_maps_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "[redacted]"))
            .field("ai_api_url", &self.ai_api_url)
            .field("ai_model", &self.ai_model)
            .finish()
    }
}
