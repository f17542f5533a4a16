mod api;
mod auth;
mod middleware;

use std::sync::Arc;

use harmony_providers::{ChatClient, MapUrlBuilder, OpenWeatherClient, WeatherService};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::auth::TokenKeys;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Arc::new(harmony_core::load_app_config()?);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting harmony-server");

    let pool_config = harmony_db::PoolConfig::from_app_config(&config);
    let pool = harmony_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = harmony_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations complete");

    let weather = match config.weather_api_key.as_deref() {
        Some(key) => WeatherService::live(OpenWeatherClient::new(
            key,
            &config.weather_api_url,
            config.http_timeout_secs,
        )?),
        None => {
            tracing::warn!("WEATHER_API_KEY not set; serving mock and synthetic weather");
            WeatherService::offline()
        }
    };

    let ai = match config.ai_api_key.as_deref() {
        Some(key) => Some(ChatClient::new(
            key,
            &config.ai_api_url,
            &config.ai_model,
            config.http_timeout_secs,
        )?),
        None => {
            tracing::info!("AI_API_KEY not set; recommendations will skip suggestions");
            None
        }
    };

    let state = api::AppState {
        pool,
        tokens: TokenKeys::new(&config.jwt_secret, config.token_ttl_days),
        bcrypt_cost: bcrypt::DEFAULT_COST,
        weather,
        maps: MapUrlBuilder::new(config.google_maps_api_key.clone()),
        ai,
        shop_utc_offset_minutes: config.shop_utc_offset_minutes,
    };
    let app = api::build_app(state, api::default_rate_limit_state());

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
