//! Outbound integrations: current weather, map links, and chat-completion
//! suggestions.

pub mod ai;
pub mod error;
pub mod maps;
pub mod weather;

pub use ai::{ChatClient, SuggestionRequest};
pub use error::ProviderError;
pub use maps::MapUrlBuilder;
pub use weather::{mock_weather, synthetic_weather, OpenWeatherClient, WeatherService};

use std::time::Duration;

use reqwest::{Client, Url};

const USER_AGENT: &str = "hungers-harmony/0.1";
const CONNECT_TIMEOUT_SECS: u64 = 10;

pub(crate) fn build_http_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?)
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ProviderError> {
    Url::parse(raw).map_err(|e| ProviderError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}
