//! Current weather: OpenWeatherMap when a key is configured, otherwise a
//! static per-province table with randomized synthetic fallback.

use harmony_core::{find_province, WeatherReading};
use rand::seq::IndexedRandom;
use rand::Rng;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{build_http_client, parse_base_url, ProviderError};

// ---------------------------------------------------------------------------
// OpenWeatherMap client
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    main: String,
    description: String,
}

/// Client for the OpenWeatherMap current-weather endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl OpenWeatherClient {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ProviderError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(api_key: &str, base_url: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            api_key: api_key.to_owned(),
            base_url: parse_base_url(base_url)?,
        })
    }

    fn build_url(&self, lat: f64, lon: f64) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("lat", &lat.to_string())
            .append_pair("lon", &lon.to_string())
            .append_pair("appid", &self.api_key)
            .append_pair("units", "metric")
            .append_pair("lang", "id");
        url
    }

    /// Fetches current conditions at a coordinate, in metric units.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::Http`] on network failure.
    /// - [`ProviderError::UnexpectedStatus`] on a non-2xx response.
    /// - [`ProviderError::Deserialize`] if the body does not match the expected shape.
    pub async fn current(&self, lat: f64, lon: f64) -> Result<WeatherReading, ProviderError> {
        let url = self.build_url(lat, lon);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus {
                context: "openweathermap".to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        let parsed: OwmResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
                context: format!("openweathermap(lat={lat}, lon={lon})"),
                source: e,
            })?;
        Ok(reading_from_owm(parsed))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn reading_from_owm(resp: OwmResponse) -> WeatherReading {
    let (condition, condition_id) = resp.weather.first().map_or_else(
        || ("Tidak diketahui".to_string(), "cool"),
        |c| (capitalize(&c.description), condition_id_for(&c.main)),
    );
    WeatherReading {
        temperature: resp.main.temp,
        humidity: resp.main.humidity.round().clamp(0.0, 100.0) as u8,
        condition,
        condition_id: condition_id.to_string(),
    }
}

/// Maps an OpenWeatherMap condition group to a stable identifier.
fn condition_id_for(group: &str) -> &'static str {
    match group {
        "Clear" => "sunny",
        "Clouds" => "cloudy",
        "Rain" | "Drizzle" | "Thunderstorm" => "rainy",
        _ => "cool",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Offline fallbacks
// ---------------------------------------------------------------------------

/// Fixed readings for the provinces the demo was built around.
#[must_use]
pub fn mock_weather(province_id: &str) -> Option<WeatherReading> {
    let (temperature, humidity, condition, condition_id) = match province_id {
        "jakarta" => (32.0, 75, "Cerah Berawan", "sunny"),
        "jabar" => (28.0, 80, "Berawan", "cloudy"),
        "jateng" => (26.0, 85, "Hujan Ringan", "rainy"),
        "yogya" => (25.0, 82, "Sejuk", "cool"),
        "jatim" => (30.0, 70, "Cerah", "sunny"),
        "bali" => (29.0, 78, "Cerah Berawan", "sunny"),
        _ => return None,
    };
    Some(WeatherReading {
        temperature,
        humidity,
        condition: condition.to_string(),
        condition_id: condition_id.to_string(),
    })
}

struct SyntheticCondition {
    condition: &'static str,
    condition_id: &'static str,
    /// Half-open whole-degree range.
    temp_range: (i32, i32),
}

const SYNTHETIC_CONDITIONS: &[SyntheticCondition] = &[
    SyntheticCondition {
        condition: "Cerah",
        condition_id: "sunny",
        temp_range: (30, 35),
    },
    SyntheticCondition {
        condition: "Berawan",
        condition_id: "cloudy",
        temp_range: (26, 30),
    },
    SyntheticCondition {
        condition: "Hujan Ringan",
        condition_id: "rainy",
        temp_range: (22, 26),
    },
    SyntheticCondition {
        condition: "Sejuk",
        condition_id: "cool",
        temp_range: (20, 25),
    },
];

/// A plausible random reading: one of four conditions with a whole-degree
/// temperature in that condition's range and humidity in `60..90`.
pub fn synthetic_weather<R: Rng + ?Sized>(rng: &mut R) -> WeatherReading {
    let pick = SYNTHETIC_CONDITIONS
        .choose(rng)
        .unwrap_or(&SYNTHETIC_CONDITIONS[0]);
    let (lo, hi) = pick.temp_range;
    WeatherReading {
        temperature: f64::from(rng.random_range(lo..hi)),
        humidity: rng.random_range(60..90),
        condition: pick.condition.to_string(),
        condition_id: pick.condition_id.to_string(),
    }
}

fn random_weather() -> WeatherReading {
    synthetic_weather(&mut rand::rng())
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Weather lookup used by the API. Live when a client is configured; no
/// fallback to mock data once live fetching fails.
#[derive(Debug, Clone, Default)]
pub struct WeatherService {
    live: Option<OpenWeatherClient>,
}

impl WeatherService {
    #[must_use]
    pub fn live(client: OpenWeatherClient) -> Self {
        Self { live: Some(client) }
    }

    #[must_use]
    pub fn offline() -> Self {
        Self { live: None }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Weather for a province, by its capital's coordinates when live.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownProvince`] for an unrecognised id, or
    /// any error from the live client.
    pub async fn for_province(&self, province_id: &str) -> Result<WeatherReading, ProviderError> {
        let province = find_province(province_id)
            .ok_or_else(|| ProviderError::UnknownProvince(province_id.to_string()))?;

        match &self.live {
            Some(client) => client.current(province.latitude, province.longitude).await,
            None => Ok(mock_weather(province.id).unwrap_or_else(random_weather)),
        }
    }

    /// Weather at an arbitrary coordinate. Offline this is always synthetic.
    ///
    /// # Errors
    ///
    /// Returns any error from the live client.
    pub async fn for_coordinates(&self, lat: f64, lon: f64) -> Result<WeatherReading, ProviderError> {
        match &self.live {
            Some(client) => client.current(lat, lon).await,
            None => Ok(random_weather()),
        }
    }
}
