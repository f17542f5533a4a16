//! Provinces, current weather, and the weather band used to filter menus.

use axum::{
    extract::State,
    Extension, Json,
};
use harmony_core::{
    band_for_temperature, find_province, Province, Suitability, WeatherReading, PROVINCES,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::extract::ApiQuery;
use super::{map_provider_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct WeatherQuery {
    pub province: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct WeatherPayload {
    #[serde(flatten)]
    pub reading: WeatherReading,
    pub band: Suitability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<&'static Province>,
    /// `live` when read from the weather provider, `fallback` otherwise.
    pub source: &'static str,
}

/// Weather band selection for a catalog view. An explicit band wins, then a
/// given temperature, then the province's current weather.
#[derive(Debug, Default)]
pub(in crate::api) struct BandInputs<'a> {
    pub band: Option<&'a str>,
    pub temperature: Option<f64>,
    pub province: Option<&'a str>,
}

#[derive(Debug, Default)]
pub(in crate::api) struct ResolvedBand {
    pub band: Option<Suitability>,
    pub weather: Option<WeatherReading>,
}

pub(super) async fn resolve_band(
    state: &AppState,
    rid: &str,
    inputs: &BandInputs<'_>,
) -> Result<ResolvedBand, ApiError> {
    if let Some(raw) = inputs.band {
        let band = raw.parse::<Suitability>().map_err(|e| {
            ApiError::new(rid, "validation_error", e.to_string())
        })?;
        return Ok(ResolvedBand {
            band: Some(band),
            weather: None,
        });
    }
    if let Some(t) = inputs.temperature {
        if !t.is_finite() {
            return Err(ApiError::new(
                rid,
                "validation_error",
                "temperature must be a finite number",
            ));
        }
        return Ok(ResolvedBand {
            band: Some(band_for_temperature(t)),
            weather: None,
        });
    }
    if let Some(province) = inputs.province {
        let reading = state
            .weather
            .for_province(province)
            .await
            .map_err(|e| map_provider_error(rid.to_owned(), &e))?;
        return Ok(ResolvedBand {
            band: Some(reading.band()),
            weather: Some(reading),
        });
    }
    Ok(ResolvedBand::default())
}

/// GET /api/v1/provinces
pub(in crate::api) async fn list_provinces(
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<&'static [Province]>> {
    ApiResponse::new(req_id.0, PROVINCES)
}

/// GET /api/v1/weather?province= or ?lat=&lon=
pub(in crate::api) async fn current_weather(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<WeatherQuery>,
) -> Result<Json<ApiResponse<WeatherPayload>>, ApiError> {
    let rid = &req_id.0;
    let source = if state.weather.is_live() {
        "live"
    } else {
        "fallback"
    };

    let (reading, province) = match (params.province.as_deref(), params.lat, params.lon) {
        (Some(id), _, _) => {
            let province = find_province(id)
                .ok_or_else(|| ApiError::new(rid, "not_found", format!("unknown province '{id}'")))?;
            let reading = state
                .weather
                .for_province(id)
                .await
                .map_err(|e| map_provider_error(rid.clone(), &e))?;
            (reading, Some(province))
        }
        (None, Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(ApiError::new(
                    rid,
                    "validation_error",
                    "lat must be within ±90 and lon within ±180",
                ));
            }
            let reading = state
                .weather
                .for_coordinates(lat, lon)
                .await
                .map_err(|e| map_provider_error(rid.clone(), &e))?;
            (reading, None)
        }
        _ => {
            return Err(ApiError::new(
                rid,
                "bad_request",
                "provide either province or both lat and lon",
            ))
        }
    };

    Ok(ApiResponse::new(
        req_id.0,
        WeatherPayload {
            band: reading.band(),
            reading,
            province,
            source,
        },
    ))
}
