//! Weather-aware menu recommendations with an optional chat suggestion.

use axum::{extract::State, Extension, Json};
use harmony_core::{CatalogEntry, ProductType, Suitability, WeatherReading};
use harmony_db::CatalogQuery;
use harmony_providers::SuggestionRequest;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::extract::ApiJson;
use super::weather::{resolve_band, BandInputs};
use super::{map_db_error, ApiError, ApiResponse, AppState};

/// Upper bound on products returned and offered to the model.
const MAX_RECOMMENDATIONS: i64 = 20;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(in crate::api) struct RecommendationRequest {
    pub province: Option<String>,
    pub temperature: Option<f64>,
    pub mood: Option<String>,
    pub prompt: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(in crate::api) enum AiStatus {
    Ok,
    Unconfigured,
    Unavailable,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct RecommendationPayload {
    pub weather: Option<WeatherReading>,
    pub band: Option<Suitability>,
    pub products: Vec<CatalogEntry>,
    pub suggestion: Option<String>,
    pub ai_status: AiStatus,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// POST /api/v1/recommendations
///
/// A chat failure does not fail the request; the catalog is still returned
/// with `ai_status = "unavailable"`.
pub(in crate::api) async fn recommend(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<RecommendationRequest>,
) -> Result<Json<ApiResponse<RecommendationPayload>>, ApiError> {
    let rid = &req_id.0;
    let resolved = resolve_band(
        &state,
        rid,
        &BandInputs {
            band: None,
            temperature: body.temperature,
            province: non_blank(body.province.as_deref()),
        },
    )
    .await?;

    let query = CatalogQuery {
        product_type: body.product_type,
        shop_id: None,
        band: resolved.band,
        limit: Some(MAX_RECOMMENDATIONS),
    };
    let mut products = harmony_db::fetch_catalog(&state.pool, &query, state.shop_time_now())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    state.maps.attach(&mut products);

    let (suggestion, ai_status) = match &state.ai {
        None => (None, AiStatus::Unconfigured),
        Some(client) => {
            let request = SuggestionRequest {
                mood: non_blank(body.mood.as_deref()),
                prompt: non_blank(body.prompt.as_deref()),
                weather: resolved.weather.as_ref(),
                candidates: products.iter().map(|e| e.product.name.as_str()).collect(),
            };
            match client.suggest(&request).await {
                Ok(text) => (Some(text), AiStatus::Ok),
                Err(e) => {
                    tracing::warn!(error = %e, "chat suggestion failed");
                    (None, AiStatus::Unavailable)
                }
            }
        }
    };

    Ok(ApiResponse::new(
        req_id.0,
        RecommendationPayload {
            weather: resolved.weather,
            band: resolved.band,
            products,
            suggestion,
            ai_status,
        },
    ))
}
