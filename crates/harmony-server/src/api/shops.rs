//! Shop detail and owner settings.

use axum::{
    extract::State,
    Extension, Json,
};
use harmony_core::{spans_midnight, MapLinks, Role, Shop, TimeOfDay};
use harmony_db::ShopSettings;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{RequestId, Session};

use super::extract::{ApiJson, ApiPath};
use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(in crate::api) struct ShopView {
    #[serde(flatten)]
    pub shop: Shop,
    pub is_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maps: Option<MapLinks>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(in crate::api) struct UpdateShopRequest {
    pub name: Option<String>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn view(state: &AppState, rid: &str, shop: Shop, now: TimeOfDay) -> Result<ShopView, ApiError> {
    let is_open = shop.is_open_at(now).map_err(|e| {
        tracing::error!(shop_id = %shop.id, error = %e, "stored shop hours are malformed");
        ApiError::new(rid, "internal_error", "internal server error")
    })?;
    Ok(ShopView {
        maps: state.maps.for_shop(&shop),
        is_open,
        shop,
    })
}

/// Validates a PATCH body against the current shop and turns it into
/// settings. Only given fields change.
fn settings_from_request(
    rid: &str,
    current: &Shop,
    body: UpdateShopRequest,
) -> Result<ShopSettings, ApiError> {
    let invalid = |msg: String| ApiError::new(rid, "validation_error", msg);

    let name = match body.name.map(|n| n.trim().to_owned()) {
        Some(n) if n.is_empty() => return Err(invalid("name cannot be blank".to_string())),
        other => other,
    };

    let normalize_time = |field: &str, raw: Option<String>| -> Result<Option<String>, ApiError> {
        raw.map(|r| {
            TimeOfDay::parse(&r)
                .map(|t| t.to_string())
                .map_err(|_| invalid(format!("{field} must be HH:MM, got '{r}'")))
        })
        .transpose()
    };
    let open_time = normalize_time("open_time", body.open_time)?;
    let close_time = normalize_time("close_time", body.close_time)?;

    let coordinates = match (body.latitude, body.longitude) {
        (None, None) => None,
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(invalid(
                    "latitude must be within ±90 and longitude within ±180".to_string(),
                ));
            }
            Some((lat, lon))
        }
        _ => {
            return Err(invalid(
                "latitude and longitude must be given together".to_string(),
            ))
        }
    };

    let effective_open = open_time.as_deref().unwrap_or(&current.open_time);
    let effective_close = close_time.as_deref().unwrap_or(&current.close_time);
    if spans_midnight(effective_open, effective_close).unwrap_or(false) {
        tracing::warn!(
            shop_id = %current.id,
            open_time = effective_open,
            close_time = effective_close,
            "close time is before open time; the shop will report closed all day"
        );
    }

    Ok(ShopSettings {
        name,
        open_time,
        close_time,
        coordinates,
    })
}

/// GET /api/v1/shops/{id}
pub(in crate::api) async fn get_shop(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ShopView>>, ApiError> {
    let rid = &req_id.0;
    let shop = harmony_db::get_shop(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("shop {id} not found")))?;
    let view = view(&state, rid, shop, state.shop_time_now())?;
    Ok(ApiResponse::new(req_id.0, view))
}

/// GET /api/v1/shops/mine — shops owned by the caller.
pub(in crate::api) async fn my_shops(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<ShopView>>>, ApiError> {
    let rid = &req_id.0;
    session.require(rid, &[Role::Admin, Role::Superadmin])?;

    let now = state.shop_time_now();
    let shops = harmony_db::list_shops_by_owner(&state.pool, session.user.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .into_iter()
        .map(|shop| view(&state, rid, shop, now))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ApiResponse::new(req_id.0, shops))
}

/// PATCH /api/v1/shops/{id} — name, hours, and location.
pub(in crate::api) async fn update_shop(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateShopRequest>,
) -> Result<Json<ApiResponse<ShopView>>, ApiError> {
    let rid = &req_id.0;
    session.require(rid, &[Role::Admin, Role::Superadmin])?;

    let current = harmony_db::get_shop(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("shop {id} not found")))?;
    if !session.is_superadmin() && current.owner_id != session.user.id {
        return Err(ApiError::new(
            rid,
            "forbidden",
            "you can only update your own shop",
        ));
    }

    let settings = settings_from_request(rid, &current, body)?;
    let shop = harmony_db::update_shop_settings(&state.pool, id, &settings)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(shop_id = %id, updated_by = %session.user.id, "shop settings updated");
    let view = view(&state, rid, shop, state.shop_time_now())?;
    Ok(ApiResponse::new(req_id.0, view))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn shop() -> Shop {
        Shop {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Warung Bu Siti".to_string(),
            description: None,
            address: None,
            phone: None,
            province: Some("jakarta".to_string()),
            open_time: "07:00".to_string(),
            close_time: "21:00".to_string(),
            latitude: None,
            longitude: None,
            is_approved: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn times_are_normalized_to_two_digit_hours() {
        let body = UpdateShopRequest {
            open_time: Some("8:30".to_string()),
            ..UpdateShopRequest::default()
        };
        let settings = settings_from_request("r", &shop(), body).expect("valid");
        assert_eq!(settings.open_time.as_deref(), Some("08:30"));
        assert_eq!(settings.close_time, None);
    }

    #[test]
    fn malformed_time_is_rejected() {
        let body = UpdateShopRequest {
            close_time: Some("24:00".to_string()),
            ..UpdateShopRequest::default()
        };
        let err = settings_from_request("r", &shop(), body).unwrap_err();
        assert_eq!(err.code, "validation_error");
        assert!(err.message.contains("close_time"));
    }

    #[test]
    fn lone_coordinate_is_rejected() {
        let body = UpdateShopRequest {
            latitude: Some(-6.2),
            ..UpdateShopRequest::default()
        };
        assert!(settings_from_request("r", &shop(), body).is_err());
    }

    #[test]
    fn overnight_hours_are_accepted() {
        let body = UpdateShopRequest {
            open_time: Some("22:00".to_string()),
            close_time: Some("02:00".to_string()),
            ..UpdateShopRequest::default()
        };
        let settings = settings_from_request("r", &shop(), body).expect("accepted");
        assert_eq!(settings.open_time.as_deref(), Some("22:00"));
    }

    #[test]
    fn blank_name_is_rejected() {
        let body = UpdateShopRequest {
            name: Some("   ".to_string()),
            ..UpdateShopRequest::default()
        };
        assert!(settings_from_request("r", &shop(), body).is_err());
    }
}
