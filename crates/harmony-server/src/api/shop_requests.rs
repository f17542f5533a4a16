//! Shop request workflow: users apply, superadmins approve or reject.

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use harmony_core::{find_province, Role, ShopRequest, ShopRequestStatus};
use harmony_db::{ApprovalOutcome, NewShopRequest, ShopRequestListing};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::middleware::{RequestId, Session};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{map_db_error, validation_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub(in crate::api) struct CreateShopRequestBody {
    #[validate(length(min = 1, max = 200, message = "shop_name must be 1-200 characters"))]
    pub shop_name: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub province: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl CreateShopRequestBody {
    fn normalized(mut self) -> Self {
        self.shop_name = self.shop_name.trim().to_owned();
        self.address = self.address.trim().to_owned();
        let clean = |s: Option<String>| s.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        self.description = clean(self.description);
        self.phone = clean(self.phone);
        self.province = clean(self.province).map(|p| p.to_lowercase());
        self
    }

    fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        if let Some(province) = &self.province {
            if find_province(province).is_none() {
                errors.add(
                    "province",
                    ValidationError::new("unknown")
                        .with_message(format!("unknown province '{province}'").into()),
                );
            }
        }
        if self.latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
            errors.add(
                "latitude",
                ValidationError::new("range").with_message("latitude must be within ±90".into()),
            );
        }
        if self.longitude.is_some_and(|lon| !(-180.0..=180.0).contains(&lon)) {
            errors.add(
                "longitude",
                ValidationError::new("range")
                    .with_message("longitude must be within ±180".into()),
            );
        }
        if self.latitude.is_some() != self.longitude.is_some() {
            errors.add(
                "latitude",
                ValidationError::new("paired")
                    .with_message("latitude and longitude must be given together".into()),
            );
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn into_new(self) -> NewShopRequest {
        NewShopRequest {
            shop_name: self.shop_name,
            description: self.description,
            address: Some(self.address),
            phone: self.phone,
            province: self.province,
            coordinates: self.latitude.zip(self.longitude),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ListRequestsQuery {
    pub status: Option<ShopRequestStatus>,
}

/// POST /api/v1/shop-requests — a `user` applies to open a shop.
pub(in crate::api) async fn create_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiJson(body): ApiJson<CreateShopRequestBody>,
) -> Result<(StatusCode, Json<ApiResponse<ShopRequest>>), ApiError> {
    let rid = &req_id.0;
    session.require(rid, &[Role::User])?;

    let body = body.normalized();
    body.check().map_err(|e| validation_error(rid, &e))?;

    let request = harmony_db::create_shop_request(&state.pool, session.user.id, &body.into_new())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(shop_request_id = %request.id, user_id = %session.user.id, "shop request submitted");
    Ok((StatusCode::CREATED, ApiResponse::new(req_id.0, request)))
}

/// GET /api/v1/shop-requests/mine
pub(in crate::api) async fn my_requests(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<ShopRequest>>>, ApiError> {
    let requests = harmony_db::list_shop_requests_for_user(&state.pool, session.user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, requests))
}

/// GET /api/v1/shop-requests?status= — superadmin review queue, newest first.
pub(in crate::api) async fn list_requests(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiQuery(params): ApiQuery<ListRequestsQuery>,
) -> Result<Json<ApiResponse<Vec<ShopRequestListing>>>, ApiError> {
    session.require(&req_id.0, &[Role::Superadmin])?;
    let requests = harmony_db::list_shop_requests(&state.pool, params.status)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, requests))
}

/// POST /api/v1/shop-requests/{id}/approve — approve, promote the requester,
/// and open the shop in one transaction.
pub(in crate::api) async fn approve_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ApprovalOutcome>>, ApiError> {
    session.require(&req_id.0, &[Role::Superadmin])?;
    let outcome = harmony_db::approve_shop_request(&state.pool, id, session.user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, outcome))
}

/// POST /api/v1/shop-requests/{id}/reject
pub(in crate::api) async fn reject_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ShopRequest>>, ApiError> {
    session.require(&req_id.0, &[Role::Superadmin])?;
    let request = harmony_db::reject_shop_request(&state.pool, id, session.user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, request))
}
