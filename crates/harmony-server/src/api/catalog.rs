//! Product catalog: public listing plus owner writes.

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use harmony_core::{CatalogEntry, ProductType, Suitability};
use harmony_db::{CatalogQuery, DeliveryUrls, NewProduct, ProductUpdate};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidateUrl, ValidationError, ValidationErrors};

use crate::middleware::{RequestId, Session};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::weather::{resolve_band, BandInputs};
use super::{map_db_error, normalize_limit, validation_error, ApiError, ApiResponse, AppState};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ListProductsQuery {
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub shop_id: Option<Uuid>,
    pub band: Option<String>,
    pub temperature: Option<f64>,
    pub province: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub(in crate::api) struct DeliveryRequest {
    #[validate(url(message = "gofood_url must be a valid URL"))]
    pub gofood_url: Option<String>,
    #[validate(url(message = "grabfood_url must be a valid URL"))]
    pub grabfood_url: Option<String>,
    #[validate(url(message = "shopeefood_url must be a valid URL"))]
    pub shopeefood_url: Option<String>,
}

impl DeliveryRequest {
    /// Forms submit empty strings for platforms without a link.
    fn normalized(self) -> Self {
        Self {
            gofood_url: trimmed(self.gofood_url),
            grabfood_url: trimmed(self.grabfood_url),
            shopeefood_url: trimmed(self.shopeefood_url),
        }
    }
}

impl From<DeliveryRequest> for DeliveryUrls {
    fn from(d: DeliveryRequest) -> Self {
        let d = d.normalized();
        Self {
            gofood_url: d.gofood_url,
            grabfood_url: d.grabfood_url,
            shopeefood_url: d.shopeefood_url,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub(in crate::api) struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub weather_suitability: Option<Suitability>,
    pub images: Vec<String>,
    #[validate(nested)]
    pub delivery: DeliveryRequest,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub(in crate::api) struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub weather_suitability: Option<Suitability>,
    pub images: Option<Vec<String>>,
    #[validate(nested)]
    pub delivery: Option<DeliveryRequest>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn check_price(errors: &mut ValidationErrors, price: Option<Decimal>) {
    if price.is_some_and(|p| p.is_sign_negative()) {
        errors.add(
            "price",
            ValidationError::new("range").with_message("price cannot be negative".into()),
        );
    }
}

fn check_images(errors: &mut ValidationErrors, images: &[String]) {
    if images.iter().any(|url| !url.validate_url()) {
        errors.add(
            "images",
            ValidationError::new("url").with_message("every image must be a valid URL".into()),
        );
    }
}

fn finish(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

impl CreateProductRequest {
    fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        if self.product_type.is_none() {
            errors.add(
                "type",
                ValidationError::new("required").with_message("type is required".into()),
            );
        }
        if self.price.is_none() {
            errors.add(
                "price",
                ValidationError::new("required").with_message("price is required".into()),
            );
        }
        check_price(&mut errors, self.price);
        check_images(&mut errors, &self.images);
        finish(errors)
    }
}

impl UpdateProductRequest {
    fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        check_price(&mut errors, self.price);
        if let Some(images) = &self.images {
            check_images(&mut errors, images);
        }
        finish(errors)
    }
}

fn parse_product_type(rid: &str, raw: Option<&str>) -> Result<Option<ProductType>, ApiError> {
    raw.map(str::parse::<ProductType>)
        .transpose()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// Admins may write products only in their own shops; superadmins anywhere.
fn authorize_owner(session: &Session, rid: &str, owner_id: Uuid) -> Result<(), ApiError> {
    if !session.user.role.can_manage_products() {
        return Err(ApiError::new(
            rid,
            "forbidden",
            "only shop admins can manage products",
        ));
    }
    if session.is_superadmin() || session.user.id == owner_id {
        Ok(())
    } else {
        Err(ApiError::new(
            rid,
            "forbidden",
            "you can only manage products of your own shop",
        ))
    }
}

async fn load_entry(state: &AppState, rid: &str, id: Uuid) -> Result<CatalogEntry, ApiError> {
    let mut entry = harmony_db::fetch_catalog_entry(&state.pool, id, state.shop_time_now())
        .await
        .map_err(|e| map_db_error(rid.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("product {id} not found")))?;
    entry.maps = state.maps.for_shop(&entry.shop);
    Ok(entry)
}

async fn owner_of_product(state: &AppState, rid: &str, id: Uuid) -> Result<Uuid, ApiError> {
    harmony_db::product_owner(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("product {id} not found")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/products — denormalized catalog, optionally weather-filtered.
pub(in crate::api) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<ListProductsQuery>,
) -> Result<Json<ApiResponse<Vec<CatalogEntry>>>, ApiError> {
    let rid = &req_id.0;
    let product_type = parse_product_type(rid, params.product_type.as_deref())?;
    let resolved = resolve_band(
        &state,
        rid,
        &BandInputs {
            band: params.band.as_deref(),
            temperature: params.temperature,
            province: params.province.as_deref(),
        },
    )
    .await?;

    let query = CatalogQuery {
        product_type,
        shop_id: params.shop_id,
        band: resolved.band,
        limit: Some(normalize_limit(params.limit)),
    };
    let mut entries = harmony_db::fetch_catalog(&state.pool, &query, state.shop_time_now())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    state.maps.attach(&mut entries);

    Ok(ApiResponse::new(req_id.0, entries))
}

/// GET /api/v1/products/{id}
pub(in crate::api) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<CatalogEntry>>, ApiError> {
    let entry = load_entry(&state, &req_id.0, id).await?;
    Ok(ApiResponse::new(req_id.0, entry))
}

/// POST /api/v1/shops/{id}/products
pub(in crate::api) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiPath(shop_id): ApiPath<Uuid>,
    ApiJson(mut body): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CatalogEntry>>), ApiError> {
    let rid = &req_id.0;
    let shop = harmony_db::get_shop(&state.pool, shop_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("shop {shop_id} not found")))?;
    authorize_owner(&session, rid, shop.owner_id)?;

    body.name = body.name.trim().to_owned();
    body.delivery = body.delivery.normalized();
    body.check().map_err(|e| validation_error(rid, &e))?;
    let (Some(product_type), Some(price)) = (body.product_type, body.price) else {
        return Err(ApiError::new(rid, "validation_error", "type and price are required"));
    };

    let product = harmony_db::create_product(
        &state.pool,
        shop.id,
        &NewProduct {
            name: body.name,
            product_type,
            price,
            description: trimmed(body.description),
            weather_suitability: body.weather_suitability.unwrap_or(Suitability::All),
            images: body.images,
            delivery: body.delivery.into(),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(product_id = %product.id, shop_id = %shop.id, "product created");
    let entry = load_entry(&state, rid, product.id).await?;
    Ok((StatusCode::CREATED, ApiResponse::new(req_id.0, entry)))
}

/// PATCH /api/v1/products/{id} — sparse; `images` and `delivery` replace
/// the stored set when present.
pub(in crate::api) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut body): ApiJson<UpdateProductRequest>,
) -> Result<Json<ApiResponse<CatalogEntry>>, ApiError> {
    let rid = &req_id.0;
    let owner_id = owner_of_product(&state, rid, id).await?;
    authorize_owner(&session, rid, owner_id)?;

    body.name = body.name.map(|n| n.trim().to_owned());
    body.delivery = body.delivery.map(DeliveryRequest::normalized);
    body.check().map_err(|e| validation_error(rid, &e))?;

    let update = ProductUpdate {
        name: body.name,
        product_type: body.product_type,
        price: body.price,
        // A blank description is passed through so the store clears it.
        description: body.description.map(|d| d.trim().to_owned()),
        weather_suitability: body.weather_suitability,
        images: body.images,
        delivery: body.delivery.map(DeliveryUrls::from),
    };
    harmony_db::update_product(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let entry = load_entry(&state, rid, id).await?;
    Ok(ApiResponse::new(req_id.0, entry))
}

/// DELETE /api/v1/products/{id}
pub(in crate::api) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let owner_id = owner_of_product(&state, rid, id).await?;
    authorize_owner(&session, rid, owner_id)?;

    let deleted = harmony_db::delete_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(rid, "not_found", format!("product {id} not found")));
    }

    tracing::info!(product_id = %id, deleted_by = %session.user.id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
