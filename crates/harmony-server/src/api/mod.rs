mod auth;
mod catalog;
mod dashboard;
mod extract;
mod recommendations;
mod shop_requests;
mod shops;
mod users;
mod weather;

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use harmony_core::{local_time_of_day, TimeOfDay};
use harmony_db::DbError;
use harmony_providers::{ChatClient, MapUrlBuilder, ProviderError, WeatherService};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::auth::{AuthError, TokenKeys};
use crate::middleware::{
    enforce_rate_limit, request_id, resolve_session, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tokens: TokenKeys,
    pub bcrypt_cost: u32,
    pub weather: WeatherService,
    pub maps: MapUrlBuilder,
    pub ai: Option<ChatClient>,
    pub shop_utc_offset_minutes: i32,
}

impl AppState {
    /// Current wall-clock time at the shops' offset, for open/closed checks.
    pub(super) fn shop_time_now(&self) -> TimeOfDay {
        local_time_of_day(Utc::now(), self.shop_utc_offset_minutes)
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Error body: `{ "error": "<message>", "code": "...", "details"?, "meta" }`.
/// The human-readable message sits under `error` so clients that only read
/// that key still get it.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(rename = "error")]
    pub message: String,
    pub code: String,
    /// Field name to messages, for `validation_error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Vec<String>>>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

#[derive(Debug, Serialize)]
struct Banner {
    message: &'static str,
    status: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" | "email_taken" => StatusCode::BAD_REQUEST,
            "conflict" | "invalid_transition" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

pub(crate) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::new(request_id, "not_found", "resource not found"),
        DbError::EmailTaken => {
            ApiError::new(request_id, "email_taken", "email is already registered")
        }
        DbError::PendingRequestExists { .. } => ApiError::new(
            request_id,
            "conflict",
            "you already have a pending shop request",
        ),
        DbError::InvalidShopRequestTransition { current, .. } => ApiError::new(
            request_id,
            "invalid_transition",
            format!("shop request is already {current}"),
        ),
        DbError::Core(_) | DbError::Sqlx(_) | DbError::Migration(_) => {
            tracing::error!(error = %error, "database operation failed");
            ApiError::new(request_id, "internal_error", "internal server error")
        }
    }
}

pub(super) fn map_provider_error(request_id: String, error: &ProviderError) -> ApiError {
    match error {
        ProviderError::UnknownProvince(id) => {
            ApiError::new(request_id, "not_found", format!("unknown province '{id}'"))
        }
        _ => {
            tracing::error!(error = %error, "upstream provider failed");
            ApiError::new(request_id, "upstream_error", "upstream service unavailable")
        }
    }
}

pub(super) fn map_auth_error(request_id: String, error: &AuthError) -> ApiError {
    tracing::error!(error = %error, "auth operation failed");
    ApiError::new(request_id, "internal_error", "internal server error")
}

/// Builds a 400 `validation_error` listing every failing field. Nested
/// struct fields are keyed as `parent.child`.
pub(super) fn validation_error(request_id: impl Into<String>, errors: &ValidationErrors) -> ApiError {
    let mut details = BTreeMap::new();
    collect_field_errors("", errors, &mut details);

    let mut api_error = ApiError::new(request_id, "validation_error", "validation failed");
    api_error.details = Some(details);
    api_error
}

fn collect_field_errors(
    prefix: &str,
    errors: &ValidationErrors,
    out: &mut BTreeMap<String, Vec<String>>,
) {
    for (field, kind) in errors.errors() {
        let key = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.entry(key).or_default().extend(errs.iter().map(|e| {
                    e.message
                        .as_ref()
                        .map_or_else(|| e.code.to_string(), ToString::to_string)
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(&key, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(&format!("{key}[{index}]"), inner, out);
                }
            }
        }
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

/// Runs bcrypt off the async workers.
pub(super) async fn blocking<T, F>(request_id: &str, f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(map_auth_error(request_id.to_owned(), &e)),
        Err(e) => {
            tracing::error!(error = %e, "blocking task failed");
            Err(ApiError::new(
                request_id,
                "internal_error",
                "internal server error",
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/me", get(auth::me))
        .route(
            "/api/v1/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/v1/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/v1/provinces", get(weather::list_provinces))
        .route("/api/v1/weather", get(weather::current_weather))
        .route("/api/v1/products", get(catalog::list_products))
        .route(
            "/api/v1/products/{id}",
            get(catalog::get_product)
                .patch(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/api/v1/shops/mine", get(shops::my_shops))
        .route(
            "/api/v1/shops/{id}",
            get(shops::get_shop).patch(shops::update_shop),
        )
        .route(
            "/api/v1/shops/{id}/products",
            post(catalog::create_product),
        )
        .route(
            "/api/v1/shop-requests",
            get(shop_requests::list_requests).post(shop_requests::create_request),
        )
        .route("/api/v1/shop-requests/mine", get(shop_requests::my_requests))
        .route(
            "/api/v1/shop-requests/{id}/approve",
            post(shop_requests::approve_request),
        )
        .route(
            "/api/v1/shop-requests/{id}/reject",
            post(shop_requests::reject_request),
        )
        .route("/api/v1/dashboard/admin", get(dashboard::admin_dashboard))
        .route(
            "/api/v1/dashboard/superadmin",
            get(dashboard::superadmin_dashboard),
        )
        .route(
            "/api/v1/recommendations",
            post(recommendations::recommend),
        )
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let api = api_router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                rate_limit,
                enforce_rate_limit,
            ))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                resolve_session,
            )),
    );

    Router::new()
        .route("/", get(banner))
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn banner() -> Json<Banner> {
    Json(Banner {
        message: "API Backend Running",
        status: "success",
    })
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match harmony_db::ping(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
