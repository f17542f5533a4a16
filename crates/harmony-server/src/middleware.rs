use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, Extensions, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use harmony_core::{Role, User};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{map_db_error, ApiError, AppState};

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The authenticated account for this request, hydrated from the database
/// so the role is current even if the token is older than a promotion.
///
/// Handlers that require a login take `Session` as an argument; extraction
/// fails with 401 when no valid bearer token was presented.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
}

impl Session {
    /// Fails with 403 unless the session's role is in `allowed`.
    pub fn require(&self, request_id: &str, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.user.role) {
            Ok(())
        } else {
            Err(ApiError::new(
                request_id,
                "forbidden",
                "you do not have access to this resource",
            ))
        }
    }

    #[must_use]
    pub fn is_superadmin(&self) -> bool {
        self.user.role == Role::Superadmin
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }
        let message = if parts.extensions.get::<DeletedAccount>().is_some() {
            "account no longer exists"
        } else {
            "authentication required"
        };
        Err(ApiError::new(
            request_id_of(&parts.extensions),
            "unauthorized",
            message,
        ))
    }
}

/// Marker left by [`resolve_session`] when a valid token names an account
/// that has since been deleted.
#[derive(Debug, Clone, Copy)]
pub struct DeletedAccount {
    pub id: Uuid,
}

/// What the bearer token resolved to. For handlers that answer a deleted
/// account differently from a missing login; everything else takes
/// [`Session`].
#[derive(Debug, Clone)]
pub enum Account {
    Active(Session),
    Deleted(DeletedAccount),
    Anonymous,
}

impl<S: Send + Sync> FromRequestParts<S> for Account {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(Account::Active(session.clone()));
        }
        Ok(parts
            .extensions
            .get::<DeletedAccount>()
            .map_or(Account::Anonymous, |d| Account::Deleted(*d)))
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter shared by every API route.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

pub(crate) fn request_id_of(extensions: &Extensions) -> String {
    extensions
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware that turns a bearer JWT into a [`Session`] extension.
///
/// Requests without a bearer token pass through untouched; public routes
/// never look for a session. A token that fails verification is rejected
/// with 401 here. A valid token for a deleted account passes through with a
/// [`DeletedAccount`] marker instead of a session.
pub async fn resolve_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(token) = extract_bearer_token(req.headers().get(AUTHORIZATION)).map(str::to_owned)
    else {
        return next.run(req).await;
    };
    let rid = request_id_of(req.extensions());

    let claims = match state.tokens.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "bearer token rejected");
            return ApiError::new(rid, "unauthorized", "invalid or expired token").into_response();
        }
    };

    match harmony_db::get_user(&state.pool, claims.id).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(Session { user });
            next.run(req).await
        }
        Ok(None) => {
            tracing::info!(user_id = %claims.id, "token presented for deleted account");
            req.extensions_mut().insert(DeletedAccount { id: claims.id });
            next.run(req).await
        }
        Err(e) => map_db_error(rid, &e).into_response(),
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        drop(window);
        return ApiError::new(
            request_id_of(req.extensions()),
            "rate_limited",
            "rate limit exceeded",
        )
        .into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn session(role: Role) -> Session {
        Session {
            user: User {
                id: Uuid::new_v4(),
                name: "Tester".to_string(),
                email: "tester@example.com".to_string(),
                role,
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
        let blank = HeaderValue::from_static("Bearer   ");
        assert_eq!(extract_bearer_token(Some(&blank)), None);
    }

    fn parts_with(extensions: Extensions) -> Parts {
        let (mut parts, ()) = axum::http::Request::new(()).into_parts();
        parts.extensions = extensions;
        parts
    }

    #[tokio::test]
    async fn deleted_account_is_distinguished_from_anonymous() {
        let id = Uuid::new_v4();
        let mut extensions = Extensions::new();
        extensions.insert(DeletedAccount { id });

        let mut parts = parts_with(extensions);
        let account = Account::from_request_parts(&mut parts, &()).await;
        assert!(matches!(account, Ok(Account::Deleted(d)) if d.id == id));
        let err = Session::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.code, "unauthorized");
        assert_eq!(err.message, "account no longer exists");

        let mut anonymous = parts_with(Extensions::new());
        let account = Account::from_request_parts(&mut anonymous, &()).await;
        assert!(matches!(account, Ok(Account::Anonymous)));
    }

    #[test]
    fn role_guard_allows_listed_roles_only() {
        let admin = session(Role::Admin);
        assert!(admin.require("r", &[Role::Admin, Role::Superadmin]).is_ok());
        let err = admin.require("r", &[Role::Superadmin]).unwrap_err();
        assert_eq!(err.code, "forbidden");
        assert!(!admin.is_superadmin());
    }
}
