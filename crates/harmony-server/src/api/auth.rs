//! Registration, login, and the current-session lookup.

use axum::{extract::State, http::StatusCode, Extension, Json};
use harmony_core::{normalize_email, Role, User};
use harmony_db::NewUser;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::auth::{hash_password, verify_password};
use crate::middleware::{Account, RequestId};

use super::extract::ApiJson;
use super::{blocking, map_db_error, validation_error, ApiError, AppState};

pub(super) const PASSWORD_MIN_LEN: u64 = 6;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub(in crate::api) struct RegisterRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email is not valid"))]
    pub email: String,
    #[validate(length(
        min = PASSWORD_MIN_LEN,
        message = "password must be at least 6 characters"
    ))]
    pub password: String,
    pub password_confirmation: Option<String>,
}

impl RegisterRequest {
    fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_owned();
        self.email = normalize_email(&self.email);
        self
    }

    /// Field rules plus the cross-field confirmation check.
    fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        if let Some(confirmation) = &self.password_confirmation {
            if confirmation != &self.password {
                errors.add(
                    "password_confirmation",
                    ValidationError::new("must_match")
                        .with_message("password confirmation does not match".into()),
                );
            }
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(in crate::api) struct LoginRequest {
    pub email: String,
    pub password: String,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------
//
// The auth endpoints answer with bare bodies rather than the `{data, meta}`
// envelope: `{message, token, user}` and `{user}`.

#[derive(Debug, Serialize)]
pub(in crate::api) struct AuthPayload {
    pub message: &'static str,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct MePayload {
    pub user: User,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register — create a `user` account and sign it in.
pub(in crate::api) async fn register(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthPayload>), ApiError> {
    let rid = &req_id.0;
    let body = body.normalized();
    body.check().map_err(|e| validation_error(rid, &e))?;

    let password = body.password.clone();
    let cost = state.bcrypt_cost;
    let password_hash = blocking(rid, move || hash_password(&password, cost)).await?;

    let user = harmony_db::create_user(
        &state.pool,
        &NewUser {
            name: &body.name,
            email: &body.email,
            password_hash: &password_hash,
            role: Role::User,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    let token = state
        .tokens
        .issue(&user)
        .map_err(|e| super::map_auth_error(rid.clone(), &e))?;

    tracing::info!(user_id = %user.id, "account registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthPayload {
            message: "User registered successfully",
            token,
            user,
        }),
    ))
}

/// POST /api/v1/auth/login
pub(in crate::api) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AuthPayload>, ApiError> {
    let rid = &req_id.0;
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::new(
            rid,
            "bad_request",
            "email and password are required",
        ));
    }

    let invalid = || ApiError::new(rid, "unauthorized", "invalid email or password");

    let row = harmony_db::find_user_by_email(&state.pool, &body.email)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(invalid)?;

    let password = body.password;
    let hash = row.password_hash.clone();
    let matches = blocking(rid, move || verify_password(&password, &hash)).await?;
    if !matches {
        return Err(invalid());
    }

    let user = row
        .into_user()
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let token = state
        .tokens
        .issue(&user)
        .map_err(|e| super::map_auth_error(rid.clone(), &e))?;

    Ok(Json(AuthPayload {
        message: "Login successful",
        token,
        user,
    }))
}

/// GET /api/v1/auth/me — 404 when the token's account has been deleted.
pub(in crate::api) async fn me(
    account: Account,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<MePayload>, ApiError> {
    match account {
        Account::Active(session) => Ok(Json(MePayload { user: session.user })),
        Account::Deleted(deleted) => {
            tracing::debug!(user_id = %deleted.id, "session lookup for deleted account");
            Err(ApiError::new(req_id.0, "not_found", "user not found"))
        }
        Account::Anonymous => Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "authentication required",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(password: &str, confirmation: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            name: "  Budi  ".to_string(),
            email: " Budi@Example.COM ".to_string(),
            password: password.to_string(),
            password_confirmation: confirmation.map(str::to_string),
        }
        .normalized()
    }

    #[test]
    fn normalized_trims_and_lowercases() {
        let req = request("rahasia", None);
        assert_eq!(req.name, "Budi");
        assert_eq!(req.email, "budi@example.com");
        assert!(req.check().is_ok());
    }

    #[test]
    fn short_password_and_mismatch_are_both_reported() {
        let errors = request("abc", Some("abcd")).check().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("password_confirmation"));
    }

    #[test]
    fn matching_confirmation_passes() {
        assert!(request("rahasia", Some("rahasia")).check().is_ok());
    }

    #[test]
    fn empty_body_fails_every_required_field() {
        let errors = RegisterRequest::default().normalized().check().unwrap_err();
        let fields = errors.field_errors();
        for field in ["name", "email", "password"] {
            assert!(fields.contains_key(field), "missing {field}");
        }
    }
}
