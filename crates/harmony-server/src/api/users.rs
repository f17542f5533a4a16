//! Superadmin account management.

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use harmony_core::{normalize_email, Role, User};
use harmony_db::{NewUser, UserUpdate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::hash_password;
use crate::middleware::{RequestId, Session};

use super::auth::PASSWORD_MIN_LEN;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{blocking, map_db_error, validation_error, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ListUsersQuery {
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub(in crate::api) struct CreateUserRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email is not valid"))]
    pub email: String,
    #[validate(length(
        min = PASSWORD_MIN_LEN,
        message = "password must be at least 6 characters"
    ))]
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub(in crate::api) struct UpdateUserRequest {
    #[validate(length(min = 1, message = "name cannot be blank"))]
    pub name: Option<String>,
    #[validate(email(message = "email is not valid"))]
    pub email: Option<String>,
    #[validate(length(
        min = PASSWORD_MIN_LEN,
        message = "password must be at least 6 characters"
    ))]
    pub password: Option<String>,
    pub role: Option<Role>,
}

// Account management answers with bare bodies, like the auth endpoints.

#[derive(Debug, Serialize)]
pub(in crate::api) struct UserList {
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct UserBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct DeletedUser {
    pub message: &'static str,
    pub id: Uuid,
}

fn superadmin_only(session: &Session, rid: &str) -> Result<(), ApiError> {
    session.require(rid, &[Role::Superadmin])
}

/// GET /api/v1/users?role=
pub(in crate::api) async fn list_users(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiQuery(params): ApiQuery<ListUsersQuery>,
) -> Result<Json<UserList>, ApiError> {
    superadmin_only(&session, &req_id.0)?;
    let users = harmony_db::list_users(&state.pool, params.role)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(UserList { users }))
}

/// GET /api/v1/users/{id}
pub(in crate::api) async fn get_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserBody>, ApiError> {
    let rid = &req_id.0;
    superadmin_only(&session, rid)?;
    let user = harmony_db::get_user(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("user {id} not found")))?;
    Ok(Json(UserBody {
        message: None,
        user,
    }))
}

/// POST /api/v1/users — create an account with any role (default `user`).
pub(in crate::api) async fn create_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiJson(mut body): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserBody>), ApiError> {
    let rid = &req_id.0;
    superadmin_only(&session, rid)?;

    body.name = body.name.trim().to_owned();
    body.email = normalize_email(&body.email);
    body.validate().map_err(|e| validation_error(rid, &e))?;

    let password = body.password.clone();
    let cost = state.bcrypt_cost;
    let password_hash = blocking(rid, move || hash_password(&password, cost)).await?;

    let user = harmony_db::create_user(
        &state.pool,
        &NewUser {
            name: &body.name,
            email: &body.email,
            password_hash: &password_hash,
            role: body.role.unwrap_or(Role::User),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(user_id = %user.id, role = %user.role, created_by = %session.user.id, "account created");
    Ok((
        StatusCode::CREATED,
        Json(UserBody {
            message: Some("User created successfully"),
            user,
        }),
    ))
}

/// PUT /api/v1/users/{id} — sparse update; at least one field is required.
pub(in crate::api) async fn update_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut body): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserBody>, ApiError> {
    let rid = &req_id.0;
    superadmin_only(&session, rid)?;

    body.name = body.name.map(|n| n.trim().to_owned());
    body.email = body.email.as_deref().map(normalize_email);
    body.validate().map_err(|e| validation_error(rid, &e))?;

    let password_hash = match body.password {
        Some(password) => {
            let cost = state.bcrypt_cost;
            Some(blocking(rid, move || hash_password(&password, cost)).await?)
        }
        None => None,
    };

    let update = UserUpdate {
        name: body.name,
        email: body.email,
        password_hash,
        role: body.role,
    };
    if update.is_empty() {
        return Err(ApiError::new(rid, "bad_request", "no fields to update"));
    }

    let user = harmony_db::update_user(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    Ok(Json(UserBody {
        message: Some("User updated successfully"),
        user,
    }))
}

/// DELETE /api/v1/users/{id}
pub(in crate::api) async fn delete_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeletedUser>, ApiError> {
    let rid = &req_id.0;
    superadmin_only(&session, rid)?;
    if id == session.user.id {
        return Err(ApiError::new(
            rid,
            "bad_request",
            "you cannot delete your own account",
        ));
    }

    let deleted = harmony_db::delete_user(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(rid, "not_found", format!("user {id} not found")));
    }

    tracing::info!(user_id = %id, deleted_by = %session.user.id, "account deleted");
    Ok(Json(DeletedUser {
        message: "User deleted successfully",
        id,
    }))
}
