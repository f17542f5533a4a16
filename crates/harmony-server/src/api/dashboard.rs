use axum::{extract::State, Extension, Json};
use harmony_core::Role;
use harmony_db::{AdminStats, SuperadminStats};

use crate::middleware::{RequestId, Session};

use super::{map_db_error, ApiError, ApiResponse, AppState};

/// GET /api/v1/dashboard/admin — counts for the caller's own shops.
pub(in crate::api) async fn admin_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
) -> Result<Json<ApiResponse<AdminStats>>, ApiError> {
    session.require(&req_id.0, &[Role::Admin, Role::Superadmin])?;
    let stats = harmony_db::admin_stats(&state.pool, session.user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, stats))
}

/// GET /api/v1/dashboard/superadmin
pub(in crate::api) async fn superadmin_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    session: Session,
) -> Result<Json<ApiResponse<SuperadminStats>>, ApiError> {
    session.require(&req_id.0, &[Role::Superadmin])?;
    let stats = harmony_db::superadmin_stats(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, stats))
}
