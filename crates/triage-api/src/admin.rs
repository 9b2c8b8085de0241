use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use triage_domain::{Error, policy};
use triage_types::api::{Claims, SetRoleRequest, SetRoleResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::actor;

/// POST /admin/users/{user_id}/role — admin-only role grant/revoke.
/// The target's active tokens keep their old role claim; the change
/// takes effect the next time they log in.
pub async fn set_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    policy::ensure_admin(&actor(&claims))?;

    let updated = state
        .db
        .set_user_role(&user_id.to_string(), req.role.as_str())
        .map_err(|e| ApiError::internal("role update failed", e))?;

    if !updated {
        return Err(Error::NotFound("account").into());
    }

    info!("{} set role of {} to {}", claims.sub, user_id, req.role.as_str());

    Ok(Json(SetRoleResponse {
        user_id,
        role: req.role,
    }))
}
