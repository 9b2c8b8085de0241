use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, warn};
use uuid::Uuid;

use triage_db::models::TicketRow;
use triage_domain::lifecycle::{self, StatusChange};
use triage_domain::{Error, policy, validate};
use triage_types::api::{Claims, CreateTicketRequest, TicketResponse, UpdateStatusRequest};
use triage_types::events::GatewayEvent;
use triage_types::models::TicketStatus;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::actor;
use crate::{parse_db_time, parse_db_uuid};

pub(crate) fn ticket_response(row: TicketRow) -> TicketResponse {
    let status = row.status.parse::<TicketStatus>().unwrap_or_else(|e| {
        warn!("Corrupt status on ticket '{}': {}", row.id, e);
        TicketStatus::Open
    });

    TicketResponse {
        id: parse_db_uuid(&row.id, "ticket"),
        title: row.title,
        description: row.description,
        status,
        owner_id: parse_db_uuid(&row.owner_id, "ticket owner"),
        owner_name: row.owner_name,
        screenshot_id: row.screenshot_id.as_deref().map(|s| parse_db_uuid(s, "screenshot")),
        created_at: parse_db_time(&row.created_at, "ticket"),
        updated_at: parse_db_time(&row.updated_at, "ticket"),
    }
}

/// File a new ticket. Owner is the caller; status is forced to open
/// regardless of anything in the request.
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::ticket_title(&req.title)?;
    validate::ticket_description(&req.description)?;

    // A screenshot reference must resolve to a stored object; a dangling
    // id is bad input, not a storage failure.
    if let Some(screenshot_id) = req.screenshot_id {
        let db = state.clone();
        let fid = screenshot_id.to_string();
        let file = tokio::task::spawn_blocking(move || db.db.get_file(&fid))
            .await
            .map_err(|e| ApiError::internal("task join failed", e))?
            .map_err(|e| ApiError::internal("screenshot lookup failed", e))?;
        if file.is_none() {
            return Err(Error::Validation(
                "screenshot does not reference a stored file".to_string(),
            )
            .into());
        }
    }

    let ticket_id = Uuid::new_v4();

    let db = state.clone();
    let tid = ticket_id.to_string();
    let owner = claims.sub.to_string();
    let title = req.title.clone();
    let description = req.description.clone();
    let screenshot = req.screenshot_id.map(|id| id.to_string());
    let row = tokio::task::spawn_blocking(move || {
        db.db
            .insert_ticket(&tid, &title, &description, &owner, screenshot.as_deref())?;
        db.db
            .get_ticket(&tid)?
            .ok_or_else(|| anyhow::anyhow!("ticket vanished after insert"))
    })
    .await
    .map_err(|e| ApiError::internal("task join failed", e))?
    .map_err(|e| ApiError::internal("ticket creation failed", e))?;

    let response = ticket_response(row);

    state.dispatcher.broadcast(GatewayEvent::TicketCreate {
        ticket_id: response.id,
        owner_id: response.owner_id,
        title: response.title.clone(),
        status: response.status,
        created_at: response.created_at,
    });

    Ok((StatusCode::CREATED, Json(response)))
}

/// Admins see every ticket; everyone else only their own. The scope is
/// decided by domain policy and applied inside the SQL query.
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = policy::list_scope(&actor(&claims)).map(|id| id.to_string());

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_tickets(scope.as_deref()))
        .await
        .map_err(|e| ApiError::internal("task join failed", e))?
        .map_err(|e| ApiError::internal("ticket listing failed", e))?;

    let tickets: Vec<TicketResponse> = rows.into_iter().map(ticket_response).collect();
    Ok(Json(tickets))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let tid = ticket_id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_ticket(&tid))
        .await
        .map_err(|e| ApiError::internal("task join failed", e))?
        .map_err(|e| ApiError::internal("ticket lookup failed", e))?
        .ok_or(Error::NotFound("ticket"))?;

    policy::ensure_participant(&actor(&claims), parse_db_uuid(&row.owner_id, "ticket owner"))?;

    Ok(Json(ticket_response(row)))
}

/// Admin-only status transition. Any direction is allowed; re-applying
/// the current status succeeds as a no-op.
pub async fn update_status(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    policy::ensure_admin(&actor(&claims))?;

    let db = state.clone();
    let tid = ticket_id.to_string();
    let current = tokio::task::spawn_blocking(move || db.db.get_ticket(&tid))
        .await
        .map_err(|e| ApiError::internal("task join failed", e))?
        .map_err(|e| ApiError::internal("ticket lookup failed", e))?
        .ok_or(Error::NotFound("ticket"))?;

    let current_status = current.status.parse::<TicketStatus>().unwrap_or_else(|e| {
        warn!("Corrupt status on ticket '{}': {}", current.id, e);
        TicketStatus::Open
    });

    match lifecycle::transition(current_status, req.status) {
        StatusChange::Unchanged(status) => {
            debug!("Ticket {} already {}, touching updated_at only", ticket_id, status);
        }
        StatusChange::Moved { from, to } => {
            debug!("Ticket {} moving {} -> {}", ticket_id, from, to);
        }
    }

    let db = state.clone();
    let tid = ticket_id.to_string();
    let status = req.status;
    let row = tokio::task::spawn_blocking(move || {
        let updated = db.db.update_ticket_status(&tid, status.as_str())?;
        anyhow::ensure!(updated, "ticket vanished during update");
        db.db
            .get_ticket(&tid)?
            .ok_or_else(|| anyhow::anyhow!("ticket vanished during update"))
    })
    .await
    .map_err(|e| ApiError::internal("task join failed", e))?
    .map_err(|e| ApiError::internal("status update failed", e))?;

    let response = ticket_response(row);

    state.dispatcher.broadcast(GatewayEvent::TicketStatusUpdate {
        ticket_id: response.id,
        owner_id: response.owner_id,
        status: response.status,
        updated_at: response.updated_at,
    });

    Ok(Json(response))
}
