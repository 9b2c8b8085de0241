use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use triage_db::models::MessageRow;
use triage_domain::{Error, policy, validate};
use triage_types::api::{Claims, MessageResponse, SendMessageRequest};
use triage_types::events::GatewayEvent;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::actor;
use crate::{parse_db_time, parse_db_uuid};

fn message_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: parse_db_uuid(&row.id, "message"),
        ticket_id: parse_db_uuid(&row.ticket_id, "message ticket"),
        author_id: parse_db_uuid(&row.author_id, "message author"),
        author_name: row.author_name,
        body: row.body,
        is_internal: row.is_internal,
        created_at: parse_db_time(&row.created_at, "message"),
    }
}

/// Fetch the ticket's owner, or NotFound. Shared by append and list so
/// both paths apply the identical ownership rule.
async fn ticket_owner(state: &AppState, ticket_id: Uuid) -> Result<Uuid, ApiError> {
    let db = state.clone();
    let tid = ticket_id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_ticket(&tid))
        .await
        .map_err(|e| ApiError::internal("task join failed", e))?
        .map_err(|e| ApiError::internal("ticket lookup failed", e))?
        .ok_or(Error::NotFound("ticket"))?;

    Ok(parse_db_uuid(&row.owner_id, "ticket owner"))
}

/// Append a reply to a ticket's thread. Writable by the ticket's owner
/// and by admins; internal notes are an admin-only marker.
pub async fn send_message(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author = actor(&claims);

    validate::message_body(&req.body)?;
    if req.is_internal && !policy::can_use_internal_notes(&author) {
        return Err(Error::Authorization("internal notes are admin-only".to_string()).into());
    }

    let owner_id = ticket_owner(&state, ticket_id).await?;
    policy::ensure_participant(&author, owner_id)?;

    let message_id = Uuid::new_v4();

    let db = state.clone();
    let mid = message_id.to_string();
    let tid = ticket_id.to_string();
    let aid = claims.sub.to_string();
    let body = req.body.clone();
    let is_internal = req.is_internal;
    tokio::task::spawn_blocking(move || db.db.insert_message(&mid, &tid, &aid, &body, is_internal))
        .await
        .map_err(|e| ApiError::internal("task join failed", e))?
        .map_err(|e| ApiError::internal("message creation failed", e))?;

    let now = chrono::Utc::now();

    state.dispatcher.broadcast(GatewayEvent::MessageCreate {
        id: message_id,
        ticket_id,
        ticket_owner_id: owner_id,
        author_id: claims.sub,
        author_name: claims.name.clone(),
        body: req.body.clone(),
        is_internal: req.is_internal,
        created_at: now,
    });

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id: message_id,
            ticket_id,
            author_id: claims.sub,
            author_name: claims.name.clone(),
            body: req.body,
            is_internal: req.is_internal,
            created_at: now,
        }),
    ))
}

/// Thread listing, ascending by creation time. An empty thread is an
/// empty list, not an error.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let reader = actor(&claims);

    let owner_id = ticket_owner(&state, ticket_id).await?;
    policy::ensure_participant(&reader, owner_id)?;

    let include_internal = policy::can_use_internal_notes(&reader);

    let db = state.clone();
    let tid = ticket_id.to_string();
    let rows =
        tokio::task::spawn_blocking(move || db.db.list_messages(&tid, include_internal))
            .await
            .map_err(|e| ApiError::internal("task join failed", e))?
            .map_err(|e| ApiError::internal("message listing failed", e))?;

    let messages: Vec<MessageResponse> = rows.into_iter().map(message_response).collect();
    Ok(Json(messages))
}
