use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use triage_domain::{Error, policy};
use triage_types::api::{Claims, UploadResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::actor;

/// 10 MB upload limit for screenshots
pub const MAX_SCREENSHOT_SIZE: usize = 10 * 1024 * 1024;

/// POST /files — accepts raw screenshot bytes (application/octet-stream),
/// saves to the upload dir, inserts a DB row, returns { file_id, size }.
/// Storage failures surface as 500s, distinct from the 400s for bad input.
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if bytes.is_empty() {
        return Err(Error::Validation("screenshot payload is empty".to_string()).into());
    }

    if bytes.len() > MAX_SCREENSHOT_SIZE {
        return Err(Error::Validation(format!(
            "screenshot exceeds {} bytes",
            MAX_SCREENSHOT_SIZE
        ))
        .into());
    }

    let file_id = Uuid::new_v4();
    let size = bytes.len() as i64;

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::internal("failed to create upload directory", e))?;

    let file_path = state.upload_dir.join(file_id.to_string());
    let mut file = tokio::fs::File::create(&file_path)
        .await
        .map_err(|e| ApiError::internal("failed to create screenshot file", e))?;
    file.write_all(&bytes)
        .await
        .map_err(|e| ApiError::internal("failed to write screenshot file", e))?;

    let db = state.clone();
    let fid = file_id.to_string();
    let uid = claims.sub.to_string();
    tokio::task::spawn_blocking(move || db.db.insert_file(&fid, &uid, "screenshot", size))
        .await
        .map_err(|e| ApiError::internal("task join failed", e))?
        .map_err(|e| ApiError::internal("file record insert failed", e))?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            file_id,
            size: size as u64,
        }),
    ))
}

/// GET /files/{file_id} — returns the stored bytes. Readable by the
/// uploader, admins, and the owner of a ticket the file is attached to.
/// The typed UUID path segment doubles as a path-traversal guard.
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = actor(&claims);

    let db = state.clone();
    let fid = file_id.to_string();
    let (file_row, ticket_owner) = tokio::task::spawn_blocking(move || {
        let file_row = db.db.get_file(&fid)?;
        let ticket_owner = db.db.ticket_owner_for_file(&fid)?;
        Ok::<_, anyhow::Error>((file_row, ticket_owner))
    })
    .await
    .map_err(|e| ApiError::internal("task join failed", e))?
    .map_err(|e| ApiError::internal("file lookup failed", e))?;

    let file_row = file_row.ok_or(Error::NotFound("file"))?;

    let uploader_ok = file_row.uploader_id == claims.sub.to_string();
    let participant_ok = ticket_owner
        .map(|owner| policy::ensure_participant(&viewer, crate::parse_db_uuid(&owner, "ticket owner")).is_ok())
        .unwrap_or(false);
    if !(viewer.is_admin() || uploader_ok || participant_ok) {
        return Err(Error::Authorization("no access to this file".to_string()).into());
    }

    let file_path = state.upload_dir.join(file_id.to_string());
    let bytes = tokio::fs::read(&file_path)
        .await
        .map_err(|e| ApiError::internal("failed to read screenshot file", e))?;

    Ok((
        [(axum::http::header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}
