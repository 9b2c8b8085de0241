use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use triage_db::Database;
use triage_domain::{Error, validate};
use triage_gateway::dispatcher::Dispatcher;
use triage_types::api::{
    Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserResponse,
};
use triage_types::models::Role;

use crate::error::ApiError;
use crate::parse_db_time;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub upload_dir: PathBuf,
}

/// Signup. New accounts are always created with the `user` role; admin
/// is a separately authorized grant, never a signup default.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::registration(&req.name, &req.email, &req.password)?;

    if state
        .db
        .get_user_by_email(&req.email)
        .map_err(|e| ApiError::internal("account lookup failed", e))?
        .is_some()
    {
        return Err(Error::Conflict("email already registered".to_string()).into());
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal("password hashing failed", e))?
        .to_string();

    let user_id = Uuid::new_v4();

    // The pre-check above is advisory only; the UNIQUE index is the
    // arbiter when two signups race on the same email.
    let created = state
        .db
        .create_user(&user_id.to_string(), &req.name, &req.email, &password_hash)
        .map_err(|e| ApiError::internal("account creation failed", e))?;
    if !created {
        return Err(Error::Conflict("email already registered".to_string()).into());
    }

    let token = create_token(&state.jwt_secret, user_id, &req.name, Role::User)
        .map_err(|e| ApiError::internal("token creation failed", e))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .map_err(|e| ApiError::internal("account lookup failed", e))?
        .ok_or_else(|| Error::Auth("invalid credentials".to_string()))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::internal("stored password hash is corrupt", e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| Error::Auth("invalid credentials".to_string()))?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::internal("stored account id is corrupt", e))?;

    // The single authorization source: the stored role column. The claim
    // caches it for the session; logging in again picks up changes.
    let role: Role = user
        .role
        .parse()
        .map_err(|e| ApiError::internal("stored role is corrupt", e))?;

    let token = create_token(&state.jwt_secret, user_id, &user.name, role)
        .map_err(|e| ApiError::internal("token creation failed", e))?;

    Ok(Json(LoginResponse {
        user_id,
        name: user.name,
        role,
        token,
    }))
}

/// Current account, resolved from the verified token.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())
        .map_err(|e| ApiError::internal("account lookup failed", e))?
        .ok_or(Error::NotFound("account"))?;

    let role: Role = user
        .role
        .parse()
        .map_err(|e| ApiError::internal("stored role is corrupt", e))?;

    Ok(Json(UserResponse {
        id: claims.sub,
        name: user.name,
        email: user.email,
        role,
        created_at: parse_db_time(&user.created_at, "account"),
    }))
}

fn create_token(secret: &str, user_id: Uuid, name: &str, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
