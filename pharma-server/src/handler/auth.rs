//! Authentication Handlers
//!
//! Login, registration, token validation, logout, and session
//! introspection.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{ApiResponse, AppError};
use validator::Validate;

use crate::auth::session::CurrentUser;
use crate::handler::AppJson;
use crate::auth::{Role, Session, UserRecord};
use crate::core::ServerState;
use crate::security_log;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 1))]
    pub display_name: String,
    /// Optional role name; unknown or missing defaults to TECHNICIAN
    pub role: Option<String>,
}

/// User profile returned by every auth endpoint
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct SessionMetadata {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub origin_address: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfoResponse {
    pub user: UserInfo,
    pub session: SessionMetadata,
}

fn user_info(state: &ServerState, user: &UserRecord, role: Role) -> UserInfo {
    let mut permissions: Vec<String> = state
        .matrix
        .permissions_of(role)
        .iter()
        .map(|p| p.to_string())
        .collect();
    permissions.sort();

    UserInfo {
        id: user.id.clone(),
        email: user.identifier.clone(),
        name: user.display_name.clone(),
        role,
        permissions,
    }
}

/// Where the login came from, for session metadata. Proxied deployments
/// hand us the client address in X-Forwarded-For.
fn client_origin(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// POST /auth/login
///
/// Verifies credentials and mints a session token. Wrong password and
/// unknown email both answer 401 with the same body; a body missing
/// required fields is 400.
pub async fn login(
    State(state): State<ServerState>,
    headers: HeaderMap,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let user = state.credentials.verify(&req.email, &req.password).map_err(|e| {
        security_log!("WARN", "login_failed", identifier = req.email.clone());
        AppError::from(e)
    })?;

    let origin = client_origin(&headers);
    let session = state.sessions.issue(&user.id, user.role, &origin)?;

    tracing::info!(
        user_id = %user.id,
        identifier = %user.identifier,
        role = %user.role,
        "user logged in"
    );

    Ok(Json(ApiResponse::ok(TokenResponse {
        token: session.token.clone(),
        user: user_info(&state, &user, session.role),
    })))
}

/// POST /auth/register
///
/// Creates an account and logs it in immediately. Duplicate identifier
/// is 409; missing/invalid fields are 400.
pub async fn register(
    State(state): State<ServerState>,
    headers: HeaderMap,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    // Unknown role strings fall back to the least-privileged role
    // rather than failing registration; authorization stays fail-closed
    // because TECHNICIAN grants the minimum.
    let role = req
        .role
        .as_deref()
        .and_then(|r| r.parse::<Role>().ok())
        .unwrap_or(Role::Technician);

    let user = state
        .credentials
        .register(&req.email, &req.password, role, &req.display_name)?;

    let origin = client_origin(&headers);
    let session = state.sessions.issue(&user.id, user.role, &origin)?;

    tracing::info!(
        user_id = %user.id,
        identifier = %user.identifier,
        role = %user.role,
        "user registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(TokenResponse {
            token: session.token.clone(),
            user: user_info(&state, &user, session.role),
        })),
    ))
}

/// GET /auth/validate
///
/// 200 with the profile when the presented token resolves to a live
/// session, 401 otherwise (enforced by the auth middleware).
pub async fn validate(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<UserInfo>>, AppError> {
    let record = state
        .credentials
        .find_by_id(&user.id)
        .ok_or_else(AppError::session_invalid)?;

    Ok(Json(ApiResponse::ok(user_info(&state, &record, user.role))))
}

/// POST /auth/logout
///
/// Public route: revoking an already-invalid token is a success, so
/// this never answers 401. Idempotent.
pub async fn logout(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Json<ApiResponse<()>> {
    if let Some(header) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        state.sessions.invalidate(header);
        tracing::info!("session revoked");
    }

    Json(ApiResponse::ok_with_message((), "Logout successful"))
}

/// GET /auth/session
///
/// Profile plus session metadata and the permission list for the
/// session's role.
pub async fn session_info(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<SessionInfoResponse>>, AppError> {
    let record = state
        .credentials
        .find_by_id(&user.id)
        .ok_or_else(AppError::session_invalid)?;

    let Session {
        created_at,
        expires_at,
        origin_address,
        ..
    } = user.session.clone();

    Ok(Json(ApiResponse::ok(SessionInfoResponse {
        user: user_info(&state, &record, user.role),
        session: SessionMetadata {
            created_at,
            expires_at,
            origin_address,
        },
    })))
}
