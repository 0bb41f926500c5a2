//! Access Guard Middleware
//!
//! Three composable layers:
//! - [`require_auth`] - global; resolves the bearer token to a live
//!   session and injects [`CurrentUser`] into request extensions
//! - [`require_role`] - per-route; rejects sessions with a different role
//! - [`require_permission`] - per-route; rejects sessions whose role the
//!   matrix does not grant the permission
//!
//! Authorization failures are terminal; nothing here retries.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::AppError;

use crate::auth::role::{Permission, Role};
use crate::auth::session::CurrentUser;
use crate::core::ServerState;
use crate::security_log;

/// Routes reachable without a session.
///
/// Logout is public on purpose: it must stay idempotent even when the
/// presented token is already invalid, so it cannot sit behind the
/// guard that rejects invalid tokens.
fn is_public_route(path: &str) -> bool {
    matches!(path, "/auth/login" | "/auth/register" | "/auth/logout")
}

/// Resolve an Authorization header value to an authenticated context.
///
/// Shared by the middleware and the `CurrentUser` extractor. All
/// failures collapse into 401; the body never says whether the token
/// was missing, unknown, or expired.
pub fn authenticate(state: &ServerState, header: Option<&str>) -> Result<CurrentUser, AppError> {
    let Some(header) = header else {
        return Err(AppError::not_authenticated());
    };

    let session = state.sessions.resolve(header)?;

    // The session holds a weak reference to the user; a record that
    // vanished underneath a live session reads as unauthenticated.
    let user = state
        .credentials
        .find_by_id(&session.user_id)
        .ok_or_else(AppError::session_invalid)?;

    // Role comes from the session (copied at issuance), and the
    // permission set is resolved against the matrix per request.
    let permissions = state.matrix.permissions_of(session.role).clone();

    Ok(CurrentUser {
        id: user.id,
        identifier: user.identifier,
        display_name: user.display_name,
        role: session.role,
        permissions,
        session,
    })
}

/// Authentication middleware - requires a live session
///
/// Skips CORS preflight (`OPTIONS`), paths outside `/auth` and `/api`,
/// and the public auth routes. On success, [`CurrentUser`] is inserted
/// into request extensions for handlers and inner guards.
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // CORS preflight must never require auth
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let path = req.uri().path();
    if !path.starts_with("/auth") && !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }
    if is_public_route(path) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match authenticate(&state, auth_header) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(err) => {
            security_log!(
                "WARN",
                "auth_failed",
                error = err.message.clone(),
                path = path.to_string()
            );
            Err(err)
        }
    }
}

/// Role guard - requires the session role to equal `role`
///
/// Missing context is 401 (the request never passed [`require_auth`]);
/// a different role is 403.
pub fn require_role(
    role: Role,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AppError>> + Send>>
+ Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let user = req
                .extensions()
                .get::<CurrentUser>()
                .ok_or_else(AppError::not_authenticated)?;

            if user.role != role {
                security_log!(
                    "WARN",
                    "role_denied",
                    user_id = user.id.clone(),
                    user_role = user.role.to_string(),
                    required_role = role.to_string()
                );
                return Err(AppError::role_required(format!("{} role required", role)));
            }

            Ok(next.run(req).await)
        })
    }
}

/// Permission guard - requires the matrix to grant `permission` to the
/// session role
pub fn require_permission(
    permission: Permission,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AppError>> + Send>>
+ Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let user = req
                .extensions()
                .get::<CurrentUser>()
                .ok_or_else(AppError::not_authenticated)?;

            if !user.has_permission(permission) {
                security_log!(
                    "WARN",
                    "permission_denied",
                    user_id = user.id.clone(),
                    user_role = user.role.to_string(),
                    required_permission = permission.to_string()
                );
                return Err(AppError::permission_denied(format!(
                    "Permission denied: {}",
                    permission
                )));
            }

            Ok(next.run(req).await)
        })
    }
}
