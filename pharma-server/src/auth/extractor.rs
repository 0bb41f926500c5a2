//! CurrentUser Extractor
//!
//! Lets protected handlers take `user: CurrentUser` as an argument.
//! Reuses the context injected by the auth middleware when present and
//! falls back to resolving the Authorization header itself.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::AppError;

use crate::auth::middleware::authenticate;
use crate::auth::session::CurrentUser;
use crate::core::ServerState;

impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Already extracted by the middleware
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let user = authenticate(state, auth_header)?;

        // Store for potential reuse further down the stack
        parts.extensions.insert(user.clone());

        Ok(user)
    }
}
