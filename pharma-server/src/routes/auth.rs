//! Authentication Routes
//!
//! - /auth/login, /auth/register, /auth/logout: public
//! - /auth/validate, /auth/session: protected by the global auth
//!   middleware (see `routes::build_app`)

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;
use crate::handler::auth;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/validate", get(auth::validate))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::session_info))
}
