//! PharmaFlow Auth Server
//!
//! Authentication, session, and authorization backend for the pharmacy
//! management frontend:
//!
//! - **Credentials** (`auth::credential`): user records, argon2
//!   password verification
//! - **Sessions** (`auth::session`): opaque bearer tokens bound to
//!   server-side records with a fixed 24h TTL
//! - **Authorization** (`auth::matrix`, `auth::middleware`): immutable
//!   role → permission table, role/permission request guards
//! - **HTTP API** (`routes`, `handler`): axum routers and handlers
//!
//! # Module structure
//!
//! ```text
//! pharma-server/src/
//! ├── core/          # configuration, state, HTTP server loop
//! ├── auth/          # roles, matrix, credentials, sessions, guards
//! ├── handler/       # request handlers
//! ├── routes/        # router assembly and tower-http layers
//! └── utils/         # logging
//! ```

pub mod auth;
pub mod core;
pub mod handler;
pub mod routes;
pub mod utils;

// Re-export public types
pub use auth::{
    CredentialStore, CurrentUser, Permission, Role, RolePermissionMatrix, Session, SessionManager,
};
pub use core::{Config, Server, ServerState};
pub use routes::{build_app, build_router};
pub use utils::logger::init_logger;

// Security logging macro - tagged events for auth-relevant failures
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

pub fn print_banner() {
    println!(
        r#"
    ____  __                              ________
   / __ \/ /_  ____ __________ ___  ____ / ____/ /___ _      __
  / /_/ / __ \/ __ `/ ___/ __ `__ \/ __ `/ /_  / / __ \ | /| / /
 / ____/ / / / /_/ / /  / / / / / / /_/ / __/ / / /_/ / |/ |/ /
/_/   /_/ /_/\__,_/_/  /_/ /_/ /_/\__,_/_/   /_/\____/|__/|__/
    "#
    );
}
