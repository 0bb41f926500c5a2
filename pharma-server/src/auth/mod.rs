//! Authentication and Authorization
//!
//! The security core of the server:
//! - [`Role`] / [`Permission`] - closed enumerations
//! - [`RolePermissionMatrix`] - immutable role → permission table
//! - [`CredentialStore`] - user records + argon2 verification
//! - [`SessionManager`] - opaque bearer tokens with 24h expiry
//! - [`require_auth`] / [`require_role`] / [`require_permission`] -
//!   request guards

pub mod credential;
pub mod extractor;
pub mod matrix;
pub mod middleware;
pub mod role;
pub mod session;

pub use credential::{Argon2Verifier, CredentialError, CredentialStore, PasswordVerifier, UserRecord};
pub use matrix::RolePermissionMatrix;
pub use middleware::{require_auth, require_permission, require_role};
pub use role::{Permission, Role, UnknownRole};
pub use session::{Clock, CurrentUser, Session, SessionError, SessionManager, SystemClock, strip_bearer};
