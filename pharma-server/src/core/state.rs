//! Server State
//!
//! Holds the shared service singletons. Everything is behind `Arc`, so
//! cloning the state is cheap and every worker observes the same
//! stores. Stores are constructed once here and injected by reference;
//! there is no process-wide mutable global.

use std::sync::Arc;

use anyhow::{Context, ensure};
use chrono::Duration;

use crate::auth::{
    Argon2Verifier, CredentialStore, Role, RolePermissionMatrix, SessionManager,
};
use crate::core::Config;

/// Demo accounts seeded outside production, matching the frontend's
/// development fixtures
const DEMO_USERS: &[(&str, &str, Role, &str)] = &[
    ("admin@example.com", "admin123", Role::Admin, "Admin User"),
    (
        "pharmacist@example.com",
        "pharma123",
        Role::Pharmacist,
        "Pharmacist User",
    ),
    (
        "tech@example.com",
        "tech123",
        Role::Technician,
        "Technician User",
    ),
];

#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Config,
    /// User records and password verification
    pub credentials: Arc<CredentialStore>,
    /// Token issuance and session resolution
    pub sessions: Arc<SessionManager>,
    /// Role → permission table, read-only after startup
    pub matrix: Arc<RolePermissionMatrix>,
}

impl ServerState {
    /// Create server state from pre-built stores (manual construction)
    ///
    /// Usually [`initialize()`] is what you want; this exists for tests
    /// that inject their own verifier or clock.
    ///
    /// [`initialize()`]: ServerState::initialize
    pub fn new(
        config: Config,
        credentials: Arc<CredentialStore>,
        sessions: Arc<SessionManager>,
        matrix: Arc<RolePermissionMatrix>,
    ) -> Self {
        Self {
            config,
            credentials,
            sessions,
            matrix,
        }
    }

    /// Wire up the stores
    ///
    /// Fails (and must abort startup) if the role-permission matrix
    /// comes up empty; running fail-closed on an empty matrix would
    /// deny every permission-guarded route while role-guarded routes
    /// kept working, which is a misconfiguration, not a degraded mode.
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        let matrix = RolePermissionMatrix::pharmacy_defaults();
        ensure!(
            !matrix.is_empty(),
            "role-permission matrix initialized empty; refusing to start"
        );

        let credentials = CredentialStore::new(Box::new(Argon2Verifier))
            .context("failed to initialize credential store")?;

        let sessions = SessionManager::new(Duration::hours(config.session_ttl_hours));

        let state = Self {
            config: config.clone(),
            credentials: Arc::new(credentials),
            sessions: Arc::new(sessions),
            matrix: Arc::new(matrix),
        };

        if config.seed_demo_users {
            state.seed_demo_users();
        }

        Ok(state)
    }

    fn seed_demo_users(&self) {
        for (identifier, password, role, display_name) in DEMO_USERS {
            match self
                .credentials
                .register(identifier, password, *role, display_name)
            {
                Ok(user) => {
                    tracing::info!(identifier = %user.identifier, role = %user.role, "seeded demo user")
                }
                Err(err) => {
                    tracing::warn!(identifier, error = %err, "skipped demo user")
                }
            }
        }
    }
}
