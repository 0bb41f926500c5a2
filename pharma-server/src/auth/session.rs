//! Session Manager
//!
//! Issues opaque bearer tokens and binds each one to a server-side
//! session record with a fixed TTL. Tokens carry no claims; all
//! authority lives in the session map.
//!
//! # Expiry
//!
//! There is no background sweep. An expired session is deleted the
//! next time its token is presented (lazy eviction), so memory for
//! abandoned sessions is reclaimed only on next access. Deployments
//! serving many short-lived clients should size for that and watch
//! `session_count` via `/metrics`.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ring::rand::{SecureRandom, SystemRandom};
use serde::Serialize;
use shared::AppError;
use thiserror::Error;

use crate::auth::role::{Permission, Role};

/// Token entropy in bytes (256 bits; the spec floor is 128)
const TOKEN_BYTES: usize = 32;

/// Time source, injectable so tests can drive expiry deterministically
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Server-side record binding a token to a user identity and validity window
///
/// Created exactly once per successful login or registration. The role
/// is copied at issuance on purpose: a later role change never alters
/// the authority of an in-flight session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub origin_address: String,
    pub active: bool,
}

impl Session {
    /// Dead for all read purposes: revoked or past its window
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.active || now > self.expires_at
    }
}

/// Session manager failures
///
/// Absent, revoked, and expired tokens all collapse into [`Invalid`]
/// so callers cannot probe which sessions exist.
///
/// [`Invalid`]: SessionError::Invalid
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is invalid or expired")]
    Invalid,

    #[error("token generation failed")]
    TokenGeneration,
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Invalid => AppError::session_invalid(),
            SessionError::TokenGeneration => AppError::internal("token generation failed"),
        }
    }
}

/// Strip an optional `Bearer ` scheme prefix from a header value
pub fn strip_bearer(presented: &str) -> &str {
    presented.strip_prefix("Bearer ").unwrap_or(presented).trim()
}

/// Concurrent in-memory session store
///
/// Safe for concurrent reads and writes. A session is visible in the
/// map before its token is returned to the caller, so an `issue`
/// immediately followed by `resolve` on any thread sees it as valid.
pub struct SessionManager {
    sessions: DashMap<String, Session>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
}

impl SessionManager {
    /// Create a manager with the given TTL and the system clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            clock,
            rng: SystemRandom::new(),
        }
    }

    /// Mint a token and register a new session under it
    ///
    /// The token is drawn from a CSPRNG and encoded URL-safe base64 for
    /// header transport. A token already bound to a live session is
    /// never handed out again; on the astronomically unlikely collision
    /// a fresh token is drawn.
    pub fn issue(
        &self,
        user_id: &str,
        role: Role,
        origin_address: &str,
    ) -> Result<Session, SessionError> {
        let now = self.clock.now();

        loop {
            let token = self.generate_token()?;
            match self.sessions.entry(token.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(vacant) => {
                    let session = Session {
                        token,
                        user_id: user_id.to_string(),
                        role,
                        created_at: now,
                        expires_at: now + self.ttl,
                        origin_address: origin_address.to_string(),
                        active: true,
                    };
                    vacant.insert(session.clone());
                    return Ok(session);
                }
            }
        }
    }

    /// Resolve a presented token (with or without `Bearer ` prefix) to
    /// a live session
    ///
    /// Expired-but-still-present records are deleted here; this is the
    /// only garbage collection.
    pub fn resolve(&self, presented: &str) -> Result<Session, SessionError> {
        let token = strip_bearer(presented);
        if token.is_empty() {
            return Err(SessionError::Invalid);
        }

        let now = self.clock.now();
        let expired = match self.sessions.get(token) {
            None => return Err(SessionError::Invalid),
            Some(entry) if entry.is_expired(now) => true,
            Some(entry) => return Ok(entry.clone()),
        };

        if expired {
            // Lazy eviction. The guard re-checks under the shard lock so
            // a racing resolve never deletes a live record.
            self.sessions
                .remove_if(token, |_, session| session.is_expired(now));
        }
        Err(SessionError::Invalid)
    }

    /// Revoke a session; idempotent, never errors on unknown tokens
    pub fn invalidate(&self, presented: &str) {
        let token = strip_bearer(presented);
        self.sessions.remove(token);
    }

    /// Number of session records currently held (live and not-yet-evicted)
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn generate_token(&self) -> Result<String, SessionError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| SessionError::TokenGeneration)?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.sessions.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Authenticated request context, injected into request extensions by
/// the auth middleware
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub identifier: String,
    pub display_name: String,
    /// Role copied from the session, not the user record
    pub role: Role,
    /// Permissions the matrix grants the session role, resolved per request
    pub permissions: HashSet<Permission>,
    pub session: Session,
}

impl CurrentUser {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new(Duration::hours(24))
    }

    #[test]
    fn issue_then_resolve_returns_same_session() {
        let manager = manager();
        let issued = manager.issue("user-1", Role::Pharmacist, "10.0.0.7").unwrap();

        let resolved = manager.resolve(&issued.token).unwrap();
        assert_eq!(resolved, issued);
        assert_eq!(resolved.user_id, "user-1");
        assert_eq!(resolved.role, Role::Pharmacist);
        assert_eq!(resolved.origin_address, "10.0.0.7");
        assert!(resolved.active);
        assert!(resolved.expires_at > resolved.created_at);
    }

    #[test]
    fn resolve_tolerates_bearer_prefix() {
        let manager = manager();
        let issued = manager.issue("user-1", Role::Admin, "local").unwrap();

        assert!(manager.resolve(&format!("Bearer {}", issued.token)).is_ok());
        assert!(manager.resolve(&issued.token).is_ok());
    }

    #[test]
    fn unknown_and_empty_tokens_are_invalid() {
        let manager = manager();
        assert_eq!(manager.resolve("no-such-token"), Err(SessionError::Invalid));
        assert_eq!(manager.resolve(""), Err(SessionError::Invalid));
        assert_eq!(manager.resolve("Bearer "), Err(SessionError::Invalid));
    }

    #[test]
    fn expired_session_is_invalid_and_lazily_evicted() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let manager = SessionManager::with_clock(Duration::hours(24), clock.clone());

        let issued = manager.issue("user-1", Role::Technician, "local").unwrap();
        assert!(manager.resolve(&issued.token).is_ok());
        assert_eq!(manager.session_count(), 1);

        clock.advance(Duration::hours(24) + Duration::seconds(1));

        assert_eq!(manager.resolve(&issued.token), Err(SessionError::Invalid));
        // The record is gone, not just reported invalid.
        assert_eq!(manager.session_count(), 0);
    }

    #[test]
    fn session_valid_until_exactly_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let manager = SessionManager::with_clock(Duration::hours(24), clock.clone());

        let issued = manager.issue("user-1", Role::Admin, "local").unwrap();
        clock.advance(Duration::hours(24));

        // now == expires_at is still valid; only now > expires_at is dead
        assert!(manager.resolve(&issued.token).is_ok());
    }

    #[test]
    fn invalidate_is_idempotent() {
        let manager = manager();
        let issued = manager.issue("user-1", Role::Admin, "local").unwrap();

        manager.invalidate(&issued.token);
        assert_eq!(manager.resolve(&issued.token), Err(SessionError::Invalid));

        // Second call and unknown tokens are no-ops, never errors.
        manager.invalidate(&issued.token);
        manager.invalidate("Bearer something-else");
        manager.invalidate("");
        assert_eq!(manager.resolve(&issued.token), Err(SessionError::Invalid));
    }

    #[test]
    fn tokens_have_expected_shape() {
        let manager = manager();
        let issued = manager.issue("user-1", Role::Admin, "local").unwrap();

        // 32 bytes -> 43 base64 chars, URL-safe alphabet, no padding
        assert_eq!(issued.token.len(), 43);
        assert!(!issued.token.contains('='));
        assert!(
            issued
                .token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn concurrent_issuance_yields_distinct_tokens() {
        let manager = Arc::new(manager());
        let threads = 16;
        let per_thread = 625; // 10_000 total

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    (0..per_thread)
                        .map(|i| {
                            manager
                                .issue(&format!("user-{t}-{i}"), Role::Technician, "local")
                                .unwrap()
                                .token
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for token in handle.join().unwrap() {
                assert!(seen.insert(token), "duplicate token issued");
            }
        }
        assert_eq!(seen.len(), threads * per_thread);
        assert_eq!(manager.session_count(), threads * per_thread);
    }
}
