//! Credential Store
//!
//! Holds user records keyed by identifier (email) and verifies
//! presented passwords against their argon2 hashes. The raw password
//! is never stored.
//!
//! Lookup failures and wrong passwords collapse into the same
//! [`CredentialError::InvalidCredentials`] so the API cannot be used
//! to enumerate registered identifiers.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::role::Role;

/// A registered user
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Opaque unique id (uuid v4 string)
    pub id: String,
    /// Login identifier (email), unique
    pub identifier: String,
    /// Argon2 PHC-string hash of the password
    pub credential_hash: String,
    /// Assigned role
    pub role: Role,
    /// Name shown in the UI
    pub display_name: String,
}

/// Credential store failures
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Unknown identifier or wrong password; deliberately undistinguished
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("identifier already registered: {0}")]
    DuplicateIdentifier(String),

    #[error("password hashing failed")]
    Hashing,
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidCredentials => AppError::invalid_credentials(),
            CredentialError::DuplicateIdentifier(id) => {
                AppError::already_exists("identifier").with_detail("identifier", id)
            }
            CredentialError::Hashing => AppError::internal("password hashing failed"),
        }
    }
}

/// One-way password hasher/verifier, injected at store construction
pub trait PasswordVerifier: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, CredentialError>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Default verifier backed by argon2 with per-password salts
#[derive(Debug, Default)]
pub struct Argon2Verifier;

impl PasswordVerifier for Argon2Verifier {
    fn hash(&self, password: &str) -> Result<String, CredentialError> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| CredentialError::Hashing)?;
        Ok(password_hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        use argon2::{
            Argon2,
            password_hash::{PasswordHash, PasswordVerifier},
        };

        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Concurrent in-memory user store
///
/// Safe for concurrent reads and writes; callers never need external
/// locking.
pub struct CredentialStore {
    users: DashMap<String, UserRecord>,
    verifier: Box<dyn PasswordVerifier>,
    // Verified against on the unknown-identifier path so response
    // timing does not reveal whether the identifier exists.
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new(verifier: Box<dyn PasswordVerifier>) -> Result<Self, CredentialError> {
        let dummy_hash = verifier.hash(&Uuid::new_v4().to_string())?;
        Ok(Self {
            users: DashMap::new(),
            verifier,
            dummy_hash,
        })
    }

    /// Register a new user; fails if the identifier is taken
    ///
    /// The insert goes through the map's entry API, so two concurrent
    /// registrations of the same identifier cannot both succeed.
    pub fn register(
        &self,
        identifier: &str,
        password: &str,
        role: Role,
        display_name: &str,
    ) -> Result<UserRecord, CredentialError> {
        // Hash outside the entry lock; argon2 is deliberately slow.
        let credential_hash = self.verifier.hash(password)?;

        match self.users.entry(identifier.to_string()) {
            Entry::Occupied(_) => Err(CredentialError::DuplicateIdentifier(
                identifier.to_string(),
            )),
            Entry::Vacant(vacant) => {
                let record = UserRecord {
                    id: Uuid::new_v4().to_string(),
                    identifier: identifier.to_string(),
                    credential_hash,
                    role,
                    display_name: display_name.to_string(),
                };
                vacant.insert(record.clone());
                Ok(record)
            }
        }
    }

    /// Verify a presented password and return the matching record
    pub fn verify(&self, identifier: &str, password: &str) -> Result<UserRecord, CredentialError> {
        match self.find_by_identifier(identifier) {
            Some(user) => {
                if self.verifier.verify(password, &user.credential_hash) {
                    Ok(user)
                } else {
                    Err(CredentialError::InvalidCredentials)
                }
            }
            None => {
                let _ = self.verifier.verify(password, &self.dummy_hash);
                Err(CredentialError::InvalidCredentials)
            }
        }
    }

    pub fn find_by_identifier(&self, identifier: &str) -> Option<UserRecord> {
        self.users.get(identifier).map(|entry| entry.clone())
    }

    /// Lookup by opaque id
    ///
    /// Scans the map; the store holds staff accounts, not patients, so
    /// it stays small.
    pub fn find_by_id(&self, id: &str) -> Option<UserRecord> {
        self.users
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.clone())
    }

    /// All registered users (hashes included; callers must not expose them)
    pub fn all_users(&self) -> Vec<UserRecord> {
        self.users.iter().map(|entry| entry.clone()).collect()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
