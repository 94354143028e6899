//! Minimal account layer: signup, login, and in-process sessions.
//!
//! Identity is a collaborator of the feed subsystem, not its core. Passwords
//! are stored as salted SHA-256 digests and verified in constant time;
//! sessions live in process memory and expire after a configurable TTL.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{NewUserParams, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 30;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid account input: {0}")]
    Validation(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// The authenticated principal resolved from a session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone)]
struct Session {
    user_id: Uuid,
    username: String,
    expires_at: OffsetDateTime,
}

/// Process-wide session table keyed by opaque session id.
pub struct SessionStore {
    entries: DashMap<Uuid, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn issue(&self, user: &UserRecord) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            Session {
                user_id: user.id,
                username: user.username.clone(),
                expires_at: OffsetDateTime::now_utc() + self.ttl,
            },
        );
        id
    }

    /// Resolve a session id to its principal; expired entries are dropped.
    pub fn resolve(&self, id: Uuid) -> Option<Principal> {
        let expired = match self.entries.get(&id) {
            Some(session) if session.expires_at > OffsetDateTime::now_utc() => {
                return Some(Principal {
                    user_id: session.user_id,
                    username: session.username.clone(),
                });
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(&id);
        }
        None
    }

    pub fn revoke(&self, id: Uuid) {
        self.entries.remove(&id);
    }
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<SessionStore>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UsersRepo>, sessions: Arc<SessionStore>) -> Self {
        Self { users, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<UserRecord, AccountError> {
        validate_username(username)?;
        validate_password(password)?;

        if self.users.find_by_username(username).await?.is_some() {
            return Err(AccountError::UsernameTaken);
        }

        let salt = Uuid::new_v4().simple().to_string();
        let hash = hash_password(&salt, password);

        let record = self
            .users
            .create_user(NewUserParams {
                username: username.to_string(),
                password_salt: salt,
                password_hash: hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AccountError::UsernameTaken,
                other => AccountError::Repo(other),
            })?;

        tracing::info!(
            target = "brusio::accounts",
            user_id = %record.id,
            username = %record.username,
            "account created"
        );

        Ok(record)
    }

    /// Verify credentials and open a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Uuid, AccountError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            return Err(AccountError::InvalidCredentials);
        };

        let candidate = hash_password(&user.password_salt, password);
        if user.password_hash.ct_eq(&candidate).unwrap_u8() == 0 {
            return Err(AccountError::InvalidCredentials);
        }

        Ok(self.sessions.issue(&user))
    }

    pub fn logout(&self, session_id: Uuid) {
        self.sessions.revoke(session_id);
    }

    pub fn resolve(&self, session_id: Uuid) -> Option<Principal> {
        self.sessions.resolve(session_id)
    }
}

fn hash_password(salt: &str, password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

fn validate_username(username: &str) -> Result<(), AccountError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AccountError::Validation(format!(
            "username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return Err(AccountError::Validation(
            "username may only contain letters, digits, and underscores".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
