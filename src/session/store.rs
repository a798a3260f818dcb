//! In-memory session backed by durable storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! The single source of truth for "am I signed in, and as whom" within one
//! client instance. Token and user live in one `Option<Session>` so neither
//! can exist without the other.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::storage::SessionStorage;
use crate::error::ApiError;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Identity attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Account role reported by the server at login (e.g. `"missionary"`).
    pub role: String,
    /// Email the user signed in with.
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    current: Mutex<Option<Session>>,
}

impl SessionStore {
    /// Seed the store from whatever `storage` holds.
    ///
    /// A token without a parseable user record (or the reverse) loads as no
    /// session; the stale entries are left for the next `set`/`clear`.
    #[must_use]
    pub fn load(storage: Arc<dyn SessionStorage>) -> Self {
        let current = read_persisted(storage.as_ref());
        Self { storage, current: Mutex::new(current) }
    }

    /// Persist and adopt a new session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if persisting fails; the in-memory session
    /// is left unchanged in that case.
    pub fn set(&self, token: &str, user: SessionUser) -> Result<(), ApiError> {
        let user_json = serde_json::to_string(&user).map_err(|e| ApiError::Storage(e.to_string()))?;
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        self.storage.set_all(&[(TOKEN_KEY, token), (USER_KEY, &user_json)])?;
        *current = Some(Session { token: token.to_owned(), user });
        Ok(())
    }

    /// Forget the session in memory and in storage.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the persisted entries could not be
    /// removed. The in-memory session is cleared regardless.
    pub fn clear(&self) -> Result<(), ApiError> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = None;
        self.storage.remove_all(&[TOKEN_KEY, USER_KEY])
    }

    /// Swap in a refreshed token, keeping the current user.
    ///
    /// Returns `false` (and stores nothing) when no session is held.
    pub(crate) fn replace_token(&self, token: &str) -> Result<bool, ApiError> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(session) = current.as_mut() else {
            return Ok(false);
        };
        self.storage.set_all(&[(TOKEN_KEY, token)])?;
        token.clone_into(&mut session.token);
        Ok(true)
    }

    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.token.clone())
    }

    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.user.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

fn read_persisted(storage: &dyn SessionStorage) -> Option<Session> {
    let entries = storage
        .get(TOKEN_KEY)
        .and_then(|token| storage.get(USER_KEY).map(|user| (token, user)));
    let (token, user_json) = match entries {
        Ok((Some(token), Some(user_json))) if !token.is_empty() => (token, user_json),
        Ok((Some(_), None)) => {
            tracing::warn!("persisted token has no user record; starting signed out");
            return None;
        }
        Ok(_) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "session storage unreadable; starting signed out");
            return None;
        }
    };
    match serde_json::from_str::<SessionUser>(&user_json) {
        Ok(user) => Some(Session { token, user }),
        Err(e) => {
            tracing::warn!(error = %e, "persisted user record is malformed; starting signed out");
            None
        }
    }
}
