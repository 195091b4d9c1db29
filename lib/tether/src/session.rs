//! Authenticated user and the shared current-user cell.
//!
//! Every client derived from the same root (through [`crate::Client::with_filter`]
//! or `Clone`) holds the same [`Session`], so a login performed on any of them
//! is visible to all. A client built from scratch starts a new session.
//!
//! The cell is guarded by a lock, but login/logout sequences are not atomic:
//! callers that log in and out concurrently must serialize those calls.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// An authenticated end user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authentication_token: Option<String>,
}

impl User {
    /// Create a user without an authentication token.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            authentication_token: None,
        }
    }

    /// Attach the service authentication token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.authentication_token = Some(token.into());
        self
    }

    /// Identifier of the user, e.g. `Facebook:1234`.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Token sent with every request made on behalf of this user.
    #[must_use]
    pub fn authentication_token(&self) -> Option<&str> {
        self.authentication_token.as_deref()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("user_id", &self.user_id)
            .field(
                "authentication_token",
                &self.authentication_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Mutable cell holding the current user.
#[derive(Debug, Default)]
pub struct Session {
    user: RwLock<Option<User>>,
}

impl Session {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current user, returning the previous one.
    pub fn set_current_user(&self, user: Option<User>) -> Option<User> {
        let mut slot = self.user.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, user)
    }

    /// Token of the current user, if logged in with one.
    #[must_use]
    pub fn authentication_token(&self) -> Option<String> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|user| user.authentication_token.clone())
    }
}
