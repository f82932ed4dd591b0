//! Current-user context consumed for audit fields.
//!
//! Authentication lives outside the engine. Services ask a [`CurrentUser`]
//! implementation who is acting and stamp the answer onto `created_by` and
//! `updated_by`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of the user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of the acting user for audit stamping.
pub trait CurrentUser: Send + Sync {
    /// Returns the acting user, or `None` for system-initiated changes.
    fn current_user(&self) -> Option<UserId>;
}

/// Identity provider for unattended or system-initiated operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousUser;

impl CurrentUser for AnonymousUser {
    fn current_user(&self) -> Option<UserId> {
        None
    }
}

/// Identity provider that always reports the same user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticUser(UserId);

impl StaticUser {
    /// Creates a provider reporting `user`.
    #[must_use]
    pub const fn new(user: UserId) -> Self {
        Self(user)
    }
}

impl CurrentUser for StaticUser {
    fn current_user(&self) -> Option<UserId> {
        Some(self.0)
    }
}
