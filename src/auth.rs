//! Owner identity seam.
//!
//! Every entity operation resolves the caller through an [`IdentityProvider`].
//! There is no anonymous fallback: when no owner is signed in, operations
//! fail with [`AuthError::Unauthenticated`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;

/// Identifier of the user owning an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Build an owner id, rejecting blank values.
    pub fn new(value: impl Into<String>) -> Result<Self, AuthError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AuthError::InvalidOwner);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no authenticated owner")]
    Unauthenticated,

    #[error("owner id must not be blank")]
    InvalidOwner,
}

/// Supplies the identity of the current caller.
pub trait IdentityProvider: Send + Sync + 'static {
    /// The signed-in owner, or `None` when unauthenticated.
    fn current_owner(&self) -> Option<OwnerId>;

    /// The signed-in owner, failing closed when absent.
    fn require_owner(&self) -> Result<OwnerId, AuthError> {
        self.current_owner().ok_or(AuthError::Unauthenticated)
    }
}

/// In-process identity that can be signed in and out at runtime.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    current: RwLock<Option<OwnerId>>,
}

impl SessionIdentity {
    /// Identity with `owner` already signed in.
    pub fn signed_in(owner: OwnerId) -> Self {
        Self {
            current: RwLock::new(Some(owner)),
        }
    }

    /// Identity with nobody signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, owner: OwnerId) {
        if let Ok(mut guard) = self.current.write() {
            *guard = Some(owner);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.current.write() {
            *guard = None;
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_owner(&self) -> Option<OwnerId> {
        // A poisoned lock reads as signed out.
        self.current.read().ok().and_then(|guard| guard.clone())
    }
}
