//! Persistence gateway: the owner-scoped read/write path for one drawing field.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::IdentityProvider;
use crate::store::{DrawingTarget, SqliteEntityStore, StoreError};

/// Drawing gateway failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// No owner in context; nothing was read or written.
    #[error("no authenticated owner")]
    Unauthenticated,

    /// The entity does not exist or belongs to another owner.
    #[error("write rejected for {0}")]
    Rejected(String),

    /// Storage failed for another reason.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Reads and writes drawing snapshots on behalf of an autosave session.
#[async_trait]
pub trait SnapshotGateway: Send + Sync + 'static {
    /// The last stored snapshot, `None` when the entity has no drawing yet.
    async fn load(&self, target: &DrawingTarget) -> Result<Option<String>, GatewayError>;

    /// Replace the stored snapshot.
    async fn store(&self, target: &DrawingTarget, snapshot: &str) -> Result<(), GatewayError>;
}

/// Gateway over the SQLite entity store, resolving the owner on every call.
pub struct OwnerScopedGateway {
    store: Arc<SqliteEntityStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl OwnerScopedGateway {
    pub fn new(store: Arc<SqliteEntityStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }
}

#[async_trait]
impl SnapshotGateway for OwnerScopedGateway {
    async fn load(&self, target: &DrawingTarget) -> Result<Option<String>, GatewayError> {
        let owner = self
            .identity
            .current_owner()
            .ok_or(GatewayError::Unauthenticated)?;
        self.store
            .read_drawing(&owner, target)
            .map_err(|e| map_store_error(target, e))
    }

    async fn store(&self, target: &DrawingTarget, snapshot: &str) -> Result<(), GatewayError> {
        let owner = self
            .identity
            .current_owner()
            .ok_or(GatewayError::Unauthenticated)?;
        self.store
            .write_drawing(&owner, target, snapshot)
            .map_err(|e| map_store_error(target, e))
    }
}

fn map_store_error(target: &DrawingTarget, err: StoreError) -> GatewayError {
    match err {
        StoreError::NotFound(_) => GatewayError::Rejected(target.to_string()),
        other => GatewayError::Backend(other.to_string()),
    }
}
