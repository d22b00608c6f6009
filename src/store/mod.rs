//! Owner-scoped persistence for tasks and documents.
//!
//! Sub-modules:
//! - `types`: entity types and ids (backend-agnostic).
//! - `schema`: SQLite DDL definitions.
//! - `sqlite`: SQLite-backed `SqliteEntityStore`.

pub(crate) mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::{SqliteEntityStore, StoreError};
pub use types::{
    Document, DocumentPatch, DrawingTarget, EntityId, EntityKind, NewDocument, NewTask, Task,
    TaskPatch,
};
