//! planink: personal tasks and documents with freehand drawing overlays.
//!
//! Every task and document belongs to exactly one owner and may carry a
//! drawing snapshot. The drawing is saved by an autosave session that
//! captures the editor state and persists it under a debounced + periodic +
//! flush-on-exit policy while skipping redundant writes.
//!
//! # Architecture
//!
//! - **Store**: owner-scoped SQLite persistence for tasks and documents
//! - **Drawing**: the editor seam, the built-in `Sketch` editor and its
//!   JSON snapshot codec
//! - **Autosave**: change detection, one-shot hydration, the owner-scoped
//!   gateway and the per-session scheduler actor
//! - **Workspace**: CRUD and drawing views for the signed-in owner
//! - **Host**: newline-delimited JSON command bridge over stdin/stdout

pub mod auth;
pub mod autosave;
pub mod config;
pub mod drawing;
pub mod error;
pub mod host;
pub mod store;
pub mod workspace;

pub use autosave::{AutosaveEvent, AutosaveHandle, AutosaveSession, SaveTrigger, SchedulerState};
pub use config::PlaninkConfig;
pub use error::{PlaninkError, Result};
pub use workspace::{DrawingView, Workspace};
