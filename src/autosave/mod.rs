//! Drawing-snapshot autosave.
//!
//! Sub-modules:
//! - `change`: no-op write suppression.
//! - `hydrate`: one-shot editor hydration.
//! - `gateway`: owner-scoped snapshot read/write path.
//! - `scheduler`: session state, triggers and the save path.
//! - `session`: the per-session actor and its handle.

pub mod change;
pub mod gateway;
pub mod hydrate;
pub mod scheduler;
pub mod session;

pub use change::ChangeDetector;
pub use gateway::{GatewayError, OwnerScopedGateway, SnapshotGateway};
pub use hydrate::{Hydration, HydrationGate};
pub use scheduler::{AutosaveEvent, SaveOutcome, SaveTrigger, SchedulerState, SessionContext};
pub use session::{AutosaveHandle, AutosaveSession};
