//! One-shot editor hydration from a stored snapshot.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::drawing::DrawingEditor;

/// Result of a hydration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hydration {
    /// The stored snapshot was loaded into the editor.
    Loaded,
    /// Nothing was stored; the editor starts empty.
    Empty,
    /// The stored snapshot was unreadable; the editor was reset to empty.
    Corrupt,
    /// This session already hydrated; nothing was done.
    AlreadyLoaded,
}

/// Tracks whether a session has hydrated its editor.
#[derive(Debug, Default)]
pub struct HydrationGate {
    loaded: bool,
}

impl HydrationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Hydrate `editor` from `stored` unless this gate already did.
    ///
    /// An absent snapshot also closes the gate, so a snapshot that shows up
    /// later cannot overwrite strokes drawn in the meantime.
    pub fn hydrate<E: DrawingEditor + ?Sized>(
        &mut self,
        editor: &mut E,
        stored: Option<&str>,
    ) -> Hydration {
        if self.loaded {
            debug!("hydration skipped: session already loaded");
            return Hydration::AlreadyLoaded;
        }
        self.loaded = true;

        let Some(raw) = stored else {
            return Hydration::Empty;
        };
        match editor.load_snapshot(raw) {
            Ok(()) => Hydration::Loaded,
            Err(e) => {
                warn!(error = %e, bytes = raw.len(), "stored drawing unreadable; starting empty");
                editor.clear();
                Hydration::Corrupt
            }
        }
    }
}
