//! No-op write suppression.

/// Remembers the last snapshot handed to storage within one session.
///
/// Starts empty and is never seeded from the stored value, so the first
/// successful serialization of a session is always persisted.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_persisted: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `snapshot` differs from the remembered value.
    ///
    /// On `true` the remembered value becomes `snapshot` immediately, before
    /// the write is confirmed.
    pub fn should_persist(&mut self, snapshot: &str) -> bool {
        if !differs(snapshot, self.last_persisted.as_deref()) {
            return false;
        }
        self.last_persisted = Some(snapshot.to_owned());
        true
    }
}

/// Plain value comparison over the serialized form.
pub fn differs(snapshot: &str, last_persisted: Option<&str>) -> bool {
    last_persisted != Some(snapshot)
}
