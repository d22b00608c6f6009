//! Entity types shared by the store, the workspace and the host protocol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::OwnerId;

/// Opaque unique entity identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two entity kinds that can carry a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    Document,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Document => "document",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "task" => Some(Self::Task),
            "document" | "doc" => Some(Self::Document),
            _ => None,
        }
    }
}

/// The drawing field of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrawingTarget {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl DrawingTarget {
    pub fn task(id: EntityId) -> Self {
        Self {
            kind: EntityKind::Task,
            id,
        }
    }

    pub fn document(id: EntityId) -> Self {
        Self {
            kind: EntityKind::Document,
            id,
        }
    }
}

impl fmt::Display for DrawingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

/// A todo bound to a due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    pub owner_id: OwnerId,
    pub title: String,
    /// Rich-text notes, stored opaquely.
    pub notes: String,
    pub due_date: NaiveDate,
    pub completed: bool,
    /// Serialized drawing snapshot, absent until the first autosave.
    pub drawing: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub notes: String,
    pub due_date: NaiveDate,
}

/// Field-level task update. Drawings are written only through autosave.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// A free-form document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: EntityId,
    pub owner_id: OwnerId,
    pub title: String,
    /// Rich-text body, stored opaquely.
    pub content: String,
    pub drawing: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Field-level document update. Drawings are written only through autosave.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub(crate) fn now_epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_parse_accepts_aliases() {
        assert_eq!(EntityKind::parse("Task"), Some(EntityKind::Task));
        assert_eq!(EntityKind::parse(" doc "), Some(EntityKind::Document));
        assert_eq!(EntityKind::parse("note"), None);
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(EntityId::generate(), EntityId::generate());
    }

    #[test]
    fn drawing_target_display() {
        let target = DrawingTarget::document(EntityId::from("d1"));
        assert_eq!(target.to_string(), "document:d1");
    }

    #[test]
    fn task_patch_has_no_drawing_field() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"title":"x","drawing":"{}"}"#).unwrap_or_default();
        assert_eq!(patch.title.as_deref(), Some("x"));
        let json = serde_json::to_value(&patch).unwrap_or_default();
        assert!(json.get("drawing").is_none());
    }
}
