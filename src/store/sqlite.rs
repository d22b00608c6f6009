//! SQLite-backed entity store.
//!
//! Single database file at `{root_dir}/planink.db`. Every statement is
//! scoped by `owner_id`, so a row owned by someone else is reported exactly
//! like a missing one.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use super::schema::{apply_schema, read_schema_version};
use super::types::{
    Document, DocumentPatch, DrawingTarget, EntityId, EntityKind, NewDocument, NewTask, Task,
    TaskPatch, now_epoch_millis,
};
use crate::auth::OwnerId;

/// Database filename within the store root directory.
const DB_FILENAME: &str = "planink.db";

const TASK_COLUMNS: &str =
    "id, owner_id, title, notes, due_date, completed, drawing, created_at, updated_at";

const DOCUMENT_COLUMNS: &str = "id, owner_id, title, content, drawing, created_at, updated_at";

/// SQLite-backed entity store.
///
/// Thread-safe via an internal `Mutex<Connection>`; all statements are
/// serialized.
pub struct SqliteEntityStore {
    root: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteEntityStore {
    /// Open (or create) the database at `{root_dir}/planink.db`.
    pub fn new(root_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root_dir).map_err(|e| StoreError::Io(e.to_string()))?;
        let conn = Connection::open(root_dir.join(DB_FILENAME))?;
        apply_schema(&conn)?;
        Ok(Self {
            root: Some(root_dir.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            root: None,
            conn: Mutex::new(conn),
        })
    }

    /// Root directory, `None` for in-memory stores.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn schema_version(&self) -> Result<Option<u32>, StoreError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn create_task(&self, owner: &OwnerId, new: &NewTask) -> Result<Task, StoreError> {
        let title = validated_title(&new.title)?;
        let conn = self.lock()?;
        let now = now_epoch_millis();
        let id = EntityId::generate();

        conn.execute(
            "INSERT INTO tasks \
             (id, owner_id, title, notes, due_date, completed, drawing, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6, ?7)",
            params![
                id.as_str(),
                owner.as_str(),
                title,
                new.notes,
                new.due_date.to_string(),
                now,
                now
            ],
        )?;

        query_task(&conn, owner, &id)
    }

    pub fn get_task(&self, owner: &OwnerId, id: &EntityId) -> Result<Task, StoreError> {
        let conn = self.lock()?;
        query_task(&conn, owner, id)
    }

    /// All tasks of `owner`, ordered by due date.
    pub fn list_tasks(&self, owner: &OwnerId) -> Result<Vec<Task>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 \
             ORDER BY due_date ASC, created_at ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner.as_str()], row_to_task)?;
        collect_rows(rows)
    }

    /// Tasks of `owner` due on `date`.
    pub fn list_tasks_due(&self, owner: &OwnerId, date: NaiveDate) -> Result<Vec<Task>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 AND due_date = ?2 \
             ORDER BY created_at ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner.as_str(), date.to_string()], row_to_task)?;
        collect_rows(rows)
    }

    pub fn update_task(
        &self,
        owner: &OwnerId,
        id: &EntityId,
        patch: &TaskPatch,
    ) -> Result<Task, StoreError> {
        let title = patch.title.as_deref().map(validated_title).transpose()?;
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE tasks SET title = COALESCE(?1, title), notes = COALESCE(?2, notes), \
             due_date = COALESCE(?3, due_date), updated_at = ?4 \
             WHERE id = ?5 AND owner_id = ?6",
            params![
                title,
                patch.notes,
                patch.due_date.map(|d| d.to_string()),
                now_epoch_millis(),
                id.as_str(),
                owner.as_str()
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        query_task(&conn, owner, id)
    }

    pub fn set_task_completed(
        &self,
        owner: &OwnerId,
        id: &EntityId,
        completed: bool,
    ) -> Result<Task, StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE tasks SET completed = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![completed, now_epoch_millis(), id.as_str(), owner.as_str()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        query_task(&conn, owner, id)
    }

    pub fn delete_task(&self, owner: &OwnerId, id: &EntityId) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
            params![id.as_str(), owner.as_str()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Move every incomplete task due before `today` onto `today`.
    ///
    /// Returns the number of tasks moved.
    pub fn roll_over_tasks(&self, owner: &OwnerId, today: NaiveDate) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let today = today.to_string();
        let rows = conn.execute(
            "UPDATE tasks SET due_date = ?1, updated_at = ?2 \
             WHERE owner_id = ?3 AND completed = 0 AND due_date < ?1",
            params![today, now_epoch_millis(), owner.as_str()],
        )?;
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    pub fn create_document(
        &self,
        owner: &OwnerId,
        new: &NewDocument,
    ) -> Result<Document, StoreError> {
        let title = validated_title(&new.title)?;
        let conn = self.lock()?;
        let now = now_epoch_millis();
        let id = EntityId::generate();

        conn.execute(
            "INSERT INTO documents (id, owner_id, title, content, drawing, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6)",
            params![id.as_str(), owner.as_str(), title, new.content, now, now],
        )?;

        query_document(&conn, owner, &id)
    }

    pub fn get_document(&self, owner: &OwnerId, id: &EntityId) -> Result<Document, StoreError> {
        let conn = self.lock()?;
        query_document(&conn, owner, id)
    }

    /// All documents of `owner`, most recently updated first.
    pub fn list_documents(&self, owner: &OwnerId) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE owner_id = ?1 \
             ORDER BY updated_at DESC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner.as_str()], row_to_document)?;
        collect_rows(rows)
    }

    pub fn update_document(
        &self,
        owner: &OwnerId,
        id: &EntityId,
        patch: &DocumentPatch,
    ) -> Result<Document, StoreError> {
        let title = patch.title.as_deref().map(validated_title).transpose()?;
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE documents SET title = COALESCE(?1, title), content = COALESCE(?2, content), \
             updated_at = ?3 WHERE id = ?4 AND owner_id = ?5",
            params![
                title,
                patch.content,
                now_epoch_millis(),
                id.as_str(),
                owner.as_str()
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        query_document(&conn, owner, id)
    }

    pub fn delete_document(&self, owner: &OwnerId, id: &EntityId) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM documents WHERE id = ?1 AND owner_id = ?2",
            params![id.as_str(), owner.as_str()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Drawing field
    // -----------------------------------------------------------------------

    /// Stored drawing snapshot of an entity owned by `owner`.
    pub fn read_drawing(
        &self,
        owner: &OwnerId,
        target: &DrawingTarget,
    ) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT drawing FROM {} WHERE id = ?1 AND owner_id = ?2",
            table_name(target.kind)
        );
        let drawing: Option<Option<String>> = conn
            .query_row(&sql, params![target.id.as_str(), owner.as_str()], |row| {
                row.get(0)
            })
            .optional()?;
        drawing.ok_or_else(|| StoreError::NotFound(target.id.to_string()))
    }

    /// Replace the drawing snapshot of an entity owned by `owner`.
    ///
    /// Documents also get `updated_at` touched; tasks keep theirs.
    pub fn write_drawing(
        &self,
        owner: &OwnerId,
        target: &DrawingTarget,
        snapshot: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows = match target.kind {
            EntityKind::Task => conn.execute(
                "UPDATE tasks SET drawing = ?1 WHERE id = ?2 AND owner_id = ?3",
                params![snapshot, target.id.as_str(), owner.as_str()],
            )?,
            EntityKind::Document => conn.execute(
                "UPDATE documents SET drawing = ?1, updated_at = ?2 \
                 WHERE id = ?3 AND owner_id = ?4",
                params![
                    snapshot,
                    now_epoch_millis(),
                    target.id.as_str(),
                    owner.as_str()
                ],
            )?,
        };
        if rows == 0 {
            return Err(StoreError::NotFound(target.id.to_string()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from the SQLite entity store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    /// Missing, or owned by someone else.
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("lock poisoned: {0}")]
    Lock(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Task => "tasks",
        EntityKind::Document => "documents",
    }
}

fn validated_title(raw: &str) -> Result<String, StoreError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(StoreError::InvalidInput("title must not be empty".to_owned()));
    }
    Ok(title.to_owned())
}

fn query_task(conn: &Connection, owner: &OwnerId, id: &EntityId) -> Result<Task, StoreError> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner_id = ?2");
    conn.query_row(&sql, params![id.as_str(), owner.as_str()], row_to_task)
        .optional()?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

fn query_document(
    conn: &Connection,
    owner: &OwnerId,
    id: &EntityId,
) -> Result<Document, StoreError> {
    let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1 AND owner_id = ?2");
    conn.query_row(&sql, params![id.as_str(), owner.as_str()], row_to_document)
        .optional()?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, StoreError> {
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn row_to_owner(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<OwnerId> {
    let raw: String = row.get(idx)?;
    OwnerId::new(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let id: String = row.get(0)?;
    let due_raw: String = row.get(4)?;
    let due_date = due_raw.parse::<NaiveDate>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Task {
        id: EntityId::from(id),
        owner_id: row_to_owner(row, 1)?,
        title: row.get(2)?,
        notes: row.get(3)?,
        due_date,
        completed: row.get(5)?,
        drawing: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let id: String = row.get(0)?;
    Ok(Document {
        id: EntityId::from(id),
        owner_id: row_to_owner(row, 1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        drawing: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn owner(name: &str) -> OwnerId {
        OwnerId::new(name).expect("owner")
    }

    fn date(raw: &str) -> NaiveDate {
        raw.parse().expect("date")
    }

    fn new_task(title: &str, due: &str) -> NewTask {
        NewTask {
            title: title.to_owned(),
            notes: String::new(),
            due_date: date(due),
        }
    }

    fn test_store() -> (tempfile::TempDir, SqliteEntityStore) {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let store = SqliteEntityStore::new(dir.path()).expect("create store");
        (dir, store)
    }

    #[test]
    fn creates_database_file() {
        let (dir, store) = test_store();
        assert!(dir.path().join(DB_FILENAME).exists());
        assert_eq!(store.root(), Some(dir.path()));
        assert_eq!(store.schema_version().expect("version"), Some(1));
    }

    #[test]
    fn task_starts_without_drawing() {
        let (_dir, store) = test_store();
        let alice = owner("alice");
        let task = store
            .create_task(&alice, &new_task("  Buy milk ", "2026-10-14"))
            .expect("create");

        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.owner_id, alice);
        assert!(task.drawing.is_none());
        assert!(!task.completed);

        let target = DrawingTarget::task(task.id.clone());
        assert_eq!(store.read_drawing(&alice, &target).expect("read"), None);
    }

    #[test]
    fn blank_title_is_rejected() {
        let (_dir, store) = test_store();
        let err = store
            .create_task(&owner("alice"), &new_task("   ", "2026-10-14"))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn foreign_task_reads_as_missing() {
        let (_dir, store) = test_store();
        let task = store
            .create_task(&owner("alice"), &new_task("private", "2026-10-14"))
            .expect("create");

        let err = store.get_task(&owner("bob"), &task.id).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.list_tasks(&owner("bob")).expect("list").is_empty());
    }

    #[test]
    fn update_task_patches_only_given_fields() {
        let (_dir, store) = test_store();
        let alice = owner("alice");
        let task = store
            .create_task(&alice, &new_task("draft", "2026-10-14"))
            .expect("create");

        let patch = TaskPatch {
            notes: Some("<p>call first</p>".to_owned()),
            ..TaskPatch::default()
        };
        let updated = store.update_task(&alice, &task.id, &patch).expect("update");
        assert_eq!(updated.title, "draft");
        assert_eq!(updated.notes, "<p>call first</p>");
        assert_eq!(updated.due_date, date("2026-10-14"));
    }

    #[test]
    fn update_task_keeps_drawing() {
        let (_dir, store) = test_store();
        let alice = owner("alice");
        let task = store
            .create_task(&alice, &new_task("sketch", "2026-10-14"))
            .expect("create");
        let target = DrawingTarget::task(task.id.clone());
        store
            .write_drawing(&alice, &target, "{\"version\":1,\"strokes\":[]}")
            .expect("write");

        let patch = TaskPatch {
            title: Some("renamed".to_owned()),
            ..TaskPatch::default()
        };
        let updated = store.update_task(&alice, &task.id, &patch).expect("update");
        assert_eq!(
            updated.drawing.as_deref(),
            Some("{\"version\":1,\"strokes\":[]}")
        );
    }

    #[test]
    fn list_tasks_due_filters_by_date() {
        let (_dir, store) = test_store();
        let alice = owner("alice");
        store
            .create_task(&alice, &new_task("today", "2026-10-14"))
            .expect("create");
        store
            .create_task(&alice, &new_task("tomorrow", "2026-10-15"))
            .expect("create");

        let due = store
            .list_tasks_due(&alice, date("2026-10-14"))
            .expect("list");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "today");
    }

    #[test]
    fn roll_over_moves_only_incomplete_past_tasks() {
        let (_dir, store) = test_store();
        let alice = owner("alice");
        let late = store
            .create_task(&alice, &new_task("late", "2026-10-10"))
            .expect("create");
        let done = store
            .create_task(&alice, &new_task("done", "2026-10-11"))
            .expect("create");
        store
            .set_task_completed(&alice, &done.id, true)
            .expect("complete");
        store
            .create_task(&alice, &new_task("future", "2026-10-20"))
            .expect("create");
        let bobs = store
            .create_task(&owner("bob"), &new_task("bob late", "2026-10-01"))
            .expect("create");

        let moved = store
            .roll_over_tasks(&alice, date("2026-10-14"))
            .expect("rollover");
        assert_eq!(moved, 1);

        let late = store.get_task(&alice, &late.id).expect("get");
        assert_eq!(late.due_date, date("2026-10-14"));
        let done = store.get_task(&alice, &done.id).expect("get");
        assert_eq!(done.due_date, date("2026-10-11"));
        let bobs = store.get_task(&owner("bob"), &bobs.id).expect("get");
        assert_eq!(bobs.due_date, date("2026-10-01"));
    }

    #[test]
    fn delete_task_is_owner_scoped() {
        let (_dir, store) = test_store();
        let alice = owner("alice");
        let task = store
            .create_task(&alice, &new_task("mine", "2026-10-14"))
            .expect("create");

        assert!(store.delete_task(&owner("bob"), &task.id).is_err());
        store.delete_task(&alice, &task.id).expect("delete");
        assert!(matches!(
            store.get_task(&alice, &task.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn document_drawing_write_touches_updated_at() {
        let (_dir, store) = test_store();
        let alice = owner("alice");
        let doc = store
            .create_document(
                &alice,
                &NewDocument {
                    title: "Notes".to_owned(),
                    content: "<h1>hi</h1>".to_owned(),
                },
            )
            .expect("create");

        // Backdate so the touch is observable.
        {
            let conn = store.lock().expect("lock");
            conn.execute(
                "UPDATE documents SET updated_at = 1 WHERE id = ?1",
                params![doc.id.as_str()],
            )
            .expect("backdate");
        }

        let target = DrawingTarget::document(doc.id.clone());
        store.write_drawing(&alice, &target, "snap").expect("write");

        let reloaded = store.get_document(&alice, &doc.id).expect("get");
        assert_eq!(reloaded.drawing.as_deref(), Some("snap"));
        assert!(reloaded.updated_at > 1);
        assert_eq!(reloaded.content, "<h1>hi</h1>");
    }

    #[test]
    fn task_drawing_write_keeps_updated_at() {
        let (_dir, store) = test_store();
        let alice = owner("alice");
        let task = store
            .create_task(&alice, &new_task("t", "2026-10-14"))
            .expect("create");
        let target = DrawingTarget::task(task.id.clone());
        store.write_drawing(&alice, &target, "snap").expect("write");

        let reloaded = store.get_task(&alice, &task.id).expect("get");
        assert_eq!(reloaded.updated_at, task.updated_at);
        assert_eq!(reloaded.drawing.as_deref(), Some("snap"));
    }

    #[test]
    fn foreign_drawing_write_is_rejected_and_leaves_value() {
        let (_dir, store) = test_store();
        let alice = owner("alice");
        let task = store
            .create_task(&alice, &new_task("t", "2026-10-14"))
            .expect("create");
        let target = DrawingTarget::task(task.id.clone());
        store.write_drawing(&alice, &target, "original").expect("write");

        let err = store
            .write_drawing(&owner("bob"), &target, "hijack")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(
            store.read_drawing(&alice, &target).expect("read").as_deref(),
            Some("original")
        );
    }

    #[test]
    fn drawing_write_to_missing_entity_fails() {
        let (_dir, store) = test_store();
        let target = DrawingTarget::document(EntityId::from("nope"));
        assert!(matches!(
            store.write_drawing(&owner("alice"), &target, "x"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.read_drawing(&owner("alice"), &target),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn documents_list_most_recent_first() {
        let store = SqliteEntityStore::open_in_memory().expect("store");
        let alice = owner("alice");
        let first = store
            .create_document(
                &alice,
                &NewDocument {
                    title: "first".to_owned(),
                    content: String::new(),
                },
            )
            .expect("create");
        let second = store
            .create_document(
                &alice,
                &NewDocument {
                    title: "second".to_owned(),
                    content: String::new(),
                },
            )
            .expect("create");
        {
            let conn = store.lock().expect("lock");
            conn.execute(
                "UPDATE documents SET updated_at = 10 WHERE id = ?1",
                params![first.id.as_str()],
            )
            .expect("backdate");
            conn.execute(
                "UPDATE documents SET updated_at = 20 WHERE id = ?1",
                params![second.id.as_str()],
            )
            .expect("backdate");
        }

        let listed = store.list_documents(&alice).expect("list");
        let titles: Vec<&str> = listed.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[test]
    fn concurrent_drawing_writes_keep_one_value() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let store = std::sync::Arc::new(SqliteEntityStore::new(dir.path()).expect("store"));
        let alice = owner("alice");
        let task = store
            .create_task(&alice, &new_task("t", "2026-10-14"))
            .expect("create");
        let target = DrawingTarget::task(task.id.clone());

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = std::sync::Arc::clone(&store);
            let alice = alice.clone();
            let target = target.clone();
            handles.push(std::thread::spawn(move || {
                store
                    .write_drawing(&alice, &target, &format!("snapshot-{i}"))
                    .expect("write");
            }));
        }
        for h in handles {
            h.join().expect("thread join");
        }

        let stored = store.read_drawing(&alice, &target).expect("read");
        let stored = stored.expect("some snapshot");
        assert!(stored.starts_with("snapshot-"));
    }
}
