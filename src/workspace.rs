//! Owner-scoped workspace: entity CRUD plus drawing views with autosave.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::auth::IdentityProvider;
use crate::autosave::{
    AutosaveEvent, AutosaveHandle, AutosaveSession, Hydration, OwnerScopedGateway, SnapshotGateway,
};
use crate::config::PlaninkConfig;
use crate::drawing::{DrawingEditor, SharedEditor};
use crate::error::Result;
use crate::store::{
    Document, DocumentPatch, DrawingTarget, EntityId, NewDocument, NewTask, SqliteEntityStore,
    Task, TaskPatch,
};

/// An entity opened for editing with its drawing bound to an autosave
/// session.
pub struct DrawingView<T> {
    /// Entity fields as loaded, including the stored drawing.
    pub entity: T,
    /// What happened when the editor was hydrated.
    pub hydration: Hydration,
    pub session: AutosaveHandle,
}

/// Entry point for everything the signed-in owner can do.
pub struct Workspace {
    store: Arc<SqliteEntityStore>,
    identity: Arc<dyn IdentityProvider>,
    config: PlaninkConfig,
    shutdown: CancellationToken,
}

impl Workspace {
    pub fn new(
        store: Arc<SqliteEntityStore>,
        identity: Arc<dyn IdentityProvider>,
        config: PlaninkConfig,
    ) -> Self {
        Self {
            store,
            identity,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Validate `config` and open the store under `config.store.root_dir`.
    pub fn open(config: PlaninkConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        config.validate()?;
        let store = SqliteEntityStore::new(&config.store.root_dir)?;
        info!(root = %config.store.root_dir.display(), "workspace opened");
        Ok(Self::new(Arc::new(store), identity, config))
    }

    pub fn store(&self) -> &Arc<SqliteEntityStore> {
        &self.store
    }

    pub fn config(&self) -> &PlaninkConfig {
        &self.config
    }

    /// Gateway for drawing writes, resolving the owner on every write.
    pub fn gateway(&self) -> Arc<dyn SnapshotGateway> {
        Arc::new(OwnerScopedGateway::new(
            Arc::clone(&self.store),
            Arc::clone(&self.identity),
        ))
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn create_task(&self, new: &NewTask) -> Result<Task> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.create_task(&owner, new)?)
    }

    pub fn get_task(&self, id: &EntityId) -> Result<Task> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.get_task(&owner, id)?)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.list_tasks(&owner)?)
    }

    pub fn list_tasks_due(&self, date: NaiveDate) -> Result<Vec<Task>> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.list_tasks_due(&owner, date)?)
    }

    pub fn update_task(&self, id: &EntityId, patch: &TaskPatch) -> Result<Task> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.update_task(&owner, id, patch)?)
    }

    pub fn set_task_completed(&self, id: &EntityId, completed: bool) -> Result<Task> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.set_task_completed(&owner, id, completed)?)
    }

    pub fn delete_task(&self, id: &EntityId) -> Result<()> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.delete_task(&owner, id)?)
    }

    /// Move overdue incomplete tasks onto `today`.
    pub fn roll_over_tasks(&self, today: NaiveDate) -> Result<usize> {
        let owner = self.identity.require_owner()?;
        let moved = self.store.roll_over_tasks(&owner, today)?;
        if moved > 0 {
            info!(moved, %today, "rolled over overdue tasks");
        }
        Ok(moved)
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    pub fn create_document(&self, new: &NewDocument) -> Result<Document> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.create_document(&owner, new)?)
    }

    pub fn get_document(&self, id: &EntityId) -> Result<Document> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.get_document(&owner, id)?)
    }

    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.list_documents(&owner)?)
    }

    pub fn update_document(&self, id: &EntityId, patch: &DocumentPatch) -> Result<Document> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.update_document(&owner, id, patch)?)
    }

    pub fn delete_document(&self, id: &EntityId) -> Result<()> {
        let owner = self.identity.require_owner()?;
        Ok(self.store.delete_document(&owner, id)?)
    }

    // -----------------------------------------------------------------------
    // Drawing views
    // -----------------------------------------------------------------------

    /// Load a task, hydrate `editor` from its drawing and start autosaving.
    ///
    /// A corrupt stored drawing leaves the editor empty; the task fields are
    /// still returned. Must be called inside a tokio runtime.
    pub fn open_task_view<E: DrawingEditor>(
        &self,
        id: &EntityId,
        editor: SharedEditor<E>,
        events: Option<mpsc::UnboundedSender<AutosaveEvent>>,
    ) -> Result<DrawingView<Task>> {
        let task = self.get_task(id)?;
        let target = DrawingTarget::task(task.id.clone());
        let session = self.start_session(target, task.drawing.as_deref(), editor, events);
        Ok(into_view(task, session))
    }

    /// Document counterpart of [`open_task_view`](Self::open_task_view).
    pub fn open_document_view<E: DrawingEditor>(
        &self,
        id: &EntityId,
        editor: SharedEditor<E>,
        events: Option<mpsc::UnboundedSender<AutosaveEvent>>,
    ) -> Result<DrawingView<Document>> {
        let document = self.get_document(id)?;
        let target = DrawingTarget::document(document.id.clone());
        let session = self.start_session(target, document.drawing.as_deref(), editor, events);
        Ok(into_view(document, session))
    }

    fn start_session<E: DrawingEditor>(
        &self,
        target: DrawingTarget,
        stored: Option<&str>,
        editor: SharedEditor<E>,
        events: Option<mpsc::UnboundedSender<AutosaveEvent>>,
    ) -> AutosaveHandle {
        let mut session = AutosaveSession::new(target, editor, self.gateway())
            .with_config(&self.config.autosave)
            .with_cancel(self.shutdown.child_token());
        if let Some(events) = events {
            session = session.with_events(events);
        }
        session.open_with_snapshot(stored)
    }

    /// Tear down every open autosave session. Each one still runs its final
    /// save.
    pub fn shutdown(&self) {
        info!("workspace shutting down autosave sessions");
        self.shutdown.cancel();
    }
}

fn into_view<T>(entity: T, session: AutosaveHandle) -> DrawingView<T> {
    let hydration = session
        .initial_hydration()
        .unwrap_or(Hydration::AlreadyLoaded);
    DrawingView {
        entity,
        hydration,
        session,
    }
}
