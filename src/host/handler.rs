//! Workspace-backed command router.
//!
//! Every command resolves the owner through the workspace, so a bridge
//! without an identity rejects everything except `host.*`. Open drawings are
//! keyed by target; at most one autosave session exists per entity.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::autosave::{AutosaveEvent, AutosaveHandle};
use crate::drawing::{DrawingEditor, Point, SharedEditor, Sketch, Stroke, check_stroke, shared};
use crate::error::{PlaninkError, Result};
use crate::host::contract::{CommandEnvelope, CommandName, EVENT_VERSION, ResponseEnvelope};
use crate::store::{
    DocumentPatch, DrawingTarget, EntityId, EntityKind, NewDocument, NewTask, TaskPatch,
};
use crate::workspace::Workspace;

struct OpenDrawing {
    editor: SharedEditor<Sketch>,
    session: AutosaveHandle,
}

/// Routes host commands onto a [`Workspace`].
pub struct CommandRouter {
    workspace: Workspace,
    drawings: HashMap<DrawingTarget, OpenDrawing>,
    autosave_tx: mpsc::UnboundedSender<AutosaveEvent>,
}

impl CommandRouter {
    /// Autosave outcomes of every drawing opened through this router are
    /// sent on `autosave_tx`.
    pub fn new(workspace: Workspace, autosave_tx: mpsc::UnboundedSender<AutosaveEvent>) -> Self {
        Self {
            workspace,
            drawings: HashMap::new(),
            autosave_tx,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn open_drawings(&self) -> usize {
        self.drawings.len()
    }

    /// Route a command envelope to the appropriate handler.
    pub async fn route(&mut self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let payload = &envelope.payload;
        let command = envelope.command.as_str();
        let body = match envelope.command {
            CommandName::HostPing => serde_json::json!({"pong": true}),
            CommandName::HostVersion => serde_json::json!({
                "contract_version": EVENT_VERSION,
                "package_version": env!("CARGO_PKG_VERSION"),
            }),

            CommandName::TaskCreate => {
                let new: NewTask = parse_body(payload, command)?;
                serde_json::json!({"task": to_payload(&self.workspace.create_task(&new)?)?})
            }
            CommandName::TaskGet => {
                let id = parse_id(payload, command)?;
                serde_json::json!({"task": to_payload(&self.workspace.get_task(&id)?)?})
            }
            CommandName::TaskList => {
                let tasks = match parse_optional_date(payload, "due_date", command)? {
                    Some(date) => self.workspace.list_tasks_due(date)?,
                    None => self.workspace.list_tasks()?,
                };
                serde_json::json!({"tasks": to_payload(&tasks)?})
            }
            CommandName::TaskUpdate => {
                let id = parse_id(payload, command)?;
                let patch: TaskPatch = parse_patch(payload, command)?;
                serde_json::json!({"task": to_payload(&self.workspace.update_task(&id, &patch)?)?})
            }
            CommandName::TaskComplete => {
                let id = parse_id(payload, command)?;
                let completed = parse_optional_bool(payload, "completed", command)?.unwrap_or(true);
                let task = self.workspace.set_task_completed(&id, completed)?;
                serde_json::json!({"task": to_payload(&task)?})
            }
            CommandName::TaskDelete => {
                let id = parse_id(payload, command)?;
                self.close_drawing_if_open(&DrawingTarget::task(id.clone()))
                    .await?;
                self.workspace.delete_task(&id)?;
                serde_json::json!({"deleted": true, "id": id})
            }
            CommandName::TaskRollover => {
                let today = parse_optional_date(payload, "today", command)?
                    .unwrap_or_else(|| Local::now().date_naive());
                let moved = self.workspace.roll_over_tasks(today)?;
                serde_json::json!({"moved": moved, "today": today.to_string()})
            }

            CommandName::DocumentCreate => {
                let new: NewDocument = parse_body(payload, command)?;
                let document = self.workspace.create_document(&new)?;
                serde_json::json!({"document": to_payload(&document)?})
            }
            CommandName::DocumentGet => {
                let id = parse_id(payload, command)?;
                serde_json::json!({"document": to_payload(&self.workspace.get_document(&id)?)?})
            }
            CommandName::DocumentList => {
                serde_json::json!({"documents": to_payload(&self.workspace.list_documents()?)?})
            }
            CommandName::DocumentUpdate => {
                let id = parse_id(payload, command)?;
                let patch: DocumentPatch = parse_patch(payload, command)?;
                let document = self.workspace.update_document(&id, &patch)?;
                serde_json::json!({"document": to_payload(&document)?})
            }
            CommandName::DocumentDelete => {
                let id = parse_id(payload, command)?;
                self.close_drawing_if_open(&DrawingTarget::document(id.clone()))
                    .await?;
                self.workspace.delete_document(&id)?;
                serde_json::json!({"deleted": true, "id": id})
            }

            CommandName::DrawingOpen => self.handle_drawing_open(payload, command)?,
            CommandName::DrawingStroke => self.handle_drawing_stroke(payload, command)?,
            CommandName::DrawingUndo => {
                let target = parse_target(payload, command)?;
                let count = self.edit_drawing(&target, |sketch| {
                    sketch.undo();
                })?;
                serde_json::json!({"target": target.to_string(), "strokes": count})
            }
            CommandName::DrawingClear => {
                let target = parse_target(payload, command)?;
                let count = self.edit_drawing(&target, DrawingEditor::clear)?;
                serde_json::json!({"target": target.to_string(), "strokes": count})
            }
            CommandName::DrawingBlur => {
                let target = parse_target(payload, command)?;
                self.open_drawing(&target)?.session.notify_blur()?;
                serde_json::json!({"target": target.to_string(), "accepted": true})
            }
            CommandName::DrawingClose => {
                let target = parse_target(payload, command)?;
                if !self.close_drawing_if_open(&target).await? {
                    return Err(not_open(&target));
                }
                serde_json::json!({"target": target.to_string(), "closed": true})
            }
        };
        Ok(ResponseEnvelope::ok(envelope.request_id.clone(), body))
    }

    fn handle_drawing_open(
        &mut self,
        payload: &serde_json::Value,
        command: &str,
    ) -> Result<serde_json::Value> {
        let target = parse_target(payload, command)?;
        if self.drawings.contains_key(&target) {
            return Err(PlaninkError::Protocol(format!(
                "drawing for {target} is already open"
            )));
        }

        let editor = shared(Sketch::new());
        let events = Some(self.autosave_tx.clone());
        let (entity, hydration, session) = match target.kind {
            EntityKind::Task => {
                let view =
                    self.workspace
                        .open_task_view(&target.id, Arc::clone(&editor), events)?;
                (to_payload(&view.entity)?, view.hydration, view.session)
            }
            EntityKind::Document => {
                let view = self.workspace.open_document_view(
                    &target.id,
                    Arc::clone(&editor),
                    events,
                )?;
                (to_payload(&view.entity)?, view.hydration, view.session)
            }
        };
        let strokes = stroke_count(&editor)?;
        info!(entity = %target, ?hydration, "drawing opened");
        self.drawings
            .insert(target.clone(), OpenDrawing { editor, session });

        Ok(serde_json::json!({
            "target": target.to_string(),
            "hydration": hydration,
            "strokes": strokes,
            "entity": entity,
        }))
    }

    fn handle_drawing_stroke(
        &mut self,
        payload: &serde_json::Value,
        command: &str,
    ) -> Result<serde_json::Value> {
        let target = parse_target(payload, command)?;
        let stroke = parse_stroke(payload, command)?;
        // A stroke the codec cannot encode would fail every later save.
        check_stroke(&stroke)?;
        let count = self.edit_drawing(&target, move |sketch| sketch.add_stroke(stroke))?;
        Ok(serde_json::json!({"target": target.to_string(), "strokes": count}))
    }

    /// Apply `edit` to an open sketch and report the change to its session.
    fn edit_drawing<F>(&mut self, target: &DrawingTarget, edit: F) -> Result<usize>
    where
        F: FnOnce(&mut Sketch),
    {
        let drawing = self.open_drawing(target)?;
        let count = {
            let mut sketch = drawing
                .editor
                .lock()
                .map_err(|e| PlaninkError::Channel(format!("sketch lock poisoned: {e}")))?;
            edit(&mut sketch);
            sketch.stroke_count()
        };
        drawing.session.notify_change()?;
        Ok(count)
    }

    fn open_drawing(&self, target: &DrawingTarget) -> Result<&OpenDrawing> {
        self.drawings.get(target).ok_or_else(|| not_open(target))
    }

    async fn close_drawing_if_open(&mut self, target: &DrawingTarget) -> Result<bool> {
        let Some(drawing) = self.drawings.remove(target) else {
            return Ok(false);
        };
        drawing.session.close().await?;
        info!(entity = %target, "drawing closed");
        Ok(true)
    }

    /// Close every open drawing; each runs its final save.
    pub async fn close_all(&mut self) {
        let targets: Vec<DrawingTarget> = self.drawings.keys().cloned().collect();
        for target in targets {
            if let Err(e) = self.close_drawing_if_open(&target).await {
                warn!(entity = %target, error = %e, "failed to close drawing");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Payload parsing
// ---------------------------------------------------------------------------

fn not_open(target: &DrawingTarget) -> PlaninkError {
    PlaninkError::Protocol(format!("no open drawing for {target}"))
}

fn stroke_count(editor: &SharedEditor<Sketch>) -> Result<usize> {
    editor
        .lock()
        .map(|sketch| sketch.stroke_count())
        .map_err(|e| PlaninkError::Channel(format!("sketch lock poisoned: {e}")))
}

fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| PlaninkError::Protocol(format!("failed to encode response: {e}")))
}

fn parse_body<T: DeserializeOwned>(payload: &serde_json::Value, command: &str) -> Result<T> {
    serde_json::from_value(payload.clone())
        .map_err(|e| PlaninkError::Protocol(format!("{command} payload is invalid: {e}")))
}

fn parse_patch<T: DeserializeOwned + Default>(
    payload: &serde_json::Value,
    command: &str,
) -> Result<T> {
    match payload.get("patch") {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(patch) => serde_json::from_value(patch.clone()).map_err(|e| {
            PlaninkError::Protocol(format!("{command} payload.patch is invalid: {e}"))
        }),
    }
}

fn parse_non_empty_field(
    payload: &serde_json::Value,
    field: &str,
    command: &str,
) -> Result<String> {
    let Some(raw) = payload.get(field).and_then(serde_json::Value::as_str) else {
        return Err(PlaninkError::Protocol(format!(
            "{command} requires payload.{field}"
        )));
    };
    let value = raw.trim();
    if value.is_empty() {
        return Err(PlaninkError::Protocol(format!(
            "{command} requires a non-empty payload.{field}"
        )));
    }
    Ok(value.to_owned())
}

fn parse_id(payload: &serde_json::Value, command: &str) -> Result<EntityId> {
    parse_non_empty_field(payload, "id", command).map(EntityId::from)
}

fn parse_target(payload: &serde_json::Value, command: &str) -> Result<DrawingTarget> {
    let raw_kind = parse_non_empty_field(payload, "kind", command)?;
    let kind = EntityKind::parse(&raw_kind).ok_or_else(|| {
        PlaninkError::Protocol(format!(
            "unsupported entity kind `{raw_kind}` (expected task/document)"
        ))
    })?;
    let id = parse_id(payload, command)?;
    Ok(DrawingTarget { kind, id })
}

fn parse_optional_date(
    payload: &serde_json::Value,
    field: &str,
    command: &str,
) -> Result<Option<NaiveDate>> {
    match payload.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(raw)) => raw.trim().parse().map(Some).map_err(|e| {
            PlaninkError::Protocol(format!(
                "{command} payload.{field} must be a YYYY-MM-DD date: {e}"
            ))
        }),
        Some(_) => Err(PlaninkError::Protocol(format!(
            "{command} payload.{field} must be a string when provided"
        ))),
    }
}

fn parse_optional_bool(
    payload: &serde_json::Value,
    field: &str,
    command: &str,
) -> Result<Option<bool>> {
    match payload.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(PlaninkError::Protocol(format!(
            "{command} payload.{field} must be a boolean when provided"
        ))),
    }
}

fn parse_stroke(payload: &serde_json::Value, command: &str) -> Result<Stroke> {
    let color = payload
        .get("color")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("#000000")
        .to_owned();
    let width = match payload.get("width") {
        None | Some(serde_json::Value::Null) => 2.0,
        Some(value) => value.as_f64().ok_or_else(|| {
            PlaninkError::Protocol(format!("{command} payload.width must be a number"))
        })? as f32,
    };
    let Some(raw_points) = payload.get("points").and_then(serde_json::Value::as_array) else {
        return Err(PlaninkError::Protocol(format!(
            "{command} requires payload.points"
        )));
    };

    let mut points = Vec::with_capacity(raw_points.len());
    for raw in raw_points {
        let pair = raw.as_array().filter(|pair| pair.len() == 2);
        let xy = pair.and_then(|pair| Some((pair[0].as_f64()?, pair[1].as_f64()?)));
        let Some((x, y)) = xy else {
            return Err(PlaninkError::Protocol(format!(
                "{command} payload.points entries must be [x, y] pairs"
            )));
        };
        points.push(Point::new(x as f32, y as f32));
    }
    Ok(Stroke {
        color,
        width,
        points,
    })
}
