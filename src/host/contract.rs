//! Versioned host command/event envelopes for the planner front end.

use serde::{Deserialize, Serialize};

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// V1 command set for host integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "host.ping")]
    HostPing,
    #[serde(rename = "host.version")]
    HostVersion,
    #[serde(rename = "task.create")]
    TaskCreate,
    #[serde(rename = "task.get")]
    TaskGet,
    #[serde(rename = "task.list")]
    TaskList,
    #[serde(rename = "task.update")]
    TaskUpdate,
    #[serde(rename = "task.complete")]
    TaskComplete,
    #[serde(rename = "task.delete")]
    TaskDelete,
    #[serde(rename = "task.rollover")]
    TaskRollover,
    #[serde(rename = "document.create")]
    DocumentCreate,
    #[serde(rename = "document.get")]
    DocumentGet,
    #[serde(rename = "document.list")]
    DocumentList,
    #[serde(rename = "document.update")]
    DocumentUpdate,
    #[serde(rename = "document.delete")]
    DocumentDelete,
    #[serde(rename = "drawing.open")]
    DrawingOpen,
    #[serde(rename = "drawing.stroke")]
    DrawingStroke,
    #[serde(rename = "drawing.undo")]
    DrawingUndo,
    #[serde(rename = "drawing.clear")]
    DrawingClear,
    #[serde(rename = "drawing.blur")]
    DrawingBlur,
    #[serde(rename = "drawing.close")]
    DrawingClose,
}

impl CommandName {
    /// Every command, in wire order.
    pub const ALL: &'static [Self] = &[
        Self::HostPing,
        Self::HostVersion,
        Self::TaskCreate,
        Self::TaskGet,
        Self::TaskList,
        Self::TaskUpdate,
        Self::TaskComplete,
        Self::TaskDelete,
        Self::TaskRollover,
        Self::DocumentCreate,
        Self::DocumentGet,
        Self::DocumentList,
        Self::DocumentUpdate,
        Self::DocumentDelete,
        Self::DrawingOpen,
        Self::DrawingStroke,
        Self::DrawingUndo,
        Self::DrawingClear,
        Self::DrawingBlur,
        Self::DrawingClose,
    ];

    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostPing => "host.ping",
            Self::HostVersion => "host.version",
            Self::TaskCreate => "task.create",
            Self::TaskGet => "task.get",
            Self::TaskList => "task.list",
            Self::TaskUpdate => "task.update",
            Self::TaskComplete => "task.complete",
            Self::TaskDelete => "task.delete",
            Self::TaskRollover => "task.rollover",
            Self::DocumentCreate => "document.create",
            Self::DocumentGet => "document.get",
            Self::DocumentList => "document.list",
            Self::DocumentUpdate => "document.update",
            Self::DocumentDelete => "document.delete",
            Self::DrawingOpen => "drawing.open",
            Self::DrawingStroke => "drawing.stroke",
            Self::DrawingUndo => "drawing.undo",
            Self::DrawingClear => "drawing.clear",
            Self::DrawingBlur => "drawing.blur",
            Self::DrawingClose => "drawing.close",
        }
    }

    /// Parse a command name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "host.ping" => Some(Self::HostPing),
            "host.version" => Some(Self::HostVersion),
            "task.create" => Some(Self::TaskCreate),
            "task.get" => Some(Self::TaskGet),
            "task.list" => Some(Self::TaskList),
            "task.update" => Some(Self::TaskUpdate),
            "task.complete" => Some(Self::TaskComplete),
            "task.delete" => Some(Self::TaskDelete),
            "task.rollover" => Some(Self::TaskRollover),
            "document.create" => Some(Self::DocumentCreate),
            "document.get" => Some(Self::DocumentGet),
            "document.list" => Some(Self::DocumentList),
            "document.update" => Some(Self::DocumentUpdate),
            "document.delete" => Some(Self::DocumentDelete),
            "drawing.open" => Some(Self::DrawingOpen),
            "drawing.stroke" => Some(Self::DrawingStroke),
            "drawing.undo" => Some(Self::DrawingUndo),
            "drawing.clear" => Some(Self::DrawingClear),
            "drawing.blur" => Some(Self::DrawingBlur),
            "drawing.close" => Some(Self::DrawingClose),
            _ => None,
        }
    }
}

/// A versioned response envelope from backend host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// A versioned command envelope from frontend -> backend host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    /// Build a v1 command envelope.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != EVENT_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, EVENT_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A versioned event envelope from backend host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ContractError {}
