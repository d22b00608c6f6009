//! Snapshot codec for sketch strokes.
//!
//! Wire form is a versioned JSON object:
//! `{"version":1,"strokes":[{"color":"#000","width":2.0,"points":[{"x":0,"y":0}]}]}`.
//! Both directions validate geometry, so a snapshot that decodes always
//! re-encodes.

use serde::{Deserialize, Serialize};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A single sampled pen position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One freehand stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: String,
    pub width: f32,
    pub points: Vec<Point>,
}

/// Snapshot encode/decode failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("cannot serialize drawing: {0}")]
    Serialize(String),

    #[error("cannot parse drawing snapshot: {0}")]
    Deserialize(String),

    #[error("unsupported snapshot version {found}; expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
}

#[derive(Serialize)]
struct SnapshotOut<'a> {
    version: u32,
    strokes: &'a [Stroke],
}

#[derive(Deserialize)]
struct SnapshotIn {
    version: u32,
    #[serde(default)]
    strokes: Vec<Stroke>,
}

/// Encode strokes into a snapshot string.
///
/// # Errors
///
/// Fails on strokes with no points, a non-positive width, or non-finite
/// coordinates (JSON has no NaN).
pub fn encode(strokes: &[Stroke]) -> Result<String, CodecError> {
    for (index, stroke) in strokes.iter().enumerate() {
        stroke_defect(stroke)
            .map_err(|reason| CodecError::Serialize(format!("stroke {index} {reason}")))?;
    }
    serde_json::to_string(&SnapshotOut {
        version: SNAPSHOT_VERSION,
        strokes,
    })
    .map_err(|e| CodecError::Serialize(e.to_string()))
}

/// Decode a snapshot string into strokes.
pub fn decode(raw: &str) -> Result<Vec<Stroke>, CodecError> {
    let snapshot: SnapshotIn =
        serde_json::from_str(raw).map_err(|e| CodecError::Deserialize(e.to_string()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    for (index, stroke) in snapshot.strokes.iter().enumerate() {
        stroke_defect(stroke)
            .map_err(|reason| CodecError::Deserialize(format!("stroke {index} {reason}")))?;
    }
    Ok(snapshot.strokes)
}

/// Check a single stroke before it enters an editor.
///
/// Accepts exactly the strokes [`encode`] accepts.
pub fn check_stroke(stroke: &Stroke) -> Result<(), CodecError> {
    stroke_defect(stroke).map_err(|reason| CodecError::Serialize(format!("stroke {reason}")))
}

fn stroke_defect(stroke: &Stroke) -> Result<(), String> {
    if stroke.points.is_empty() {
        return Err("has no points".to_owned());
    }
    if !stroke.width.is_finite() || stroke.width <= 0.0 {
        return Err(format!("has invalid width {}", stroke.width));
    }
    if stroke
        .points
        .iter()
        .any(|p| !p.x.is_finite() || !p.y.is_finite())
    {
        return Err("has a non-finite point".to_owned());
    }
    Ok(())
}
