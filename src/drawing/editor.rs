//! Drawing editor seam and the built-in vector sketch editor.

use std::sync::{Arc, Mutex};

use super::codec::{self, CodecError, Point, Stroke};

/// The capabilities the autosave scheduler needs from a drawing surface.
///
/// Change and focus notifications do not go through this trait; the
/// surface reports them on the session's
/// [`AutosaveHandle`](crate::autosave::AutosaveHandle).
pub trait DrawingEditor: Send + 'static {
    /// Capture the full document state as a snapshot string.
    fn serialize(&self) -> Result<String, CodecError>;

    /// Replace the document state with a stored snapshot.
    ///
    /// On error the current state must be left untouched.
    fn load_snapshot(&mut self, raw: &str) -> Result<(), CodecError>;

    /// Reset to an empty drawing.
    fn clear(&mut self);
}

/// An editor shared between the surface (which mutates it) and the
/// autosave session (which serializes it).
pub type SharedEditor<E> = Arc<Mutex<E>>;

/// Wrap an editor for sharing with an autosave session.
pub fn shared<E: DrawingEditor>(editor: E) -> SharedEditor<E> {
    Arc::new(Mutex::new(editor))
}

/// Freehand vector sketch: an ordered list of strokes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sketch {
    strokes: Vec<Stroke>,
}

impl Sketch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Append a stroke. Geometry is validated only when serializing.
    pub fn add_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Convenience for a stroke from raw `(x, y)` pairs.
    pub fn draw(&mut self, color: impl Into<String>, width: f32, points: &[(f32, f32)]) {
        self.add_stroke(Stroke {
            color: color.into(),
            width,
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        });
    }

    /// Remove the most recent stroke.
    pub fn undo(&mut self) -> Option<Stroke> {
        self.strokes.pop()
    }
}

impl DrawingEditor for Sketch {
    fn serialize(&self) -> Result<String, CodecError> {
        codec::encode(&self.strokes)
    }

    fn load_snapshot(&mut self, raw: &str) -> Result<(), CodecError> {
        self.strokes = codec::decode(raw)?;
        Ok(())
    }

    fn clear(&mut self) {
        self.strokes.clear();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn serialize_then_load_is_equivalent() {
        let mut sketch = Sketch::new();
        sketch.draw("#f00", 3.0, &[(1.0, 1.0), (2.0, 5.0)]);
        sketch.draw("#00f", 1.5, &[(4.0, 4.0)]);

        let raw = sketch.serialize().expect("serialize");
        let mut restored = Sketch::new();
        restored.load_snapshot(&raw).expect("load");
        assert_eq!(restored, sketch);
    }

    #[test]
    fn failed_load_keeps_current_strokes() {
        let mut sketch = Sketch::new();
        sketch.draw("#000", 1.0, &[(0.0, 0.0)]);

        assert!(sketch.load_snapshot("{broken").is_err());
        assert_eq!(sketch.stroke_count(), 1);
    }

    #[test]
    fn malformed_stroke_fails_serialization() {
        let mut sketch = Sketch::new();
        sketch.draw("#000", 1.0, &[]);
        assert!(matches!(sketch.serialize(), Err(CodecError::Serialize(_))));

        sketch.undo();
        assert!(sketch.serialize().is_ok());
    }

    #[test]
    fn clear_empties_sketch() {
        let mut sketch = Sketch::new();
        sketch.draw("#000", 1.0, &[(0.0, 0.0)]);
        sketch.clear();
        assert!(sketch.is_empty());
    }
}
