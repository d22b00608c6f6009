//! Drawing overlay: editor seam, built-in sketch editor and snapshot codec.

pub mod codec;
pub mod editor;

pub use codec::{CodecError, Point, SNAPSHOT_VERSION, Stroke, check_stroke};
pub use editor::{DrawingEditor, SharedEditor, Sketch, shared};
