//! Text model behind the headless editor widget.
//!
//! A rope-backed buffer with a caret and undo history, enough to stand in
//! for the real editor's model when no browser is present.

mod buffer;

pub use buffer::{Cursor, Direction, EditorBuffer};
