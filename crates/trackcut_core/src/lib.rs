//! Timeline engine for a non-linear video editor: tracks, items, pointer-drag
//! placement and undo/redo.

pub mod config;
pub mod coords;
pub mod drag;
pub mod error;
pub mod events;
pub mod history;
pub mod interval;
pub mod item;
pub mod resource;
pub mod session;
pub mod snapshot;
pub mod track;
pub mod track_list;

pub use config::{preset_default, preset_precise, EditorConfig};
pub use coords::{Frame, FrameScale};
pub use drag::{DragGesture, DragOutcome, DragPreview, Placement, Point, Region};
pub use error::{CoreError, Result};
pub use events::TimelineEvent;
pub use item::{Attribute, AttributeKey, ItemKind, TrackItem};
pub use resource::{Resource, ResourceDescriptor};
pub use session::{ResizeEdge, Session};
pub use track::{Track, TrackKind};
pub use track_list::TrackList;
