use thiserror::Error;

use crate::item::ItemKind;
use crate::track::TrackKind;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Item not found: {0}")]
    ItemNotFound(uuid::Uuid),

    #[error("Track not found: {0}")]
    TrackNotFound(uuid::Uuid),

    #[error("{item:?} items are not allowed on a {track:?} track")]
    KindNotAllowed { item: ItemKind, track: TrackKind },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("No drag gesture in progress")]
    NoActiveGesture,
}

pub type Result<T> = std::result::Result<T, CoreError>;
