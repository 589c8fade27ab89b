use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EditorConfig;
use crate::coords::Frame;
use crate::interval::FrameRange;
use crate::item::{ItemKind, TrackItem};

// ---------------------------------------------------------------------------
// TrackKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Main,
    Video,
    Audio,
}

impl TrackKind {
    pub fn accepts(self, item: ItemKind) -> bool {
        match (self, item) {
            (TrackKind::Main, ItemKind::Video | ItemKind::Sticker) => true,
            (TrackKind::Main, ItemKind::Audio | ItemKind::Text) => false,
            (TrackKind::Video, ItemKind::Video | ItemKind::Text | ItemKind::Sticker) => true,
            (TrackKind::Video, ItemKind::Audio) => false,
            (TrackKind::Audio, ItemKind::Audio) => true,
            (TrackKind::Audio, _) => false,
        }
    }
}

/// Lane heights taken from the editor config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackHeights {
    pub main: f64,
    pub video: f64,
    pub other: f64,
}

impl From<&EditorConfig> for TrackHeights {
    fn from(config: &EditorConfig) -> Self {
        Self {
            main: config.main_track_height,
            video: config.video_track_height,
            other: config.other_track_height,
        }
    }
}

impl Default for TrackHeights {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// One horizontal lane. Item order is insertion order; use `start_frame`
/// for time order.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: Uuid,
    kind: TrackKind,
    height: f64,
    items: Vec<TrackItem>,
    heights: TrackHeights,
}

impl Track {
    pub fn new(kind: TrackKind, heights: TrackHeights) -> Self {
        Self::with_id(Uuid::new_v4(), kind, heights)
    }

    pub(crate) fn with_id(id: Uuid, kind: TrackKind, heights: TrackHeights) -> Self {
        let mut track = Self {
            id,
            kind,
            height: 0.0,
            items: Vec::new(),
            heights,
        };
        track.update_height();
        track
    }

    pub fn new_main(heights: TrackHeights) -> Self {
        Self::new(TrackKind::Main, heights)
    }

    pub fn new_video(heights: TrackHeights) -> Self {
        Self::new(TrackKind::Video, heights)
    }

    pub fn new_audio(heights: TrackHeights) -> Self {
        Self::new(TrackKind::Audio, heights)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_main(&self) -> bool {
        self.kind == TrackKind::Main
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn items(&self) -> &[TrackItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn accepts(&self, kind: ItemKind) -> bool {
        self.kind.accepts(kind)
    }

    pub fn has_video(&self) -> bool {
        self.items.iter().any(|i| i.kind() == ItemKind::Video)
    }

    pub fn get_track_item(&self, id: Uuid) -> Option<&TrackItem> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn get_track_item_mut(&mut self, id: Uuid) -> Option<&mut TrackItem> {
        self.items.iter_mut().find(|i| i.id() == id)
    }

    /// Greatest end frame on this track, optionally ignoring one item.
    pub fn get_last_frame(&self, excluding: Option<Uuid>) -> Frame {
        self.items
            .iter()
            .filter(|i| Some(i.id()) != excluding)
            .map(|i| i.end_frame())
            .max()
            .unwrap_or(Frame::ZERO)
    }

    /// Whether `range` overlaps any item other than `excluding`.
    pub fn collides(&self, range: FrameRange, excluding: Option<Uuid>) -> bool {
        self.items
            .iter()
            .filter(|i| Some(i.id()) != excluding)
            .any(|i| i.range().intersects(&range))
    }

    /// Append without touching the item's trim window or the owning list.
    pub fn push_item_with_no_effect(&mut self, mut item: TrackItem) {
        item.parent_track = Some(self.id);
        self.items.push(item);
        self.update_height();
    }

    /// Like [`push_item_with_no_effect`](Self::push_item_with_no_effect) but
    /// at `index`, clamped to the end.
    pub(crate) fn insert_item_with_no_effect(&mut self, index: usize, mut item: TrackItem) {
        item.parent_track = Some(self.id);
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        self.update_height();
    }

    pub fn remove_track_item(&mut self, id: Uuid) -> Option<TrackItem> {
        let pos = self.items.iter().position(|i| i.id() == id)?;
        let mut item = self.items.remove(pos);
        item.parent_track = None;
        self.update_height();
        Some(item)
    }

    fn update_height(&mut self) {
        self.height = match self.kind {
            TrackKind::Main => self.heights.main,
            _ if self.has_video() => self.heights.video,
            _ => self.heights.other,
        };
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::*;

    #[test]
    fn acceptance_table() {
        assert!(TrackKind::Main.accepts(ItemKind::Video));
        assert!(TrackKind::Main.accepts(ItemKind::Sticker));
        assert!(!TrackKind::Main.accepts(ItemKind::Text));
        assert!(!TrackKind::Main.accepts(ItemKind::Audio));

        assert!(TrackKind::Video.accepts(ItemKind::Text));
        assert!(TrackKind::Video.accepts(ItemKind::Video));
        assert!(!TrackKind::Video.accepts(ItemKind::Audio));

        assert!(TrackKind::Audio.accepts(ItemKind::Audio));
        assert!(!TrackKind::Audio.accepts(ItemKind::Sticker));
    }

    // -----------------------------------------------------------------------
    // height
    // -----------------------------------------------------------------------

    #[test]
    fn height_follows_contents() {
        let heights = TrackHeights::default();
        let mut track = Track::new_video(heights);
        assert_eq!(track.height(), heights.other);

        let clip = video(30);
        let clip_id = clip.id();
        track.push_item_with_no_effect(clip);
        assert_eq!(track.height(), heights.video);

        track.push_item_with_no_effect(text(30));
        track.remove_track_item(clip_id);
        assert_eq!(track.height(), heights.other);
    }

    #[test]
    fn main_height_is_fixed() {
        let heights = TrackHeights {
            main: 80.0,
            video: 60.0,
            other: 24.0,
        };
        let mut track = Track::new_main(heights);
        assert_eq!(track.height(), 80.0);
        track.push_item_with_no_effect(sticker(30));
        assert_eq!(track.height(), 80.0);
    }

    // -----------------------------------------------------------------------
    // membership
    // -----------------------------------------------------------------------

    #[test]
    fn push_sets_parent_and_remove_clears_it() {
        let mut track = Track::new_audio(TrackHeights::default());
        let item = audio(60);
        let id = item.id();
        track.push_item_with_no_effect(item);
        assert_eq!(track.get_track_item(id).unwrap().parent_track(), Some(track.id()));

        let removed = track.remove_track_item(id).unwrap();
        assert!(removed.parent_track().is_none());
        assert!(track.is_empty());
        assert!(track.remove_track_item(id).is_none());
    }

    #[test]
    fn last_frame_with_exclusion() {
        let mut track = Track::new_main(TrackHeights::default());
        assert_eq!(track.get_last_frame(None), Frame::ZERO);

        let a = at(video(100), 0, 40);
        let b = at(video(100), 40, 90);
        let b_id = b.id();
        track.push_item_with_no_effect(a);
        track.push_item_with_no_effect(b);

        assert_eq!(track.get_last_frame(None), Frame(90));
        assert_eq!(track.get_last_frame(Some(b_id)), Frame(40));
    }

    #[test]
    fn collides_ignores_excluded_item() {
        let mut track = Track::new_video(TrackHeights::default());
        let a = at(video(100), 10, 20);
        let a_id = a.id();
        track.push_item_with_no_effect(a);

        let inside = FrameRange::new(Frame(12), Frame(17));
        assert!(track.collides(inside, None));
        assert!(!track.collides(inside, Some(a_id)));
        assert!(!track.collides(FrameRange::new(Frame(20), Frame(25)), None));
    }
}
