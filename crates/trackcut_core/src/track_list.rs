use uuid::Uuid;

use crate::config::EditorConfig;
use crate::coords::Frame;
use crate::error::{CoreError, Result};
use crate::events::TimelineEvent;
use crate::item::TrackItem;
use crate::track::{Track, TrackHeights, TrackKind};

/// Ordered lanes of the timeline, index 0 at the top.
///
/// Always holds exactly one [`TrackKind::Main`] track. Every other track is
/// pruned as soon as it runs empty. Mutations queue [`TimelineEvent`]s which
/// the owning session drains with [`take_events`](Self::take_events).
#[derive(Debug, Clone)]
pub struct TrackList {
    tracks: Vec<Track>,
    heights: TrackHeights,
    max_frame: Frame,
    selected: Option<Uuid>,
    pending: Vec<TimelineEvent>,
}

impl Default for TrackList {
    fn default() -> Self {
        Self::new(TrackHeights::default())
    }
}

impl TrackList {
    pub fn new(heights: TrackHeights) -> Self {
        Self {
            tracks: vec![Track::new_main(heights)],
            heights,
            max_frame: Frame::ZERO,
            selected: None,
            pending: Vec::new(),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(TrackHeights::from(config))
    }

    // -----------------------------------------------------------------------
    // Tracks
    // -----------------------------------------------------------------------

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn heights(&self) -> TrackHeights {
        self.heights
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_index(&self, id: Uuid) -> Option<usize> {
        self.tracks.iter().position(|t| t.id() == id)
    }

    pub fn find_track(&self, id: Uuid) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn find_track_mut(&mut self, id: Uuid) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id() == id)
    }

    pub fn main_index(&self) -> usize {
        self.tracks.iter().position(Track::is_main).unwrap_or(0)
    }

    pub fn main_track(&self) -> &Track {
        &self.tracks[self.main_index()]
    }

    /// A new empty track with this list's lane heights. Not inserted.
    pub fn create_track(&self, kind: TrackKind) -> Track {
        Track::new(kind, self.heights)
    }

    /// Splice `track` in at `index` (clamped to the end of the list).
    pub fn insert_track(&mut self, track: Track, index: usize) -> Result<Uuid> {
        if track.is_main() {
            return Err(CoreError::InvalidOperation(
                "the timeline already has a main track".into(),
            ));
        }
        let id = track.id();
        let index = index.min(self.tracks.len());
        self.tracks.insert(index, track);
        Ok(id)
    }

    /// Move the track at `from` so it ends up at `to`.
    pub fn move_track(&mut self, from: usize, to: usize) -> bool {
        if from >= self.tracks.len() || to >= self.tracks.len() {
            return false;
        }
        if from != to {
            let track = self.tracks.remove(from);
            self.tracks.insert(to, track);
            self.pending.push(TimelineEvent::ItemsChanged);
        }
        true
    }

    /// Drop every empty non-main track, scanning from the bottom.
    pub fn remove_empty_tracks(&mut self) -> usize {
        let mut removed = 0;
        for i in (0..self.tracks.len()).rev() {
            if !self.tracks[i].is_main() && self.tracks[i].is_empty() {
                self.tracks.remove(i);
                removed += 1;
            }
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    pub fn track_item_count(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }

    /// Only the main track is left and it holds nothing.
    pub fn is_empty(&self) -> bool {
        self.tracks.len() == 1 && self.tracks[0].is_empty()
    }

    /// `(track index, item index)` of an item.
    pub fn find_item_location(&self, id: Uuid) -> Option<(usize, usize)> {
        self.tracks.iter().enumerate().find_map(|(ti, track)| {
            track
                .items()
                .iter()
                .position(|i| i.id() == id)
                .map(|ii| (ti, ii))
        })
    }

    pub fn get_track_item(&self, id: Uuid) -> Option<&TrackItem> {
        self.tracks.iter().find_map(|t| t.get_track_item(id))
    }

    pub fn get_track_item_mut(&mut self, id: Uuid) -> Option<&mut TrackItem> {
        self.tracks.iter_mut().find_map(|t| t.get_track_item_mut(id))
    }

    pub fn add_track_item(&mut self, track_id: Uuid, item: TrackItem) -> Result<bool> {
        self.add_track_items(track_id, vec![item])
    }

    /// Place `items` on a track.
    ///
    /// Returns `Ok(false)` without touching anything when the track refuses
    /// one of the kinds. An item already in the list is taken out first, so
    /// adding it elsewhere is a move and keeps its trim window shifted by the
    /// drag distance. Fresh items get their window anchored at their start.
    pub fn add_track_items(&mut self, track_id: Uuid, items: Vec<TrackItem>) -> Result<bool> {
        self.attach_items(track_id, items, None)
    }

    /// Put an item back at a known position in its track, as undo does.
    pub fn restore_track_item(
        &mut self,
        track_id: Uuid,
        item: TrackItem,
        position: usize,
    ) -> Result<()> {
        let kind = item.kind();
        if self.attach_items(track_id, vec![item], Some(position))? {
            Ok(())
        } else {
            let track = self
                .find_track(track_id)
                .ok_or(CoreError::TrackNotFound(track_id))?
                .kind();
            Err(CoreError::KindNotAllowed { item: kind, track })
        }
    }

    fn attach_items(
        &mut self,
        track_id: Uuid,
        items: Vec<TrackItem>,
        position: Option<usize>,
    ) -> Result<bool> {
        let track = match self.find_track(track_id) {
            Some(track) => track,
            None => {
                tracing::warn!(%track_id, "adding items to a track that is not in the list");
                return Err(CoreError::TrackNotFound(track_id));
            }
        };
        if let Some(refused) = items.iter().find(|i| !track.accepts(i.kind())) {
            tracing::debug!(kind = ?refused.kind(), track = ?track.kind(), "track refused item");
            return Ok(false);
        }
        if items.is_empty() {
            return Ok(true);
        }

        let before = self.track_item_count();
        let mut visual = false;
        for (offset, mut item) in items.into_iter().enumerate() {
            let previous = self.take_track_item(item.id());
            if previous.is_some() || item.parent_track.is_some() {
                item.update_min_and_max();
            } else {
                item.init_min_frame(item.start_frame());
            }
            visual |= item.kind().is_visual();

            let track = self
                .find_track_mut(track_id)
                .ok_or(CoreError::TrackNotFound(track_id))?;
            match position {
                Some(at) => track.insert_item_with_no_effect(at + offset, item),
                None => track.push_item_with_no_effect(item),
            }
            self.remove_empty_tracks();
        }

        let full = self.track_item_count() > before;
        self.update_max_frame(full);
        self.pending.push(TimelineEvent::ItemsChanged);
        if visual {
            self.pending.push(TimelineEvent::PlayerNeedsUpdate);
        }
        Ok(true)
    }

    /// [`add_track_item`](Self::add_track_item) where a refused kind is an error.
    pub fn place_track_item(&mut self, track_id: Uuid, item: TrackItem) -> Result<()> {
        let track = self
            .find_track(track_id)
            .ok_or(CoreError::TrackNotFound(track_id))?
            .kind();
        let kind = item.kind();
        if self.add_track_item(track_id, item)? {
            Ok(())
        } else {
            Err(CoreError::KindNotAllowed { item: kind, track })
        }
    }

    /// Take an item out of whatever track holds it, leaving the track in
    /// place even if it is now empty.
    pub fn take_track_item(&mut self, id: Uuid) -> Option<TrackItem> {
        let (ti, _) = self.find_item_location(id)?;
        let item = self.tracks[ti].remove_track_item(id)?;
        if self.selected == Some(id) {
            self.selected = None;
            self.pending.push(TimelineEvent::SelectionChanged);
        }
        Some(item)
    }

    /// Remove an item and prune any track it leaves empty.
    pub fn remove_track_item(&mut self, id: Uuid) -> Option<TrackItem> {
        let item = self.take_track_item(id)?;
        self.remove_empty_tracks();
        self.update_max_frame(false);
        self.pending.push(TimelineEvent::ItemsChanged);
        if item.kind().is_visual() {
            self.pending.push(TimelineEvent::PlayerNeedsUpdate);
        }
        Some(item)
    }

    /// Cut an item at `at` and insert the right half next to it on the same
    /// track. Callers check `start < at < end`. Returns the new item's id.
    pub fn split_track_item(&mut self, id: Uuid, at: Frame) -> Result<Uuid> {
        let (ti, _) = self
            .find_item_location(id)
            .ok_or(CoreError::ItemNotFound(id))?;
        let track = &mut self.tracks[ti];
        let sibling = track
            .get_track_item_mut(id)
            .ok_or(CoreError::ItemNotFound(id))?
            .split(at);
        let sibling_id = sibling.id();
        let visual = sibling.kind().is_visual();
        track.push_item_with_no_effect(sibling);

        self.update_max_frame(true);
        self.pending.push(TimelineEvent::ItemsChanged);
        if visual {
            self.pending.push(TimelineEvent::PlayerNeedsUpdate);
        }
        Ok(sibling_id)
    }

    /// Queue the events for an item whose frames or attribute were changed
    /// through [`get_track_item_mut`](Self::get_track_item_mut).
    pub fn item_changed(&mut self, id: Uuid) {
        let visual = self
            .get_track_item(id)
            .is_some_and(|i| i.kind().is_visual());
        self.update_max_frame(false);
        self.pending.push(TimelineEvent::ItemsChanged);
        if visual {
            self.pending.push(TimelineEvent::PlayerNeedsUpdate);
        }
    }

    // -----------------------------------------------------------------------
    // Max frame
    // -----------------------------------------------------------------------

    pub fn max_frame(&self) -> Frame {
        self.max_frame
    }

    pub fn update_max_frame(&mut self, full: bool) {
        self.max_frame = self
            .tracks
            .iter()
            .map(|t| t.get_last_frame(None))
            .max()
            .unwrap_or(Frame::ZERO);
        self.pending.push(TimelineEvent::MaxFrameChanged {
            max_frame: self.max_frame,
            full,
        });
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn selected_id(&self) -> Option<Uuid> {
        self.selected
    }

    /// Select an item by id, or clear the selection. Unknown ids clear it.
    pub fn select(&mut self, id: Option<Uuid>) {
        let id = id.filter(|id| self.get_track_item(*id).is_some());
        if self.selected != id {
            self.selected = id;
            self.pending.push(TimelineEvent::SelectionChanged);
        }
    }

    pub fn remove_selected(&mut self) -> Option<TrackItem> {
        let id = self.selected?;
        self.remove_track_item(id)
    }

    // -----------------------------------------------------------------------
    // Playhead queries
    // -----------------------------------------------------------------------

    /// Item strictly containing `frame`, searched from the bottom lane up.
    pub fn item_at_frame(&self, frame: Frame) -> Option<&TrackItem> {
        self.tracks.iter().rev().find_map(|t| {
            t.items()
                .iter()
                .find(|i| i.start_frame() < frame && frame < i.end_frame())
        })
    }

    /// Visual items the player shows at `frame`, bottom lane first so upper
    /// lanes draw over lower ones.
    pub fn items_playing_at(&self, frame: Frame) -> Vec<&TrackItem> {
        self.tracks
            .iter()
            .rev()
            .flat_map(|t| t.items())
            .filter(|i| i.kind().is_visual())
            .filter(|i| i.start_frame() < frame && frame <= i.end_frame())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn take_events(&mut self) -> Vec<TimelineEvent> {
        std::mem::take(&mut self.pending)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
