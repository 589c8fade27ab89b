//! Pointer-drag placement.
//!
//! A [`DragGesture`] snapshots the track layout when the drag starts, turns
//! every pointer position into a [`DragPreview`] without touching the
//! timeline, and applies the last preview once on release.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EditorConfig;
use crate::coords::{Frame, FrameScale};
use crate::error::{CoreError, Result};
use crate::interval::FrameRange;
use crate::item::{ItemKind, TrackItem};
use crate::track::TrackKind;
use crate::track_list::TrackList;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Pointer position in track-list-local pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Vertical slot of the pointer relative to the lanes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "region", rename_all = "snake_case")]
pub enum Region {
    AboveAllTracks,
    OnTrack { index: usize },
    InGapBelowTrack { index: usize },
    BelowAllTracks,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaneGeometry {
    pub index: usize,
    pub track_id: Uuid,
    pub kind: TrackKind,
    pub top: f64,
    pub bottom: f64,
    pub items: Vec<(Uuid, FrameRange)>,
}

impl LaneGeometry {
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    fn collides(&self, range: FrameRange, excluding: Uuid) -> bool {
        self.items
            .iter()
            .any(|(id, r)| *id != excluding && r.intersects(&range))
    }

    fn last_frame(&self, excluding: Uuid) -> Frame {
        self.items
            .iter()
            .filter(|(id, _)| *id != excluding)
            .map(|(_, r)| r.end)
            .max()
            .unwrap_or(Frame::ZERO)
    }

    fn holds_only(&self, id: Uuid) -> bool {
        matches!(self.items.as_slice(), [(only, _)] if *only == id)
    }
}

/// Lane bounds and contents captured once per gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackGeometry {
    lanes: Vec<LaneGeometry>,
    interval: f64,
    content_height: Option<f64>,
    main_index: usize,
    empty: bool,
}

impl TrackGeometry {
    /// Lanes laid out top to bottom from `top`, `interval` pixels apart.
    pub fn stacked(list: &TrackList, top: f64, interval: f64) -> Self {
        let mut y = top;
        let tops: Vec<f64> = list
            .tracks()
            .iter()
            .map(|track| {
                let lane_top = y;
                y += track.height() + interval;
                lane_top
            })
            .collect();
        Self::build(list, &tops, interval)
    }

    /// Lanes at measured tops, one per track in list order.
    pub fn from_measured(list: &TrackList, tops: &[f64], interval: f64) -> Result<Self> {
        if tops.len() != list.len() {
            return Err(CoreError::InvalidOperation(format!(
                "expected {} track tops, got {}",
                list.len(),
                tops.len()
            )));
        }
        Ok(Self::build(list, tops, interval))
    }

    fn build(list: &TrackList, tops: &[f64], interval: f64) -> Self {
        let lanes = list
            .tracks()
            .iter()
            .zip(tops)
            .enumerate()
            .map(|(index, (track, &top))| LaneGeometry {
                index,
                track_id: track.id(),
                kind: track.kind(),
                top,
                bottom: top + track.height(),
                items: track.items().iter().map(|i| (i.id(), i.range())).collect(),
            })
            .collect();
        Self {
            lanes,
            interval,
            content_height: None,
            main_index: list.main_index(),
            empty: list.is_empty(),
        }
    }

    /// Pointers below this height are outside the drop area.
    pub fn with_content_height(mut self, height: f64) -> Self {
        self.content_height = Some(height);
        self
    }

    pub fn lanes(&self) -> &[LaneGeometry] {
        &self.lanes
    }

    pub fn main_index(&self) -> usize {
        self.main_index
    }

    fn lane_index(&self, track_id: Uuid) -> Option<usize> {
        self.lanes.iter().position(|l| l.track_id == track_id)
    }

    /// `None` when `y` is outside the drop area.
    pub fn classify(&self, y: f64) -> Option<Region> {
        if y < 0.0 || self.content_height.is_some_and(|h| y > h) {
            return None;
        }
        let first = self.lanes.first()?;
        if y < first.top {
            return Some(Region::AboveAllTracks);
        }
        for (index, lane) in self.lanes.iter().enumerate() {
            if y <= lane.bottom {
                return Some(if y >= lane.top {
                    Region::OnTrack { index }
                } else {
                    Region::InGapBelowTrack {
                        index: index.saturating_sub(1),
                    }
                });
            }
        }
        let last = self.lanes.len() - 1;
        if y <= self.lanes[last].bottom + self.interval {
            Some(Region::InGapBelowTrack { index: last })
        } else {
            Some(Region::BelowAllTracks)
        }
    }

    /// Where the insertion line sits for a new track at `position`.
    fn insertion_line_top(&self, position: usize) -> f64 {
        let half = self.interval / 2.0;
        match position.checked_sub(1) {
            None => self.lanes.first().map_or(0.0, |l| l.top - half),
            Some(above) => self
                .lanes
                .get(above)
                .or_else(|| self.lanes.last())
                .map_or(half, |l| l.bottom + half),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Which lanes a dragged kind may use and where its new tracks go.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DragPolicy {
    /// Video and stickers: Main and the overlay lanes above it.
    MainLane,
    /// Text: overlay lanes above Main, never Main itself.
    OverlayLane,
    /// Audio: lanes below Main.
    AudioLane,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchDirection {
    TowardTop,
    TowardBottom,
}

impl DragPolicy {
    pub fn for_kind(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Video | ItemKind::Sticker => DragPolicy::MainLane,
            ItemKind::Text => DragPolicy::OverlayLane,
            ItemKind::Audio => DragPolicy::AudioLane,
        }
    }

    /// Order in which lanes are tried when the hovered one is occupied.
    pub fn search_direction(self) -> SearchDirection {
        match self {
            DragPolicy::MainLane | DragPolicy::OverlayLane => SearchDirection::TowardTop,
            DragPolicy::AudioLane => SearchDirection::TowardBottom,
        }
    }

    fn new_track_kind(self) -> TrackKind {
        match self {
            DragPolicy::MainLane | DragPolicy::OverlayLane => TrackKind::Video,
            DragPolicy::AudioLane => TrackKind::Audio,
        }
    }
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum Placement {
    OnTrack { track_id: Uuid },
    /// A new track is needed at this index.
    InsertTrack { index: usize },
    /// Move the dragged item's own track so it ends up at index `to`.
    ReorderTrack { track_id: Uuid, to: usize },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(tag = "indicator", rename_all = "snake_case")]
pub enum Indicator {
    Placeholder { top: f64, height: f64 },
    InsertionLine { top: f64 },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DragPreview {
    pub region: Region,
    pub placement: Placement,
    pub start_frame: Frame,
    pub frame_count: Frame,
    /// Sibling edge the item snapped to, for the vertical guide line.
    pub snap_frame: Option<Frame>,
    pub indicator: Indicator,
}

impl DragPreview {
    pub fn range(&self) -> FrameRange {
        FrameRange::with_len(self.start_frame, self.frame_count)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Main's previous items were moved to a new video track above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub track_id: Uuid,
    pub track_index: usize,
    pub items: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackReorder {
    pub track_id: Uuid,
    pub from: usize,
    pub to: usize,
}

/// What a committed drop changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragOutcome {
    pub item_id: Uuid,
    pub track_id: Uuid,
    pub created_track: Option<Uuid>,
    pub promotion: Option<Promotion>,
    pub reorder: Option<TrackReorder>,
}

impl DragOutcome {
    fn placed(item_id: Uuid, track_id: Uuid) -> Self {
        Self {
            item_id,
            track_id,
            created_track: None,
            promotion: None,
            reorder: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DragGesture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DragGesture {
    item: TrackItem,
    source_track: Option<Uuid>,
    policy: DragPolicy,
    geometry: TrackGeometry,
    scale: FrameScale,
    grab_offset_x: f64,
    snap_threshold_px: f64,
    magnetic: bool,
    sticky: bool,
    preview: Option<DragPreview>,
}

impl DragGesture {
    /// Start dragging a new item in from the resource palette.
    /// `grab_offset_x` is the pointer's distance from the item's left edge.
    pub fn begin_insert(
        item: TrackItem,
        geometry: TrackGeometry,
        scale: FrameScale,
        config: &EditorConfig,
        grab_offset_x: f64,
    ) -> Self {
        Self {
            policy: DragPolicy::for_kind(item.kind()),
            item,
            source_track: None,
            geometry,
            scale,
            grab_offset_x,
            snap_threshold_px: config.snap_threshold_px,
            magnetic: config.magnetic,
            sticky: config.sticky,
            preview: None,
        }
    }

    /// Start dragging an item that is already on the timeline.
    pub fn begin_move(
        list: &TrackList,
        item_id: Uuid,
        geometry: TrackGeometry,
        scale: FrameScale,
        config: &EditorConfig,
        grab_offset_x: f64,
    ) -> Result<Self> {
        let mut item = list
            .get_track_item(item_id)
            .cloned()
            .ok_or(CoreError::ItemNotFound(item_id))?;
        item.record_before_drag_frame();
        let source_track = item.parent_track();
        let mut gesture = Self::begin_insert(item, geometry, scale, config, grab_offset_x);
        gesture.source_track = source_track;
        Ok(gesture)
    }

    pub fn item(&self) -> &TrackItem {
        &self.item
    }

    pub fn is_move(&self) -> bool {
        self.source_track.is_some()
    }

    pub fn policy(&self) -> DragPolicy {
        self.policy
    }

    pub fn preview(&self) -> Option<&DragPreview> {
        self.preview.as_ref()
    }

    /// Recompute the preview for a pointer-move tick.
    pub fn update(&mut self, pointer: Point) -> Option<&DragPreview> {
        self.preview = self.resolve(pointer);
        self.preview.as_ref()
    }

    /// Classify `pointer` and work out where the item would land. Pure: the
    /// same pointer over the same geometry always gives the same preview.
    pub fn resolve(&self, pointer: Point) -> Option<DragPreview> {
        if pointer.x < 0.0 {
            return None;
        }
        let region = self.geometry.classify(pointer.y)?;
        let frame_count = self.item.frame_count();
        let raw = self.scale.pixel_to_frame(pointer.x - self.grab_offset_x);
        let (mut start, mut snap) = self.snap(raw, frame_count);

        let (placement, indicator) = if self.geometry.empty {
            self.resolve_empty(&mut start, &mut snap)
        } else {
            let m = self.geometry.main_index;
            match self.policy {
                DragPolicy::MainLane => match region {
                    Region::AboveAllTracks => self.insert_at(0),
                    Region::OnTrack { index } if index <= m => {
                        self.on_track(index, &mut start, &mut snap, frame_count)
                    }
                    Region::InGapBelowTrack { index } if index < m => self.gap_below(index),
                    _ => {
                        // Main is emptied by the promotion, so a magnetic drop starts it over.
                        if self.magnetic {
                            start = Frame::ZERO;
                            snap = None;
                        }
                        self.insert_at(m + 1)
                    }
                },
                DragPolicy::OverlayLane => match region {
                    Region::AboveAllTracks => self.insert_at(0),
                    Region::OnTrack { index } if index < m => {
                        self.on_track(index, &mut start, &mut snap, frame_count)
                    }
                    Region::InGapBelowTrack { index } if index < m => self.gap_below(index),
                    _ => self.insert_at(m),
                },
                DragPolicy::AudioLane => match region {
                    Region::OnTrack { index } if index > m => {
                        self.on_track(index, &mut start, &mut snap, frame_count)
                    }
                    Region::InGapBelowTrack { index } if index >= m => self.gap_below(index),
                    Region::BelowAllTracks => self.insert_at(self.geometry.lanes.len()),
                    _ => self.insert_at(m + 1),
                },
            }
        };

        Some(DragPreview {
            region,
            placement,
            start_frame: start,
            frame_count,
            snap_frame: snap,
            indicator,
        })
    }

    /// Finish the gesture. A pointer outside the drop area abandons it and
    /// leaves the timeline untouched.
    pub fn release(self, pointer: Point, list: &mut TrackList) -> Result<Option<DragOutcome>> {
        let Some(preview) = self.resolve(pointer) else {
            tracing::debug!(item = %self.item.id(), "dropped outside the tracks, drag abandoned");
            return Ok(None);
        };
        if self.policy == DragPolicy::OverlayLane && self.is_below_overlay_lanes(preview.region) {
            tracing::warn!("text cannot go on the main track, inserting a track above it");
        }
        self.validate(&preview, list)?;
        self.apply(preview, list).map(Some)
    }

    // -----------------------------------------------------------------------
    // Resolution helpers
    // -----------------------------------------------------------------------

    fn resolve_empty(&self, start: &mut Frame, snap: &mut Option<Frame>) -> (Placement, Indicator) {
        let m = self.geometry.main_index;
        match self.policy {
            DragPolicy::MainLane => {
                *start = Frame::ZERO;
                *snap = None;
                let main = &self.geometry.lanes[m];
                (
                    Placement::OnTrack {
                        track_id: main.track_id,
                    },
                    Indicator::Placeholder {
                        top: main.top,
                        height: main.height(),
                    },
                )
            }
            DragPolicy::OverlayLane => self.insert_at(m),
            DragPolicy::AudioLane => self.insert_at(m + 1),
        }
    }

    fn on_track(
        &self,
        index: usize,
        start: &mut Frame,
        snap: &mut Option<Frame>,
        frame_count: Frame,
    ) -> (Placement, Indicator) {
        let lanes = &self.geometry.lanes;
        let id = self.item.id();
        if lanes[index].kind == TrackKind::Main && self.magnetic {
            *start = lanes[index].last_frame(id);
            *snap = None;
        }

        let range = FrameRange::with_len(*start, frame_count);
        let kind = self.item.kind();
        let fits = |i: &usize| lanes[*i].kind.accepts(kind) && !lanes[*i].collides(range, id);
        let direction = self.policy.search_direction();
        let found = match direction {
            SearchDirection::TowardTop => (0..=index).rev().find(fits),
            SearchDirection::TowardBottom => (index..lanes.len()).find(fits),
        };

        match (found, direction) {
            (Some(i), _) => (
                Placement::OnTrack {
                    track_id: lanes[i].track_id,
                },
                Indicator::Placeholder {
                    top: lanes[i].top,
                    height: lanes[i].height(),
                },
            ),
            (None, SearchDirection::TowardTop) => self.insert_at(index),
            (None, SearchDirection::TowardBottom) => self.insert_at(index + 1),
        }
    }

    fn gap_below(&self, index: usize) -> (Placement, Indicator) {
        let position = index + 1;
        let indicator = Indicator::InsertionLine {
            top: self.geometry.insertion_line_top(position),
        };

        // Dragging the only item of a track into a gap moves the whole track.
        if let Some(source) = self.source_track {
            if let Some(from) = self.geometry.lane_index(source) {
                let lane = &self.geometry.lanes[from];
                if lane.kind != TrackKind::Main && lane.holds_only(self.item.id()) {
                    let to = if position > from { position - 1 } else { position };
                    return (
                        Placement::ReorderTrack {
                            track_id: source,
                            to,
                        },
                        indicator,
                    );
                }
            }
        }
        (Placement::InsertTrack { index: position }, indicator)
    }

    fn insert_at(&self, position: usize) -> (Placement, Indicator) {
        (
            Placement::InsertTrack { index: position },
            Indicator::InsertionLine {
                top: self.geometry.insertion_line_top(position),
            },
        )
    }

    /// Snap the start or end edge to the nearest sibling edge within the
    /// pixel threshold. Ties keep the first edge found.
    fn snap(&self, start: Frame, frame_count: Frame) -> (Frame, Option<Frame>) {
        if !self.sticky {
            return (start, None);
        }
        let start_px = self.scale.frame_to_pixel(start);
        let end_px = self.scale.frame_to_pixel(start + frame_count);
        let id = self.item.id();

        let mut best: Option<(f64, Frame, Frame)> = None;
        let siblings = self
            .geometry
            .lanes
            .iter()
            .flat_map(|l| l.items.iter())
            .filter(|(other, _)| *other != id);
        for (_, range) in siblings {
            let candidates = [
                (start_px, range.start, range.start),
                (start_px, range.end, range.end),
                (end_px, range.start, range.start - frame_count),
                (end_px, range.end, range.end - frame_count),
            ];
            for (edge_px, edge, new_start) in candidates {
                if new_start < Frame::ZERO {
                    continue;
                }
                let distance = (self.scale.frame_to_pixel(edge) - edge_px).abs();
                let nearer = best.map_or(true, |(d, _, _)| distance < d);
                if distance < self.snap_threshold_px && nearer {
                    best = Some((distance, new_start, edge));
                }
            }
        }

        match best {
            Some((_, new_start, edge)) => (new_start, Some(edge)),
            None => (start, None),
        }
    }

    fn is_below_overlay_lanes(&self, region: Region) -> bool {
        let m = self.geometry.main_index;
        !self.geometry.empty
            && match region {
                Region::AboveAllTracks => false,
                Region::OnTrack { index } | Region::InGapBelowTrack { index } => index >= m,
                Region::BelowAllTracks => true,
            }
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    fn validate(&self, preview: &DragPreview, list: &TrackList) -> Result<()> {
        if preview.frame_count <= Frame::ZERO {
            return Err(CoreError::InvalidOperation("dragged item has no length".into()));
        }
        let id = self.item.id();
        if self.is_move() && list.get_track_item(id).is_none() {
            return Err(CoreError::ItemNotFound(id));
        }
        match preview.placement {
            Placement::OnTrack { track_id } => {
                let track = list
                    .find_track(track_id)
                    .ok_or(CoreError::TrackNotFound(track_id))?;
                if !track.accepts(self.item.kind()) {
                    return Err(CoreError::KindNotAllowed {
                        item: self.item.kind(),
                        track: track.kind(),
                    });
                }
                let range = FrameRange::with_len(preview.start_frame, preview.frame_count);
                if track.collides(range, Some(id)) {
                    return Err(CoreError::InvalidOperation(format!(
                        "{}..{} overlaps an item on track {}",
                        range.start, range.end, track_id
                    )));
                }
            }
            Placement::InsertTrack { index } => {
                if index > list.len() {
                    return Err(CoreError::InvalidOperation(format!(
                        "track index {} is past the end of the list",
                        index
                    )));
                }
            }
            Placement::ReorderTrack { track_id, to } => {
                list.track_index(track_id)
                    .ok_or(CoreError::TrackNotFound(track_id))?;
                if to >= list.len() {
                    return Err(CoreError::InvalidOperation(format!(
                        "track index {} is past the end of the list",
                        to
                    )));
                }
            }
        }
        Ok(())
    }

    fn apply(self, preview: DragPreview, list: &mut TrackList) -> Result<DragOutcome> {
        let mut item = self.item;
        let item_id = item.id();
        item.place_at(preview.start_frame);

        let outcome = match preview.placement {
            Placement::OnTrack { track_id } => {
                list.place_track_item(track_id, item)?;
                DragOutcome::placed(item_id, track_id)
            }
            Placement::InsertTrack { index }
                if self.policy == DragPolicy::MainLane && index == list.main_index() + 1 =>
            {
                let main_id = list.main_track().id();
                let promotion = promote_main(list, item)?;
                DragOutcome {
                    promotion,
                    ..DragOutcome::placed(item_id, main_id)
                }
            }
            Placement::InsertTrack { index } => {
                let track = list.create_track(self.policy.new_track_kind());
                let track_id = list.insert_track(track, index)?;
                list.place_track_item(track_id, item)?;
                DragOutcome {
                    created_track: Some(track_id),
                    ..DragOutcome::placed(item_id, track_id)
                }
            }
            Placement::ReorderTrack { track_id, to } => {
                let from = list
                    .track_index(track_id)
                    .ok_or(CoreError::TrackNotFound(track_id))?;
                list.move_track(from, to);
                list.place_track_item(track_id, item)?;
                DragOutcome {
                    reorder: Some(TrackReorder { track_id, from, to }),
                    ..DragOutcome::placed(item_id, track_id)
                }
            }
        };

        tracing::debug!(
            item = %item_id,
            track = %outcome.track_id,
            start = %preview.start_frame,
            "drop committed"
        );
        Ok(outcome)
    }
}

/// Move everything else on Main onto a new video track right above it, then
/// put `item` on the emptied Main track.
pub(crate) fn promote_main(list: &mut TrackList, item: TrackItem) -> Result<Option<Promotion>> {
    let main_id = list.main_track().id();
    let main_index = list.main_index();
    let displaced: Vec<TrackItem> = list
        .main_track()
        .items()
        .iter()
        .filter(|i| i.id() != item.id())
        .cloned()
        .map(|mut i| {
            i.record_before_drag_frame();
            i
        })
        .collect();

    let promotion = if displaced.is_empty() {
        None
    } else {
        let track = list.create_track(TrackKind::Video);
        let track_id = list.insert_track(track, main_index)?;
        let items = displaced.iter().map(TrackItem::id).collect();
        if !list.add_track_items(track_id, displaced)? {
            return Err(CoreError::InvalidOperation(
                "main track items do not fit on a video track".into(),
            ));
        }
        Some(Promotion {
            track_id,
            track_index: main_index,
            items,
        })
    };

    list.place_track_item(main_id, item)?;
    Ok(promotion)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
