use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::Frame;
use crate::interval::FrameRange;
use crate::resource::Resource;

pub const DEFAULT_TEXT: &str = "Default text";

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Video,
    Audio,
    Text,
    Sticker,
}

impl ItemKind {
    /// Kinds that are drawn by the player and therefore carry an [`Attribute`].
    pub fn is_visual(self) -> bool {
        match self {
            ItemKind::Video | ItemKind::Text | ItemKind::Sticker => true,
            ItemKind::Audio => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Attribute
// ---------------------------------------------------------------------------

/// Placement of a visual item inside the scene. Ratios are relative to the
/// scene size, `rotate` is in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Attribute {
    pub top_ratio: f64,
    pub left_ratio: f64,
    pub width_ratio: f64,
    pub height_ratio: f64,
    pub rotate: f64,
    pub scale: f64,
    pub opacity: f64,
}

impl Default for Attribute {
    fn default() -> Self {
        Self {
            top_ratio: 0.0,
            left_ratio: 0.0,
            width_ratio: 1.0,
            height_ratio: 1.0,
            rotate: 0.0,
            scale: 1.0,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKey {
    TopRatio,
    LeftRatio,
    WidthRatio,
    HeightRatio,
    Rotate,
    Scale,
    Opacity,
}

impl Attribute {
    pub fn get(&self, key: AttributeKey) -> f64 {
        match key {
            AttributeKey::TopRatio => self.top_ratio,
            AttributeKey::LeftRatio => self.left_ratio,
            AttributeKey::WidthRatio => self.width_ratio,
            AttributeKey::HeightRatio => self.height_ratio,
            AttributeKey::Rotate => self.rotate,
            AttributeKey::Scale => self.scale,
            AttributeKey::Opacity => self.opacity,
        }
    }

    pub fn set(&mut self, key: AttributeKey, value: f64) {
        let slot = match key {
            AttributeKey::TopRatio => &mut self.top_ratio,
            AttributeKey::LeftRatio => &mut self.left_ratio,
            AttributeKey::WidthRatio => &mut self.width_ratio,
            AttributeKey::HeightRatio => &mut self.height_ratio,
            AttributeKey::Rotate => &mut self.rotate,
            AttributeKey::Scale => &mut self.scale,
            AttributeKey::Opacity => &mut self.opacity,
        };
        *slot = value;
    }
}

// ---------------------------------------------------------------------------
// TrackItem
// ---------------------------------------------------------------------------

/// A placed instance of a resource on the timeline.
///
/// Frame setters do not validate: a drag or trim passes through invalid
/// intermediate states and the resolver only commits valid ones.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackItem {
    id: Uuid,
    start_frame: Frame,
    end_frame: Frame,
    /// Timeline frame at which the resource's first frame would sit.
    pub min_frame: Frame,
    before_drag_frame: Frame,
    resource: Resource,
    pub attribute: Option<Attribute>,
    pub text: Option<String>,
    pub(crate) parent_track: Option<Uuid>,
}

impl TrackItem {
    /// A standalone item spanning the resource's native length from frame 0.
    pub fn new(resource: Resource) -> Self {
        let end_frame = resource.frame_count();
        let kind = kind_of(&resource);
        Self {
            id: Uuid::new_v4(),
            start_frame: Frame::ZERO,
            end_frame,
            min_frame: Frame::ZERO,
            before_drag_frame: Frame::ZERO,
            attribute: kind.is_visual().then(Attribute::default),
            text: (kind == ItemKind::Text).then(|| DEFAULT_TEXT.to_string()),
            resource,
            parent_track: None,
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        if self.kind().is_visual() {
            self.attribute = Some(attribute);
        }
        self
    }

    /// Rebuild an item with a known id, used when restoring snapshots.
    pub(crate) fn restore(
        id: Uuid,
        range: FrameRange,
        min_frame: Frame,
        resource: Resource,
        attribute: Option<Attribute>,
        text: Option<String>,
    ) -> Self {
        Self {
            id,
            start_frame: range.start,
            end_frame: range.end,
            min_frame,
            before_drag_frame: range.start,
            resource,
            attribute,
            text,
            parent_track: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ItemKind {
        kind_of(&self.resource)
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn parent_track(&self) -> Option<Uuid> {
        self.parent_track
    }

    pub fn start_frame(&self) -> Frame {
        self.start_frame
    }

    pub fn end_frame(&self) -> Frame {
        self.end_frame
    }

    pub fn range(&self) -> FrameRange {
        FrameRange::new(self.start_frame, self.end_frame)
    }

    pub fn frame_count(&self) -> Frame {
        self.end_frame - self.start_frame
    }

    /// Timeline frame at which the resource's last frame would sit.
    pub fn max_frame(&self) -> Frame {
        self.min_frame + self.resource.frame_count()
    }

    pub fn set_start_frame(&mut self, frame: Frame) {
        self.start_frame = frame;
    }

    pub fn set_end_frame(&mut self, frame: Frame) {
        self.end_frame = frame;
    }

    /// Move the item so it starts at `start`, keeping its length.
    pub fn place_at(&mut self, start: Frame) {
        let len = self.frame_count();
        self.start_frame = start;
        self.end_frame = start + len;
    }

    /// Remember where a drag started so [`update_min_and_max`](Self::update_min_and_max)
    /// can shift the trim window by the same distance.
    pub fn record_before_drag_frame(&mut self) {
        self.before_drag_frame = self.start_frame;
    }

    pub(crate) fn init_min_frame(&mut self, frame: Frame) {
        self.min_frame = frame;
        self.before_drag_frame = frame;
    }

    pub fn update_min_and_max(&mut self) {
        let offset = self.start_frame - self.before_drag_frame;
        self.min_frame += offset;
        self.before_drag_frame = self.start_frame;
    }

    /// Cut at `at`. `self` keeps `[start, at)`, the returned sibling gets
    /// `[at, end)` with the same resource, attribute and trim window.
    ///
    /// Callers check `start < at < end` beforehand.
    pub fn split(&mut self, at: Frame) -> TrackItem {
        let sibling = TrackItem {
            id: Uuid::new_v4(),
            start_frame: at,
            end_frame: self.end_frame,
            min_frame: self.min_frame,
            before_drag_frame: at,
            resource: self.resource.clone(),
            attribute: self.attribute,
            text: self.text.clone(),
            parent_track: self.parent_track,
        };
        self.end_frame = at;
        sibling
    }

    /// Furthest frame the end edge may be dragged to without crossing a
    /// sibling or running past the source. `None` means unbounded.
    pub fn get_allowed_max_frame(&self, siblings: &[TrackItem]) -> Option<Frame> {
        if !self.resource.is_finite() {
            return None;
        }
        let max_frame = self.max_frame();
        let nearest = siblings
            .iter()
            .filter(|s| s.id != self.id)
            .map(|s| s.start_frame)
            .filter(|&start| start >= self.end_frame && start <= max_frame)
            .min();
        Some(nearest.map_or(max_frame, |f| f.min(max_frame)))
    }

    /// Earliest frame the start edge may be dragged to without crossing a
    /// sibling or running before the source. `None` means unbounded.
    pub fn get_allowed_min_frame(&self, siblings: &[TrackItem]) -> Option<Frame> {
        if !self.resource.is_finite() {
            return None;
        }
        let nearest = siblings
            .iter()
            .filter(|s| s.id != self.id)
            .map(|s| s.end_frame)
            .filter(|&end| end >= self.min_frame && end <= self.start_frame)
            .max();
        Some(nearest.map_or(self.min_frame, |f| f.max(self.min_frame)))
    }
}

fn kind_of(resource: &Resource) -> ItemKind {
    match resource {
        Resource::Video(_) => ItemKind::Video,
        Resource::Audio(_) => ItemKind::Audio,
        Resource::Text(_) => ItemKind::Text,
        Resource::Sticker(_) => ItemKind::Sticker,
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
