use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EditorConfig;
use crate::coords::{Frame, FrameScale};
use crate::drag::{DragGesture, DragOutcome, DragPreview, Point, TrackGeometry};
use crate::error::{CoreError, Result};
use crate::events::{EventBus, Listener, TimelineEvent};
use crate::history::{
    Action, AddItemAction, AttributeChangeAction, DeleteItemAction, History, MoveItemAction,
    PendingAdd, PendingAttributeChange, PendingMove, PendingResize, ResizeItemAction,
    SplitItemAction, TextEditAction,
};
use crate::item::{Attribute, AttributeKey, TrackItem};
use crate::snapshot::TimelineData;
use crate::track_list::TrackList;

/// Which edge of an item a trim handle drags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResizeEdge {
    Start,
    End,
}

#[derive(Debug)]
enum PendingDrop {
    Add(PendingAdd),
    Move(PendingMove),
}

#[derive(Debug)]
struct ActiveDrag {
    gesture: DragGesture,
    pending: PendingDrop,
}

#[derive(Debug)]
struct ActiveResize {
    pending: PendingResize,
    edge: ResizeEdge,
}

/// One editing session: the timeline, its undo history and whatever
/// gesture is in flight. Every mutating call dispatches the queued
/// [`TimelineEvent`]s to subscribers before returning.
#[derive(Debug)]
pub struct Session {
    config: EditorConfig,
    scale: FrameScale,
    list: TrackList,
    history: History,
    bus: EventBus,
    drag: Option<ActiveDrag>,
    resize: Option<ActiveResize>,
    attribute_change: Option<PendingAttributeChange>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Session {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            scale: FrameScale::from_config(&config),
            list: TrackList::from_config(&config),
            history: History::new(config.history_capacity),
            bus: EventBus::new(),
            drag: None,
            resize: None,
            attribute_change: None,
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn scale(&self) -> &FrameScale {
        &self.scale
    }

    /// Use a fixed frame width instead of the zoom curve.
    pub fn set_scale(&mut self, scale: FrameScale) {
        self.scale = scale;
    }

    /// Lay the ruler out again for a container width and zoom level.
    pub fn update_scale(&mut self, container_width: f64, zoom: f64) -> bool {
        self.scale
            .update(container_width, self.list.max_frame().0, zoom)
    }

    pub fn timeline(&self) -> &TrackList {
        &self.list
    }

    pub fn snapshot(&self) -> TimelineData {
        self.list.to_data()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.bus.subscribe(listener);
    }

    /// Lane layout as drawn: stacked from the blank area at the top.
    pub fn geometry(&self) -> TrackGeometry {
        TrackGeometry::stacked(
            &self.list,
            self.config.blank_top_px,
            self.config.track_interval_px,
        )
    }

    pub fn select(&mut self, id: Option<Uuid>) {
        self.list.select(id);
        self.flush(false);
    }

    // -----------------------------------------------------------------------
    // Drag
    // -----------------------------------------------------------------------

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Start dragging a new item in. `grab_offset_x` is the pointer's distance
    /// from the item's left edge.
    pub fn begin_insert_drag(&mut self, item: TrackItem, grab_offset_x: f64) -> Result<()> {
        self.ensure_idle()?;
        let gesture = DragGesture::begin_insert(
            item,
            self.geometry(),
            self.scale,
            &self.config,
            grab_offset_x,
        );
        self.drag = Some(ActiveDrag {
            gesture,
            pending: PendingDrop::Add(AddItemAction::begin(&self.list)),
        });
        Ok(())
    }

    pub fn begin_move_drag(&mut self, item_id: Uuid, grab_offset_x: f64) -> Result<()> {
        self.ensure_idle()?;
        let gesture = DragGesture::begin_move(
            &self.list,
            item_id,
            self.geometry(),
            self.scale,
            &self.config,
            grab_offset_x,
        )?;
        self.drag = Some(ActiveDrag {
            gesture,
            pending: PendingDrop::Move(MoveItemAction::begin(&self.list, item_id)?),
        });
        Ok(())
    }

    /// Pointer moved. Returns the preview to draw, `None` when the pointer is
    /// outside the drop area.
    pub fn drag_to(&mut self, pointer: Point) -> Result<Option<DragPreview>> {
        let drag = self.drag.as_mut().ok_or(CoreError::NoActiveGesture)?;
        Ok(drag.gesture.update(pointer).cloned())
    }

    /// Pointer released. Commits the drop and records it in the history.
    pub fn release_drag(&mut self, pointer: Point) -> Result<Option<DragOutcome>> {
        let ActiveDrag { gesture, pending } = self.drag.take().ok_or(CoreError::NoActiveGesture)?;
        let result = gesture.release(pointer, &mut self.list);
        let outcome = match result {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                self.flush(false);
                return Ok(None);
            }
            Err(err) => {
                self.flush(false);
                return Err(err);
            }
        };

        let action: Option<Box<dyn Action>> = match pending {
            PendingDrop::Add(pending) => {
                Some(Box::new(pending.end(&self.list, &outcome)?) as Box<dyn Action>)
            }
            PendingDrop::Move(pending) => pending
                .end(&self.list, &outcome)?
                .map(|a| Box::new(a) as Box<dyn Action>),
        };
        let recorded = action.is_some();
        if let Some(action) = action {
            self.history.record(action);
        }
        self.list.select(Some(outcome.item_id));
        self.flush(recorded);
        Ok(Some(outcome))
    }

    /// Drop the gesture without touching the timeline.
    pub fn cancel_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    // -----------------------------------------------------------------------
    // Delete / split
    // -----------------------------------------------------------------------

    pub fn delete_item(&mut self, id: Uuid) -> Result<()> {
        self.ensure_idle()?;
        let action = DeleteItemAction::new(&self.list, id)?;
        self.list
            .remove_track_item(id)
            .ok_or(CoreError::ItemNotFound(id))?;
        self.history.record(Box::new(action));
        self.flush(true);
        Ok(())
    }

    /// Delete the selected item. Returns `false` when nothing is selected.
    pub fn delete_selected(&mut self) -> Result<bool> {
        match self.list.selected_id() {
            Some(id) => self.delete_item(id).map(|_| true),
            None => Ok(false),
        }
    }

    /// Split the selected item at `frame`, or the item under the playhead
    /// when nothing is selected. Returns the id of the right half.
    pub fn split_at(&mut self, frame: Frame) -> Result<Uuid> {
        let id = match self.list.selected_id() {
            Some(id) => id,
            None => self
                .list
                .item_at_frame(frame)
                .map(TrackItem::id)
                .ok_or_else(|| CoreError::InvalidOperation(format!("no item at {}", frame)))?,
        };
        self.split_item(id, frame)
    }

    pub fn split_item(&mut self, id: Uuid, frame: Frame) -> Result<Uuid> {
        self.ensure_idle()?;
        let item = self
            .list
            .get_track_item(id)
            .ok_or(CoreError::ItemNotFound(id))?;
        if !(item.start_frame() < frame && frame < item.end_frame()) {
            return Err(CoreError::InvalidOperation(format!(
                "cannot split {}..{} at {}",
                item.start_frame(),
                item.end_frame(),
                frame
            )));
        }
        let action = SplitItemAction::split(&mut self.list, id, frame)?;
        let right = action.right_id();
        self.history.record(Box::new(action));
        self.flush(true);
        Ok(right)
    }

    // -----------------------------------------------------------------------
    // Resize
    // -----------------------------------------------------------------------

    pub fn begin_resize(&mut self, id: Uuid, edge: ResizeEdge) -> Result<()> {
        self.ensure_idle()?;
        self.resize = Some(ActiveResize {
            pending: ResizeItemAction::begin(&self.list, id)?,
            edge,
        });
        Ok(())
    }

    /// Drag the active edge towards `frame`. The edge stops at neighbouring
    /// items, at the source media bounds and one frame short of the other
    /// edge. Returns where it actually landed.
    pub fn resize_to(&mut self, frame: Frame) -> Result<Frame> {
        let (id, edge) = match &self.resize {
            Some(active) => (active.pending.item_id(), active.edge),
            None => return Err(CoreError::NoActiveGesture),
        };
        let (track_index, _) = self
            .list
            .find_item_location(id)
            .ok_or(CoreError::ItemNotFound(id))?;
        let siblings = self.list.tracks()[track_index].items();
        let item = self
            .list
            .get_track_item(id)
            .ok_or(CoreError::ItemNotFound(id))?;

        let landed = match edge {
            ResizeEdge::Start => {
                let floor = item
                    .get_allowed_min_frame(siblings)
                    .unwrap_or(Frame::ZERO)
                    .max(Frame::ZERO);
                let ceiling = item.end_frame() - Frame(1);
                frame.max(floor).min(ceiling)
            }
            ResizeEdge::End => {
                let floor = item.start_frame() + Frame(1);
                let clamped = match item.get_allowed_max_frame(siblings) {
                    Some(ceiling) => frame.min(ceiling),
                    None => frame,
                };
                clamped.max(floor)
            }
        };

        let item = self
            .list
            .get_track_item_mut(id)
            .ok_or(CoreError::ItemNotFound(id))?;
        match edge {
            ResizeEdge::Start => item.set_start_frame(landed),
            ResizeEdge::End => item.set_end_frame(landed),
        }
        self.list.item_changed(id);
        self.flush(false);
        Ok(landed)
    }

    /// Finish the trim. Returns `true` when something changed and was recorded.
    pub fn end_resize(&mut self) -> Result<bool> {
        let active = self.resize.take().ok_or(CoreError::NoActiveGesture)?;
        let id = active.pending.item_id();
        let recorded = match active.pending.end(&self.list)? {
            Some(action) => {
                if let Some(item) = self.list.get_track_item_mut(id) {
                    item.record_before_drag_frame();
                }
                self.history.record(Box::new(action));
                true
            }
            None => false,
        };
        self.flush(recorded);
        Ok(recorded)
    }

    // -----------------------------------------------------------------------
    // Attribute / text
    // -----------------------------------------------------------------------

    /// Start a transform gesture on a visual item in the player.
    pub fn begin_attribute_change(&mut self, id: Uuid) -> Result<()> {
        self.ensure_idle()?;
        self.attribute_change = Some(AttributeChangeAction::begin(&self.list, id)?);
        Ok(())
    }

    pub fn set_attribute(&mut self, key: AttributeKey, value: f64) -> Result<()> {
        let id = self
            .attribute_change
            .as_ref()
            .map(PendingAttributeChange::item_id)
            .ok_or(CoreError::NoActiveGesture)?;
        let item = self
            .list
            .get_track_item_mut(id)
            .ok_or(CoreError::ItemNotFound(id))?;
        let attribute = item.attribute.get_or_insert_with(Attribute::default);
        attribute.set(key, value);
        self.list.item_changed(id);
        self.flush(false);
        Ok(())
    }

    pub fn end_attribute_change(&mut self) -> Result<bool> {
        let pending = self
            .attribute_change
            .take()
            .ok_or(CoreError::NoActiveGesture)?;
        let recorded = match pending.end(&self.list)? {
            Some(action) => {
                tracing::debug!(keys = ?action.changed_keys(), "attribute change");
                self.history.record(Box::new(action));
                true
            }
            None => false,
        };
        self.flush(recorded);
        Ok(recorded)
    }

    /// Replace a text item's content. `attribute` carries the resized text box
    /// when the caller measured one.
    pub fn edit_text(
        &mut self,
        id: Uuid,
        text: impl Into<String>,
        attribute: Option<Attribute>,
    ) -> Result<bool> {
        self.ensure_idle()?;
        let recorded = match TextEditAction::apply(&mut self.list, id, text.into(), attribute)? {
            Some(action) => {
                self.history.record(Box::new(action));
                true
            }
            None => false,
        };
        self.flush(recorded);
        Ok(recorded)
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Undo the last action. `Ok(false)` when there is nothing to undo.
    /// Refused while a gesture is in progress.
    pub fn undo(&mut self) -> Result<bool> {
        self.ensure_idle()?;
        let done = self.history.undo(&mut self.list);
        if done {
            self.drop_stale_selection();
            self.flush(true);
        }
        Ok(done)
    }

    pub fn redo(&mut self) -> Result<bool> {
        self.ensure_idle()?;
        let done = self.history.redo(&mut self.list);
        if done {
            self.drop_stale_selection();
            self.flush(true);
        }
        Ok(done)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_idle(&self) -> Result<()> {
        if self.drag.is_some() || self.resize.is_some() || self.attribute_change.is_some() {
            return Err(CoreError::InvalidOperation(
                "another gesture is already in progress".into(),
            ));
        }
        Ok(())
    }

    fn drop_stale_selection(&mut self) {
        if let Some(id) = self.list.selected_id() {
            if self.list.get_track_item(id).is_none() {
                self.list.select(None);
            }
        }
    }

    fn flush(&mut self, history_changed: bool) {
        for event in self.list.take_events() {
            self.bus.emit(&event);
        }
        if history_changed {
            self.bus.emit(&TimelineEvent::HistoryChanged {
                can_undo: self.history.can_undo(),
                can_redo: self.history.can_redo(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
