use std::collections::VecDeque;

use uuid::Uuid;

use crate::coords::Frame;
use crate::drag::{DragOutcome, TrackReorder};
use crate::error::{CoreError, Result};
use crate::item::{Attribute, AttributeKey, TrackItem};
use crate::snapshot::{TrackData, TrackItemData};
use crate::track::Track;
use crate::track_list::TrackList;

/// A completed edit that can be reverted and re-applied.
pub trait Action: std::fmt::Debug {
    fn undo(&self, list: &mut TrackList) -> Result<()>;
    fn redo(&self, list: &mut TrackList) -> Result<()>;
    fn description(&self) -> &str;
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Bounded undo/redo stacks. Once full, recording drops the oldest entry.
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<Box<dyn Action>>,
    redo_stack: Vec<Box<dyn Action>>,
    max_size: usize,
    loading: bool,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_size,
            loading: false,
        }
    }

    /// Push a finished action and forget everything that could be redone.
    pub fn record(&mut self, action: Box<dyn Action>) {
        if self.loading {
            tracing::debug!(
                action = action.description(),
                "ignoring action recorded during undo/redo"
            );
            return;
        }
        tracing::debug!(action = action.description(), "recorded");
        self.redo_stack.clear();
        self.undo_stack.push_back(action);
        while self.undo_stack.len() > self.max_size {
            if let Some(dropped) = self.undo_stack.pop_front() {
                tracing::debug!(action = dropped.description(), "history full, dropped oldest");
            }
        }
    }

    /// Revert the newest action. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, list: &mut TrackList) -> bool {
        let Some(action) = self.undo_stack.pop_back() else {
            return false;
        };
        self.loading = true;
        if let Err(err) = action.undo(list) {
            tracing::warn!(action = action.description(), %err, "undo could not restore state");
        }
        self.loading = false;
        self.redo_stack.push(action);
        true
    }

    /// Re-apply the last undone action. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self, list: &mut TrackList) -> bool {
        let Some(action) = self.redo_stack.pop() else {
            return false;
        };
        self.loading = true;
        if let Err(err) = action.redo(list) {
            tracing::warn!(action = action.description(), %err, "redo could not restore state");
        }
        self.loading = false;
        self.undo_stack.push_back(action);
        true
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn can_undo(&self) -> bool {
        !self.loading && !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.loading && !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|a| a.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|a| a.description())
    }

    /// Entries that can be undone.
    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

// ---------------------------------------------------------------------------
// Captured state
// ---------------------------------------------------------------------------

/// Where an item sat and what its track looked like, enough to recreate the
/// track if it has been pruned since.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemState {
    pub item: TrackItemData,
    pub track: TrackData,
    pub track_index: usize,
    pub item_index: usize,
}

impl ItemState {
    pub fn capture(list: &TrackList, id: Uuid) -> Result<Self> {
        let (track_index, item_index) = list
            .find_item_location(id)
            .ok_or(CoreError::ItemNotFound(id))?;
        let track = &list.tracks()[track_index];
        Ok(Self {
            item: track.items()[item_index].to_data(),
            track: track.to_data(),
            track_index,
            item_index,
        })
    }

    pub fn item_id(&self) -> Uuid {
        self.item.base.id
    }

    fn same_place(&self, other: &ItemState) -> bool {
        self.item == other.item
            && self.track.base.id == other.track.base.id
            && self.track_index == other.track_index
            && self.item_index == other.item_index
    }
}

/// Put an item back exactly as captured, recreating its track first if
/// empty-track cleanup removed it.
fn restore(list: &mut TrackList, state: &ItemState) -> Result<()> {
    let item = TrackItem::from_data(&state.item)?;
    let track_id = state.track.base.id;
    if list.find_track(track_id).is_none() {
        if list.take_track_item(item.id()).is_some() {
            list.remove_empty_tracks();
        }
        let shape = TrackData {
            items: Vec::new(),
            ..state.track.clone()
        };
        let track = Track::from_data(&shape, list.heights())?;
        tracing::debug!(track = %track_id, index = state.track_index, "recreating pruned track");
        list.insert_track(track, state.track_index)?;
    }
    list.restore_track_item(track_id, item, state.item_index)
}

fn remove(list: &mut TrackList, id: Uuid) -> Result<()> {
    list.remove_track_item(id)
        .map(|_| ())
        .ok_or(CoreError::ItemNotFound(id))
}

/// Frame bounds and trim window of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameWindow {
    start: Frame,
    end: Frame,
    min: Frame,
}

impl FrameWindow {
    fn of(item: &TrackItem) -> Self {
        Self {
            start: item.start_frame(),
            end: item.end_frame(),
            min: item.min_frame,
        }
    }

    fn capture(list: &TrackList, id: Uuid) -> Result<Self> {
        list.get_track_item(id)
            .map(Self::of)
            .ok_or(CoreError::ItemNotFound(id))
    }

    fn apply(&self, list: &mut TrackList, id: Uuid) -> Result<()> {
        let item = list
            .get_track_item_mut(id)
            .ok_or(CoreError::ItemNotFound(id))?;
        item.set_start_frame(self.start);
        item.set_end_frame(self.end);
        item.min_frame = self.min;
        item.record_before_drag_frame();
        list.item_changed(id);
        Ok(())
    }
}

/// States of Main's items before a drop, kept in case the drop promotes them.
fn capture_main(list: &TrackList) -> Vec<ItemState> {
    list.main_track()
        .items()
        .iter()
        .filter_map(|i| ItemState::capture(list, i.id()).ok())
        .collect()
}

fn displaced_states(
    list: &TrackList,
    main_before: Vec<ItemState>,
    outcome: &DragOutcome,
) -> Result<Vec<(ItemState, ItemState)>> {
    let Some(promotion) = &outcome.promotion else {
        return Ok(Vec::new());
    };
    let mut pairs = Vec::with_capacity(promotion.items.len());
    for before in main_before {
        if promotion.items.contains(&before.item_id()) {
            let after = ItemState::capture(list, before.item_id())?;
            pairs.push((before, after));
        }
    }
    Ok(pairs)
}

// ---------------------------------------------------------------------------
// AddItemAction
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AddItemAction {
    after: ItemState,
    displaced: Vec<(ItemState, ItemState)>,
}

/// Capture taken when an insert drag starts.
#[derive(Debug)]
pub struct PendingAdd {
    main_before: Vec<ItemState>,
}

impl AddItemAction {
    pub fn begin(list: &TrackList) -> PendingAdd {
        PendingAdd {
            main_before: capture_main(list),
        }
    }
}

impl PendingAdd {
    pub fn end(self, list: &TrackList, outcome: &DragOutcome) -> Result<AddItemAction> {
        Ok(AddItemAction {
            after: ItemState::capture(list, outcome.item_id)?,
            displaced: displaced_states(list, self.main_before, outcome)?,
        })
    }
}

impl Action for AddItemAction {
    fn undo(&self, list: &mut TrackList) -> Result<()> {
        for (before, _) in &self.displaced {
            restore(list, before)?;
        }
        remove(list, self.after.item_id())
    }

    fn redo(&self, list: &mut TrackList) -> Result<()> {
        restore(list, &self.after)?;
        for (_, after) in &self.displaced {
            restore(list, after)?;
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Add item"
    }
}

// ---------------------------------------------------------------------------
// DeleteItemAction
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DeleteItemAction {
    before: ItemState,
}

impl DeleteItemAction {
    /// Capture an item about to be deleted.
    pub fn new(list: &TrackList, id: Uuid) -> Result<Self> {
        Ok(Self {
            before: ItemState::capture(list, id)?,
        })
    }
}

impl Action for DeleteItemAction {
    fn undo(&self, list: &mut TrackList) -> Result<()> {
        restore(list, &self.before)
    }

    fn redo(&self, list: &mut TrackList) -> Result<()> {
        remove(list, self.before.item_id())
    }

    fn description(&self) -> &str {
        "Delete item"
    }
}

// ---------------------------------------------------------------------------
// MoveItemAction
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MoveItemAction {
    before: ItemState,
    after: ItemState,
    displaced: Vec<(ItemState, ItemState)>,
    reorder: Option<TrackReorder>,
}

/// Capture taken when a move drag starts.
#[derive(Debug)]
pub struct PendingMove {
    before: ItemState,
    main_before: Vec<ItemState>,
}

impl MoveItemAction {
    pub fn begin(list: &TrackList, id: Uuid) -> Result<PendingMove> {
        Ok(PendingMove {
            before: ItemState::capture(list, id)?,
            main_before: capture_main(list),
        })
    }
}

impl PendingMove {
    /// `None` when the drop left the item where it was.
    pub fn end(self, list: &TrackList, outcome: &DragOutcome) -> Result<Option<MoveItemAction>> {
        let after = ItemState::capture(list, outcome.item_id)?;
        let displaced = displaced_states(list, self.main_before, outcome)?;
        let moved_track = outcome.reorder.is_some_and(|r| r.from != r.to);
        if self.before.same_place(&after) && displaced.is_empty() && !moved_track {
            return Ok(None);
        }
        Ok(Some(MoveItemAction {
            before: self.before,
            after,
            displaced,
            reorder: outcome.reorder,
        }))
    }
}

impl Action for MoveItemAction {
    fn undo(&self, list: &mut TrackList) -> Result<()> {
        for (before, _) in &self.displaced {
            restore(list, before)?;
        }
        restore(list, &self.before)?;
        if let Some(reorder) = self.reorder {
            list.move_track(reorder.to, reorder.from);
        }
        Ok(())
    }

    fn redo(&self, list: &mut TrackList) -> Result<()> {
        if let Some(reorder) = self.reorder {
            list.move_track(reorder.from, reorder.to);
        }
        // Mirror of undo: the dragged item lands first so its emptied source
        // track is gone before the promoted track is recreated.
        restore(list, &self.after)?;
        for (_, after) in &self.displaced {
            restore(list, after)?;
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Move item"
    }
}

// ---------------------------------------------------------------------------
// ResizeItemAction
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ResizeItemAction {
    item_id: Uuid,
    before: FrameWindow,
    after: FrameWindow,
}

#[derive(Debug)]
pub struct PendingResize {
    item_id: Uuid,
    before: FrameWindow,
}

impl ResizeItemAction {
    pub fn begin(list: &TrackList, id: Uuid) -> Result<PendingResize> {
        Ok(PendingResize {
            item_id: id,
            before: FrameWindow::capture(list, id)?,
        })
    }
}

impl PendingResize {
    pub fn item_id(&self) -> Uuid {
        self.item_id
    }

    /// `None` when the trim ended where it started.
    pub fn end(self, list: &TrackList) -> Result<Option<ResizeItemAction>> {
        let after = FrameWindow::capture(list, self.item_id)?;
        if after == self.before {
            return Ok(None);
        }
        Ok(Some(ResizeItemAction {
            item_id: self.item_id,
            before: self.before,
            after,
        }))
    }
}

impl Action for ResizeItemAction {
    fn undo(&self, list: &mut TrackList) -> Result<()> {
        self.before.apply(list, self.item_id)
    }

    fn redo(&self, list: &mut TrackList) -> Result<()> {
        self.after.apply(list, self.item_id)
    }

    fn description(&self) -> &str {
        "Resize item"
    }
}

// ---------------------------------------------------------------------------
// SplitItemAction
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SplitItemAction {
    item_id: Uuid,
    before: FrameWindow,
    left: FrameWindow,
    right: ItemState,
}

impl SplitItemAction {
    /// Split `id` at `at` and capture both halves.
    pub fn split(list: &mut TrackList, id: Uuid, at: Frame) -> Result<Self> {
        let before = FrameWindow::capture(list, id)?;
        let right_id = list.split_track_item(id, at)?;
        Ok(Self {
            item_id: id,
            before,
            left: FrameWindow::capture(list, id)?,
            right: ItemState::capture(list, right_id)?,
        })
    }

    pub fn right_id(&self) -> Uuid {
        self.right.item_id()
    }
}

impl Action for SplitItemAction {
    fn undo(&self, list: &mut TrackList) -> Result<()> {
        remove(list, self.right.item_id())?;
        self.before.apply(list, self.item_id)
    }

    fn redo(&self, list: &mut TrackList) -> Result<()> {
        self.left.apply(list, self.item_id)?;
        restore(list, &self.right)
    }

    fn description(&self) -> &str {
        "Split item"
    }
}

// ---------------------------------------------------------------------------
// AttributeChangeAction
// ---------------------------------------------------------------------------

fn attribute_of(list: &TrackList, id: Uuid) -> Result<Attribute> {
    list.get_track_item(id)
        .ok_or(CoreError::ItemNotFound(id))?
        .attribute
        .ok_or_else(|| CoreError::InvalidOperation(format!("item {} has no attribute", id)))
}

fn set_attribute(list: &mut TrackList, id: Uuid, attribute: Attribute) -> Result<()> {
    list.get_track_item_mut(id)
        .ok_or(CoreError::ItemNotFound(id))?
        .attribute = Some(attribute);
    list.item_changed(id);
    Ok(())
}

const ALL_KEYS: [AttributeKey; 7] = [
    AttributeKey::TopRatio,
    AttributeKey::LeftRatio,
    AttributeKey::WidthRatio,
    AttributeKey::HeightRatio,
    AttributeKey::Rotate,
    AttributeKey::Scale,
    AttributeKey::Opacity,
];

#[derive(Debug)]
pub struct AttributeChangeAction {
    item_id: Uuid,
    before: Attribute,
    after: Attribute,
}

#[derive(Debug)]
pub struct PendingAttributeChange {
    item_id: Uuid,
    before: Attribute,
}

impl AttributeChangeAction {
    pub fn begin(list: &TrackList, id: Uuid) -> Result<PendingAttributeChange> {
        Ok(PendingAttributeChange {
            item_id: id,
            before: attribute_of(list, id)?,
        })
    }

    pub fn changed_keys(&self) -> Vec<AttributeKey> {
        ALL_KEYS
            .into_iter()
            .filter(|k| self.before.get(*k) != self.after.get(*k))
            .collect()
    }
}

impl PendingAttributeChange {
    pub fn item_id(&self) -> Uuid {
        self.item_id
    }

    pub fn end(self, list: &TrackList) -> Result<Option<AttributeChangeAction>> {
        let after = attribute_of(list, self.item_id)?;
        if after == self.before {
            return Ok(None);
        }
        Ok(Some(AttributeChangeAction {
            item_id: self.item_id,
            before: self.before,
            after,
        }))
    }
}

impl Action for AttributeChangeAction {
    fn undo(&self, list: &mut TrackList) -> Result<()> {
        set_attribute(list, self.item_id, self.before)
    }

    fn redo(&self, list: &mut TrackList) -> Result<()> {
        set_attribute(list, self.item_id, self.after)
    }

    fn description(&self) -> &str {
        "Change attribute"
    }
}

// ---------------------------------------------------------------------------
// TextEditAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct TextState {
    text: Option<String>,
    attribute: Option<Attribute>,
}

impl TextState {
    fn capture(list: &TrackList, id: Uuid) -> Result<Self> {
        let item = list.get_track_item(id).ok_or(CoreError::ItemNotFound(id))?;
        Ok(Self {
            text: item.text.clone(),
            attribute: item.attribute,
        })
    }

    fn apply(&self, list: &mut TrackList, id: Uuid) -> Result<()> {
        let item = list
            .get_track_item_mut(id)
            .ok_or(CoreError::ItemNotFound(id))?;
        item.text = self.text.clone();
        item.attribute = self.attribute;
        list.item_changed(id);
        Ok(())
    }
}

/// Text content edit. The attribute is captured too since editing text
/// resizes the box.
#[derive(Debug)]
pub struct TextEditAction {
    item_id: Uuid,
    before: TextState,
    after: TextState,
}

impl TextEditAction {
    /// Replace the text (and optionally the attribute) of a text item.
    /// Returns `None` when nothing changed.
    pub fn apply(
        list: &mut TrackList,
        id: Uuid,
        text: String,
        attribute: Option<Attribute>,
    ) -> Result<Option<Self>> {
        let before = TextState::capture(list, id)?;
        if before.text.is_none() {
            return Err(CoreError::InvalidOperation(format!(
                "item {} is not a text item",
                id
            )));
        }
        let after = TextState {
            text: Some(text),
            attribute: attribute.or(before.attribute),
        };
        if after == before {
            return Ok(None);
        }
        after.apply(list, id)?;
        Ok(Some(Self {
            item_id: id,
            before,
            after,
        }))
    }
}

impl Action for TextEditAction {
    fn undo(&self, list: &mut TrackList) -> Result<()> {
        self.before.apply(list, self.item_id)
    }

    fn redo(&self, list: &mut TrackList) -> Result<()> {
        self.after.apply(list, self.item_id)
    }

    fn description(&self) -> &str {
        "Edit text"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
