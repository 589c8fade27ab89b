use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::Frame;
use crate::error::{CoreError, Result};
use crate::interval::FrameRange;
use crate::item::{Attribute, ItemKind, TrackItem};
use crate::resource::Resource;
use crate::track::{Track, TrackHeights, TrackKind};
use crate::track_list::TrackList;

// ---------------------------------------------------------------------------
// Item snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemBase {
    pub id: Uuid,
    pub start_frame: Frame,
    pub end_frame: Frame,
    pub min_frame: Frame,
    pub parent_track_id: Option<Uuid>,
}

/// Plain structural copy of a [`TrackItem`], used by the undo history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackItemData {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub base: ItemBase,
    pub resource: Resource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl TrackItem {
    pub fn to_data(&self) -> TrackItemData {
        TrackItemData {
            kind: self.kind(),
            base: ItemBase {
                id: self.id(),
                start_frame: self.start_frame(),
                end_frame: self.end_frame(),
                min_frame: self.min_frame,
                parent_track_id: self.parent_track(),
            },
            resource: self.resource().clone(),
            attribute: self.attribute,
            text: self.text.clone(),
        }
    }

    /// Rebuild an item with its original id. The parent track id is kept so
    /// re-adding the item treats it as a re-placement.
    pub fn from_data(data: &TrackItemData) -> Result<Self> {
        let base = &data.base;
        if base.start_frame >= base.end_frame {
            return Err(CoreError::MalformedSnapshot(format!(
                "item {} has an empty range {}..{}",
                base.id, base.start_frame, base.end_frame
            )));
        }

        let mut item = TrackItem::restore(
            base.id,
            FrameRange::new(base.start_frame, base.end_frame),
            base.min_frame,
            data.resource.clone(),
            data.attribute,
            data.text.clone(),
        );
        if item.kind() != data.kind {
            return Err(CoreError::MalformedSnapshot(format!(
                "item {} is tagged {:?} but holds a {:?} resource",
                base.id,
                data.kind,
                item.kind()
            )));
        }
        if !data.kind.is_visual() {
            item.attribute = None;
        } else if item.attribute.is_none() {
            item.attribute = Some(Attribute::default());
        }
        item.parent_track = base.parent_track_id;
        Ok(item)
    }
}

// ---------------------------------------------------------------------------
// Track snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackBase {
    pub id: Uuid,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackData {
    #[serde(rename = "type")]
    pub kind: TrackKind,
    pub base: TrackBase,
    pub items: Vec<TrackItemData>,
}

impl Track {
    pub fn to_data(&self) -> TrackData {
        TrackData {
            kind: self.kind(),
            base: TrackBase {
                id: self.id(),
                height: self.height(),
            },
            items: self.items().iter().map(TrackItem::to_data).collect(),
        }
    }

    /// Recreate a pruned track. The main track is never pruned, so a main
    /// snapshot here means the data is wrong.
    pub fn from_data(data: &TrackData, heights: TrackHeights) -> Result<Self> {
        if data.kind == TrackKind::Main {
            return Err(CoreError::MalformedSnapshot(
                "the main track cannot be recreated".into(),
            ));
        }
        let mut track = Track::with_id(data.base.id, data.kind, heights);
        for item in &data.items {
            let item = TrackItem::from_data(item)?;
            if !track.accepts(item.kind()) {
                return Err(CoreError::KindNotAllowed {
                    item: item.kind(),
                    track: data.kind,
                });
            }
            track.push_item_with_no_effect(item);
        }
        Ok(track)
    }
}

// ---------------------------------------------------------------------------
// Timeline snapshot
// ---------------------------------------------------------------------------

/// Read-only view of the whole timeline, top lane first.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineData {
    pub max_frame: Frame,
    pub selected_id: Option<Uuid>,
    pub tracks: Vec<TrackData>,
}

impl TrackList {
    pub fn to_data(&self) -> TimelineData {
        TimelineData {
            max_frame: self.max_frame(),
            selected_id: self.selected_id(),
            tracks: self.tracks().iter().map(Track::to_data).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::*;
    use proptest::prelude::*;

    #[test]
    fn item_round_trip_keeps_identity() {
        let mut item = at(text(90), 15, 75);
        item.min_frame = Frame(15);
        item.text = Some("Hi".to_string());
        item.attribute = Some(Attribute {
            rotate: 30.0,
            ..Attribute::default()
        });

        let back = TrackItem::from_data(&item.to_data()).unwrap();
        assert_eq!(back.id(), item.id());
        assert_eq!(back.range(), item.range());
        assert_eq!(back.min_frame, item.min_frame);
        assert_eq!(back.attribute, item.attribute);
        assert_eq!(back.text, item.text);
    }

    #[test]
    fn item_json_shape() {
        let item = at(video(100), 0, 40);
        let json = serde_json::to_value(item.to_data()).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["base"]["startFrame"], 0);
        assert_eq!(json["base"]["endFrame"], 40);
        assert!(json["base"]["parentTrackId"].is_null());
        assert!(json.get("text").is_none());
    }

    #[test]
    fn mismatched_tag_is_malformed() {
        let mut data = at(video(100), 0, 40).to_data();
        data.kind = ItemKind::Audio;
        assert!(matches!(
            TrackItem::from_data(&data).unwrap_err(),
            CoreError::MalformedSnapshot(_)
        ));
    }

    #[test]
    fn empty_range_is_malformed() {
        let data = at(video(100), 40, 40).to_data();
        assert!(TrackItem::from_data(&data).is_err());
    }

    #[test]
    fn track_round_trip() {
        let heights = TrackHeights::default();
        let mut track = Track::new_video(heights);
        track.push_item_with_no_effect(at(video(100), 0, 40));
        track.push_item_with_no_effect(at(sticker(60), 50, 110));

        let back = Track::from_data(&track.to_data(), heights).unwrap();
        assert_eq!(back.id(), track.id());
        assert_eq!(back.height(), track.height());
        assert_eq!(back.to_data(), track.to_data());
    }

    #[test]
    fn main_track_cannot_be_recreated() {
        let data = Track::new_main(TrackHeights::default()).to_data();
        assert!(matches!(
            Track::from_data(&data, TrackHeights::default()).unwrap_err(),
            CoreError::MalformedSnapshot(_)
        ));
    }

    #[test]
    fn refused_item_in_track_snapshot() {
        let heights = TrackHeights::default();
        let mut data = Track::new_audio(heights).to_data();
        data.items.push(at(video(100), 0, 40).to_data());
        assert!(matches!(
            Track::from_data(&data, heights).unwrap_err(),
            CoreError::KindNotAllowed { .. }
        ));
    }

    #[test]
    fn timeline_view_lists_tracks_top_down() {
        let mut list = TrackList::default();
        let track = list.create_track(TrackKind::Audio);
        let audio_id = list.insert_track(track, 1).unwrap();
        list.add_track_item(audio_id, at(audio(90), 0, 90)).unwrap();

        let data = list.to_data();
        assert_eq!(data.tracks.len(), 2);
        assert_eq!(data.tracks[0].kind, TrackKind::Main);
        assert_eq!(data.tracks[1].kind, TrackKind::Audio);
        assert_eq!(data.max_frame, Frame(90));
    }

    proptest! {
        #[test]
        fn round_trip_any_range(start in 0i64..10_000, len in 1i64..5_000, min in 0i64..10_000) {
            let mut item = at(video(20_000), start, start + len);
            item.min_frame = Frame(min);
            let back = TrackItem::from_data(&item.to_data()).unwrap();
            prop_assert_eq!(back.id(), item.id());
            prop_assert_eq!(back.range(), item.range());
            prop_assert_eq!(back.min_frame, item.min_frame);
            prop_assert_eq!(back.attribute, item.attribute);
        }
    }
}
