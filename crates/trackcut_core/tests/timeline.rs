use proptest::prelude::*;
use trackcut_core::resource::{AudioResource, StickerResource, TextResource, VideoResource};
use trackcut_core::snapshot::TimelineData;
use trackcut_core::{
    preset_default, preset_precise, AttributeKey, EditorConfig, Frame, FrameScale, Placement, Point,
    ResizeEdge, Resource, Session, TimelineEvent, TrackItem, TrackKind,
};
use std::cell::RefCell;
use std::rc::Rc;

// Lanes are stacked from y = 40 with 8px between them. Main and video lanes
// are 60px tall, text/sticker/audio-only lanes 24px.

fn video(frame_count: i64) -> TrackItem {
    TrackItem::new(Resource::Video(VideoResource {
        name: "clip.mp4".into(),
        format: "mp4".into(),
        source: "/media/clip.mp4".into(),
        width: 1920,
        height: 1080,
        fps: 30.0,
        frame_count,
    }))
}

fn audio(frame_count: i64) -> TrackItem {
    TrackItem::new(Resource::Audio(AudioResource {
        name: "music.mp3".into(),
        format: "mp3".into(),
        source: "/media/music.mp3".into(),
        duration: frame_count as f64 / 30.0,
        frame_count,
    }))
}

fn text(frame_count: i64) -> TrackItem {
    TrackItem::new(Resource::Text(TextResource {
        name: "Title".into(),
        frame_count,
    }))
}

fn sticker(frame_count: i64) -> TrackItem {
    TrackItem::new(Resource::Sticker(StickerResource {
        name: "star.gif".into(),
        format: "gif".into(),
        source: "/media/star.gif".into(),
        width: 200,
        height: 200,
        frame_count,
    }))
}

fn session_with(config: EditorConfig, frame_width: f64) -> Session {
    let mut session = Session::new(config);
    session.set_scale(FrameScale::fixed(frame_width));
    session
}

fn drop_item(session: &mut Session, item: TrackItem, x: f64, y: f64) -> uuid::Uuid {
    let id = item.id();
    session.begin_insert_drag(item, 0.0).unwrap();
    session.drag_to(Point::new(x, y)).unwrap();
    session
        .release_drag(Point::new(x, y))
        .unwrap()
        .expect("drop inside the track area");
    id
}

fn main_count(data: &TimelineData) -> usize {
    data.tracks.iter().filter(|t| t.kind == TrackKind::Main).count()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn empty_timeline_drop_goes_to_main_at_zero() {
    let mut s = session_with(preset_default(), 1.0);
    let id = drop_item(&mut s, video(120), 480.0, 300.0);

    let main = s.timeline().main_track();
    assert_eq!(s.timeline().len(), 1);
    assert_eq!(main.items()[0].id(), id);
    assert_eq!(main.items()[0].start_frame(), Frame::ZERO);
    assert_eq!(s.timeline().max_frame(), Frame(120));
}

#[test]
fn split_produces_adjacent_halves() {
    let mut s = session_with(preset_default(), 1.0);
    let id = drop_item(&mut s, video(100), 0.0, 70.0);

    let right = s.split_at(Frame(40)).unwrap();
    let list = s.timeline();
    let left = list.get_track_item(id).unwrap();
    let right = list.get_track_item(right).unwrap();
    assert_eq!((left.start_frame(), left.end_frame()), (Frame(0), Frame(40)));
    assert_eq!((right.start_frame(), right.end_frame()), (Frame(40), Frame(100)));
    assert_eq!(left.min_frame, right.min_frame);
    assert_eq!(left.parent_track(), right.parent_track());

    assert!(s.undo().unwrap());
    assert_eq!(s.timeline().track_item_count(), 1);
    assert_eq!(s.timeline().get_track_item(id).unwrap().end_frame(), Frame(100));
}

#[test]
fn colliding_drop_opens_a_new_track() {
    let mut s = session_with(preset_precise(), 1.0);
    drop_item(&mut s, video(100), 0.0, 70.0);
    // Above every lane: new overlay track holding [10, 20).
    let first = drop_item(&mut s, sticker(10), 10.0, 10.0);
    let overlay = s.timeline().get(0).unwrap().id();
    assert_eq!(s.timeline().get_track_item(first).unwrap().start_frame(), Frame(10));

    // Overlay lane spans 40..64. [12, 17) hits [10, 20).
    let second = drop_item(&mut s, sticker(5), 12.0, 50.0);
    let list = s.timeline();
    assert_eq!(list.len(), 3);
    assert_ne!(list.get_track_item(second).unwrap().parent_track(), Some(overlay));
    assert_eq!(list.track_index(overlay), Some(1));
    assert_eq!(list.get(0).unwrap().items()[0].id(), second);
}

#[test]
fn sticky_edge_snaps_within_threshold() {
    let mut s = session_with(preset_default(), 4.0);
    drop_item(&mut s, video(300), 0.0, 70.0);
    drop_item(&mut s, sticker(40), 40.0, 10.0);
    let overlay = s.timeline().get(0).unwrap().id();

    // The sticker ends at frame 50, 200px. A pointer at 205px is 4px away.
    let item = video(20);
    s.begin_insert_drag(item, 0.0).unwrap();
    let preview = s.drag_to(Point::new(205.0, 50.0)).unwrap().unwrap();
    assert_eq!(preview.start_frame, Frame(50));
    assert_eq!(preview.snap_frame, Some(Frame(50)));
    assert_eq!(preview.placement, Placement::OnTrack { track_id: overlay });

    // Beyond the 12px threshold nothing snaps.
    let far = s.drag_to(Point::new(260.0, 50.0)).unwrap().unwrap();
    assert_eq!(far.start_frame, Frame(65));
    assert_eq!(far.snap_frame, None);
    assert!(s.cancel_drag());
}

#[test]
fn history_is_bounded() {
    let config = EditorConfig {
        history_capacity: 3,
        ..preset_default()
    };
    let mut s = session_with(config, 1.0);
    for _ in 0..4 {
        drop_item(&mut s, video(10), 0.0, 70.0);
    }
    assert_eq!(s.timeline().track_item_count(), 4);
    assert_eq!(s.history().len(), 3);

    let mut undone = 0;
    while s.undo().unwrap() {
        undone += 1;
    }
    assert_eq!(undone, 3);
    // The oldest drop fell off the history and stays.
    assert_eq!(s.timeline().track_item_count(), 1);
    assert!(!s.can_undo());
    assert!(s.can_redo());
}

#[test]
fn main_track_survives_everything() {
    let mut s = session_with(preset_default(), 1.0);
    let main_id = s.timeline().main_track().id();
    let a = drop_item(&mut s, video(50), 0.0, 70.0);
    let b = drop_item(&mut s, text(30), 0.0, 10.0);
    let c = drop_item(&mut s, audio(30), 0.0, 400.0);
    assert_eq!(s.timeline().len(), 3);

    for id in [a, b, c] {
        s.delete_item(id).unwrap();
    }
    assert!(s.timeline().is_empty());
    assert_eq!(s.timeline().main_track().id(), main_id);
    assert_eq!(main_count(&s.snapshot()), 1);
}

#[test]
fn drop_below_main_promotes_and_undoes_cleanly() {
    let mut s = session_with(preset_default(), 1.0);
    let old = drop_item(&mut s, video(80), 0.0, 70.0);
    let before = s.snapshot();

    let fresh = drop_item(&mut s, video(40), 0.0, 400.0);
    let list = s.timeline();
    assert_eq!(list.main_track().items()[0].id(), fresh);
    assert_eq!(list.main_track().len(), 1);
    let promoted = list.get_track_item(old).unwrap().parent_track().unwrap();
    assert_eq!(list.find_track(promoted).unwrap().kind(), TrackKind::Video);
    let after = s.snapshot();

    assert!(s.undo().unwrap());
    let mut expected = before;
    expected.selected_id = s.snapshot().selected_id;
    assert_eq!(s.snapshot(), expected);

    assert!(s.redo().unwrap());
    let mut expected = after;
    expected.selected_id = s.snapshot().selected_id;
    assert_eq!(s.snapshot(), expected);
}

#[test]
fn history_events_follow_undo_and_redo() {
    let mut s = session_with(preset_default(), 1.0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    s.subscribe(Box::new(move |e| {
        if let TimelineEvent::HistoryChanged { .. } = e {
            sink.borrow_mut().push(*e);
        }
    }));

    drop_item(&mut s, video(10), 0.0, 70.0);
    s.undo().unwrap();
    s.redo().unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![
            TimelineEvent::HistoryChanged { can_undo: true, can_redo: false },
            TimelineEvent::HistoryChanged { can_undo: false, can_redo: true },
            TimelineEvent::HistoryChanged { can_undo: true, can_redo: false },
        ]
    );
}

#[test]
fn timeline_serializes_to_json() {
    let mut s = session_with(preset_default(), 1.0);
    drop_item(&mut s, video(10), 0.0, 70.0);
    let json = serde_json::to_value(s.snapshot()).unwrap();
    assert_eq!(json["maxFrame"], 10);
    assert_eq!(json["tracks"][0]["type"], "main");
    assert_eq!(json["tracks"][0]["items"][0]["type"], "video");
}

// ---------------------------------------------------------------------------
// Undo/redo inverse law
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Drop { kind: u8, x: f64, y: f64 },
    Move { pick: usize, x: f64, y: f64 },
    Delete { pick: usize },
    Split { pick: usize, ratio: f64 },
    Resize { pick: usize, end: bool, delta: i64 },
    Attribute { pick: usize, key: usize, value: f64 },
    Text { pick: usize, label: u8 },
}

const KEYS: [AttributeKey; 4] = [
    AttributeKey::LeftRatio,
    AttributeKey::Rotate,
    AttributeKey::Scale,
    AttributeKey::Opacity,
];

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..4, 0.0f64..300.0, 0.0f64..320.0)
            .prop_map(|(kind, x, y)| Op::Drop { kind, x, y }),
        2 => (any::<usize>(), 0.0f64..300.0, 0.0f64..320.0)
            .prop_map(|(pick, x, y)| Op::Move { pick, x, y }),
        1 => any::<usize>().prop_map(|pick| Op::Delete { pick }),
        1 => (any::<usize>(), 0.1f64..0.9).prop_map(|(pick, ratio)| Op::Split { pick, ratio }),
        1 => (any::<usize>(), any::<bool>(), -40i64..40)
            .prop_map(|(pick, end, delta)| Op::Resize { pick, end, delta }),
        1 => (any::<usize>(), 0..KEYS.len(), 0.0f64..1.0)
            .prop_map(|(pick, key, value)| Op::Attribute { pick, key, value }),
        1 => (any::<usize>(), 0u8..3).prop_map(|(pick, label)| Op::Text { pick, label }),
    ]
}

fn item_ids(s: &Session) -> Vec<uuid::Uuid> {
    s.timeline()
        .tracks()
        .iter()
        .flat_map(|t| t.items().iter().map(TrackItem::id))
        .collect()
}

fn apply(s: &mut Session, op: &Op) {
    let ids = item_ids(s);
    let pick = |p: usize| (!ids.is_empty()).then(|| ids[p % ids.len()]);
    match *op {
        Op::Drop { kind, x, y } => {
            let item = match kind {
                0 => video(30),
                1 => audio(30),
                2 => text(30),
                _ => sticker(30),
            };
            s.begin_insert_drag(item, 0.0).unwrap();
            let _ = s.release_drag(Point::new(x, y));
        }
        Op::Move { pick: p, x, y } => {
            if let Some(id) = pick(p) {
                s.begin_move_drag(id, 0.0).unwrap();
                let _ = s.release_drag(Point::new(x, y));
            }
        }
        Op::Delete { pick: p } => {
            if let Some(id) = pick(p) {
                s.delete_item(id).unwrap();
            }
        }
        Op::Split { pick: p, ratio } => {
            if let Some(id) = pick(p) {
                let item = s.timeline().get_track_item(id).unwrap();
                let len = (item.end_frame() - item.start_frame()).0;
                let at = item.start_frame() + Frame((len as f64 * ratio) as i64);
                let _ = s.split_item(id, at);
            }
        }
        Op::Resize { pick: p, end, delta } => {
            if let Some(id) = pick(p) {
                let item = s.timeline().get_track_item(id).unwrap();
                let (edge, from) = if end {
                    (ResizeEdge::End, item.end_frame())
                } else {
                    (ResizeEdge::Start, item.start_frame())
                };
                s.begin_resize(id, edge).unwrap();
                s.resize_to(from + Frame(delta)).unwrap();
                s.end_resize().unwrap();
            }
        }
        Op::Attribute { pick: p, key, value } => {
            // Audio has no attribute and refuses the gesture.
            if let Some(id) = pick(p) {
                if s.begin_attribute_change(id).is_ok() {
                    s.set_attribute(KEYS[key], value).unwrap();
                    s.end_attribute_change().unwrap();
                }
            }
        }
        Op::Text { pick: p, label } => {
            // Only text items accept this; the rest are refused untouched.
            if let Some(id) = pick(p) {
                let _ = s.edit_text(id, format!("Title {}", label), None);
            }
        }
    }
}

fn normalized(s: &Session) -> TimelineData {
    let mut data = s.snapshot();
    data.selected_id = None;
    data
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_then_redo_walks_the_same_states(
        ops in proptest::collection::vec(op(), 1..12),
        magnetic in any::<bool>(),
    ) {
        let config = if magnetic { preset_default() } else { preset_precise() };
        let mut s = session_with(config, 2.0);
        let mut states = vec![normalized(&s)];

        for op in &ops {
            apply(&mut s, op);
            prop_assert_eq!(main_count(&s.snapshot()), 1);
            if s.history().len() == states.len() {
                states.push(normalized(&s));
            } else {
                // Not recorded: nothing may have changed.
                prop_assert_eq!(&normalized(&s), states.last().unwrap());
            }
        }

        for expected in states.iter().rev().skip(1) {
            prop_assert!(s.undo().unwrap());
            prop_assert_eq!(&normalized(&s), expected);
        }
        prop_assert!(!s.can_undo());

        for expected in states.iter().skip(1) {
            prop_assert!(s.redo().unwrap());
            prop_assert_eq!(&normalized(&s), expected);
        }
        prop_assert!(!s.can_redo());
    }
}
