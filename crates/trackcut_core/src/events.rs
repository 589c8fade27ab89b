use serde::Serialize;

use crate::coords::Frame;

/// Notifications emitted after a mutating operation completes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimelineEvent {
    ItemsChanged,
    /// `full` is set when the item count grew and the ruler should be laid
    /// out again from scratch.
    MaxFrameChanged { max_frame: Frame, full: bool },
    /// A visual item moved, resized or changed attributes.
    PlayerNeedsUpdate,
    HistoryChanged { can_undo: bool, can_redo: bool },
    SelectionChanged,
}

pub type Listener = Box<dyn Fn(&TimelineEvent)>;

/// Synchronous fan-out of [`TimelineEvent`]s to subscribed listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &TimelineEvent) {
        tracing::trace!(?event, "emit");
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn every_listener_sees_every_event() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for _ in 0..2 {
            let seen = Rc::clone(&seen);
            bus.subscribe(Box::new(move |e| seen.borrow_mut().push(*e)));
        }

        bus.emit(&TimelineEvent::ItemsChanged);
        bus.emit(&TimelineEvent::SelectionChanged);

        assert_eq!(
            *seen.borrow(),
            vec![
                TimelineEvent::ItemsChanged,
                TimelineEvent::ItemsChanged,
                TimelineEvent::SelectionChanged,
                TimelineEvent::SelectionChanged,
            ]
        );
    }

    #[test]
    fn emit_without_listeners_is_fine() {
        let bus = EventBus::new();
        assert_eq!(bus.listener_count(), 0);
        bus.emit(&TimelineEvent::PlayerNeedsUpdate);
    }

    #[test]
    fn serializes_with_tag() {
        let json = serde_json::to_value(TimelineEvent::MaxFrameChanged {
            max_frame: Frame(120),
            full: true,
        })
        .unwrap();
        assert_eq!(json["event"], "max_frame_changed");
        assert_eq!(json["max_frame"], 120);
    }
}
