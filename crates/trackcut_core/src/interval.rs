use serde::{Deserialize, Serialize};

use crate::coords::Frame;

/// Left-closed frame interval `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FrameRange {
    pub start: Frame,
    pub end: Frame,
}

impl FrameRange {
    pub fn new(start: Frame, end: Frame) -> Self {
        Self { start, end }
    }

    /// Range of `len` frames starting at `start`.
    pub fn with_len(start: Frame, len: Frame) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    pub fn len(&self) -> Frame {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn shift(&self, delta: Frame) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    pub fn contains(&self, frame: Frame) -> bool {
        self.start <= frame && frame < self.end
    }

    pub fn intersects(&self, other: &FrameRange) -> bool {
        intervals_intersect((self.start, self.end), (other.start, other.end))
    }
}

/// Whether two intervals share at least one frame. Endpoint order within each
/// pair does not matter; touching intervals do not intersect.
pub fn intervals_intersect(a: (Frame, Frame), b: (Frame, Frame)) -> bool {
    let a_start = a.0.min(a.1);
    let a_end = a.0.max(a.1);
    let b_start = b.0.min(b.1);
    let b_end = b.0.max(b.1);
    a_start.max(b_start) < a_end.min(b_end)
}
