use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use crate::config::EditorConfig;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Integer timeline position. One frame is `1 / fps` seconds.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Frame(pub i64);

impl Frame {
    pub const ZERO: Self = Self(0);
    /// Furthest position a pointer can map to. Leaves headroom so adding
    /// item lengths never overflows.
    pub const MAX: Self = Self(i64::MAX / 4);

    pub fn from_seconds(seconds: f64, fps: u32) -> Self {
        Self((seconds * fps as f64).round() as i64)
    }

    pub fn as_seconds(&self, fps: u32) -> f64 {
        self.0 as f64 / fps as f64
    }

    /// `MM:SS:FF`, or `HH:MM:SS:FF` once the position passes one hour.
    pub fn to_timecode(&self, fps: u32) -> String {
        let fps = fps.max(1) as u64;
        let total = self.0.unsigned_abs();
        let frames = total % fps;
        let total_secs = total / fps;
        let secs = total_secs % 60;
        let mins = (total_secs / 60) % 60;
        let hours = total_secs / 3600;
        let sign = if self.0 < 0 { "-" } else { "" };
        if hours > 0 {
            format!("{sign}{:02}:{:02}:{:02}:{:02}", hours, mins, secs, frames)
        } else {
            format!("{sign}{:02}:{:02}:{:02}", mins, secs, frames)
        }
    }
}

impl Add for Frame {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Frame {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Frame {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}f", self.0)
    }
}

// ---------------------------------------------------------------------------
// FrameScale
// ---------------------------------------------------------------------------

/// Frame <-> pixel mapping for the current zoom level.
///
/// The ruler renderer and the drag resolver both read from this; nothing in
/// here holds timeline state of its own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FrameScale {
    /// Width of one frame in pixels.
    pub frame_width: f64,
    /// Frame count the timeline is laid out for (content plus blank margin).
    pub max_frame_count: i64,
    /// Total zoomed timeline width in pixels.
    pub timeline_width: f64,
    max_frame_width: f64,
    adaptive_ratio: f64,
}

impl FrameScale {
    /// A scale with a fixed frame width, mostly useful for tests and headless use.
    pub fn fixed(frame_width: f64) -> Self {
        Self {
            frame_width,
            max_frame_count: 0,
            timeline_width: 0.0,
            max_frame_width: 60.0,
            adaptive_ratio: 1.5,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            frame_width: 1.0,
            max_frame_count: 0,
            timeline_width: 0.0,
            max_frame_width: config.max_frame_width,
            adaptive_ratio: config.adaptive_ratio,
        }
    }

    /// Recompute the mapping for a container width, the content frame count and
    /// a zoom level in `0..=100`. Returns `false` when the container has no width.
    pub fn update(&mut self, container_width: f64, frame_count: i64, zoom: f64) -> bool {
        if container_width <= 0.0 {
            tracing::warn!("timeline container width must be positive, got {}", container_width);
            return false;
        }

        self.max_frame_count = ((frame_count.max(1) as f64) * self.adaptive_ratio).round() as i64;
        let min_frame_width = container_width / self.max_frame_count as f64;

        // Exponential easing so each zoom step feels the same size.
        let base = (self.max_frame_width / min_frame_width).powf(1.0 / 100.0);
        let scale = base.powf(zoom.clamp(0.0, 100.0));

        self.timeline_width = container_width * scale;
        self.frame_width = min_frame_width * scale;
        true
    }

    pub fn frame_to_pixel(&self, frame: Frame) -> f64 {
        frame.0 as f64 * self.frame_width
    }

    /// Nearest frame for a pixel offset, within `0..=Frame::MAX`.
    pub fn pixel_to_frame(&self, pixel: f64) -> Frame {
        if self.frame_width <= 0.0 {
            return Frame::ZERO;
        }
        Frame(((pixel / self.frame_width).round() as i64).clamp(0, Frame::MAX.0))
    }

    pub fn frame_to_percent(&self, frame: Frame) -> f64 {
        if self.max_frame_count == 0 {
            return 0.0;
        }
        frame.0 as f64 / self.max_frame_count as f64 * 100.0
    }
}

impl Default for FrameScale {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
