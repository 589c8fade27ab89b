use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for one editing session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Playback rate used to turn durations into frames.
    pub fps: u32,
    /// Pixel distance below which a dragged edge snaps to a sibling edge.
    pub snap_threshold_px: f64,
    /// Vertical spacing between two tracks.
    pub track_interval_px: f64,
    /// Blank drop area above the first track.
    pub blank_top_px: f64,
    pub main_track_height: f64,
    pub video_track_height: f64,
    pub other_track_height: f64,
    /// Length given to a freshly created text item.
    pub default_text_frame_count: i64,
    /// Width of one frame at the maximum zoom level.
    pub max_frame_width: f64,
    /// Blank margin factor applied to the content length when laying out the ruler.
    pub adaptive_ratio: f64,
    /// Undo entries kept before the oldest is dropped.
    pub history_capacity: usize,
    /// Clips dropped on the main track append after its last clip.
    pub magnetic: bool,
    /// Dragged edges snap to nearby sibling edges.
    pub sticky: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        preset_default()
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// 30fps with magnetic main track and edge snapping.
pub fn preset_default() -> EditorConfig {
    EditorConfig {
        fps: 30,
        snap_threshold_px: 12.0,
        track_interval_px: 8.0,
        blank_top_px: 40.0,
        main_track_height: 60.0,
        video_track_height: 60.0,
        other_track_height: 24.0,
        default_text_frame_count: 90,
        max_frame_width: 60.0,
        adaptive_ratio: 1.5,
        history_capacity: 100,
        magnetic: true,
        sticky: true,
    }
}

/// Free placement: no magnetic main track, no snapping.
pub fn preset_precise() -> EditorConfig {
    EditorConfig {
        magnetic: false,
        sticky: false,
        ..preset_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_preset() {
        assert_eq!(EditorConfig::default(), preset_default());
    }

    #[test]
    fn precise_preset_disables_snapping() {
        let config = preset_precise();
        assert!(!config.magnetic);
        assert!(!config.sticky);
        assert_eq!(config.fps, 30);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = EditorConfig::from_json_str(r#"{ "fps": 25, "sticky": false }"#).unwrap();
        assert_eq!(config.fps, 25);
        assert!(!config.sticky);
        assert_eq!(config.snap_threshold_px, 12.0);
        assert_eq!(config.history_capacity, 100);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(EditorConfig::from_json_str("{ fps: ").is_err());
    }
}
