use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::coords::Frame;
use crate::error::{CoreError, Result};

// ---------------------------------------------------------------------------
// ResourceDescriptor
// ---------------------------------------------------------------------------

/// Resource metadata as returned by the fetch collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResourceDescriptor {
    pub name: String,
    pub format: String,
    pub source: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub frame_count: Option<i64>,
    /// Seconds. Audio resources only report this.
    pub duration: Option<f64>,
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoResource {
    pub name: String,
    pub format: String,
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioResource {
    pub name: String,
    pub format: String,
    pub source: String,
    pub duration: f64,
    pub frame_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextResource {
    pub name: String,
    pub frame_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StickerResource {
    pub name: String,
    pub format: String,
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub frame_count: i64,
}

/// Immutable snapshot of the media backing a track item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    Video(VideoResource),
    Audio(AudioResource),
    Text(TextResource),
    Sticker(StickerResource),
}

impl Resource {
    pub fn video(desc: &ResourceDescriptor) -> Result<Self> {
        let frame_count = desc
            .frame_count
            .ok_or_else(|| missing(&desc.name, "frame_count"))?;
        Ok(Resource::Video(VideoResource {
            name: desc.name.clone(),
            format: desc.format.clone(),
            source: desc.source.clone(),
            width: desc.width.ok_or_else(|| missing(&desc.name, "width"))?,
            height: desc.height.ok_or_else(|| missing(&desc.name, "height"))?,
            fps: desc.fps.unwrap_or(30.0),
            frame_count,
        }))
    }

    /// Audio only knows its duration; the frame count follows from the session fps.
    pub fn audio(desc: &ResourceDescriptor, config: &EditorConfig) -> Result<Self> {
        let duration = desc
            .duration
            .ok_or_else(|| missing(&desc.name, "duration"))?;
        Ok(Resource::Audio(AudioResource {
            name: desc.name.clone(),
            format: desc.format.clone(),
            source: desc.source.clone(),
            duration,
            frame_count: Frame::from_seconds(duration, config.fps).0,
        }))
    }

    pub fn sticker(desc: &ResourceDescriptor) -> Result<Self> {
        Ok(Resource::Sticker(StickerResource {
            name: desc.name.clone(),
            format: desc.format.clone(),
            source: desc.source.clone(),
            width: desc.width.ok_or_else(|| missing(&desc.name, "width"))?,
            height: desc.height.ok_or_else(|| missing(&desc.name, "height"))?,
            frame_count: desc
                .frame_count
                .ok_or_else(|| missing(&desc.name, "frame_count"))?,
        }))
    }

    pub fn text(name: impl Into<String>, config: &EditorConfig) -> Self {
        Resource::Text(TextResource {
            name: name.into(),
            frame_count: config.default_text_frame_count,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Resource::Video(r) => &r.name,
            Resource::Audio(r) => &r.name,
            Resource::Text(r) => &r.name,
            Resource::Sticker(r) => &r.name,
        }
    }

    /// Native length of the media in frames.
    pub fn frame_count(&self) -> Frame {
        match self {
            Resource::Video(r) => Frame(r.frame_count),
            Resource::Audio(r) => Frame(r.frame_count),
            Resource::Text(r) => Frame(r.frame_count),
            Resource::Sticker(r) => Frame(r.frame_count),
        }
    }

    /// Video and audio have a finite source that bounds trimming.
    pub fn is_finite(&self) -> bool {
        match self {
            Resource::Video(_) | Resource::Audio(_) => true,
            Resource::Text(_) | Resource::Sticker(_) => false,
        }
    }
}

fn missing(name: &str, field: &str) -> CoreError {
    CoreError::InvalidOperation(format!("resource '{}' has no {}", name, field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_desc() -> ResourceDescriptor {
        ResourceDescriptor {
            name: "beach.mp4".to_string(),
            format: "mp4".to_string(),
            source: "/media/beach.mp4".to_string(),
            width: Some(1920),
            height: Some(1080),
            fps: Some(30.0),
            frame_count: Some(300),
            duration: None,
        }
    }

    #[test]
    fn video_from_descriptor() {
        let res = Resource::video(&video_desc()).unwrap();
        assert_eq!(res.frame_count(), Frame(300));
        assert_eq!(res.name(), "beach.mp4");
        assert!(res.is_finite());
    }

    #[test]
    fn video_without_frame_count_fails() {
        let desc = ResourceDescriptor {
            frame_count: None,
            ..video_desc()
        };
        assert!(matches!(
            Resource::video(&desc).unwrap_err(),
            CoreError::InvalidOperation(_)
        ));
    }

    #[test]
    fn audio_frame_count_from_duration() {
        let desc = ResourceDescriptor {
            name: "theme.mp3".to_string(),
            format: "mp3".to_string(),
            source: "/media/theme.mp3".to_string(),
            duration: Some(4.5),
            ..Default::default()
        };
        let res = Resource::audio(&desc, &EditorConfig::default()).unwrap();
        assert_eq!(res.frame_count(), Frame(135));
    }

    #[test]
    fn text_uses_default_length_and_is_unbounded() {
        let res = Resource::text("Title", &EditorConfig::default());
        assert_eq!(res.frame_count(), Frame(90));
        assert!(!res.is_finite());
    }

    #[test]
    fn serde_tagged_by_type() {
        let res = Resource::video(&video_desc()).unwrap();
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["type"], "video");
        let back: Resource = serde_json::from_value(json).unwrap();
        assert_eq!(res, back);
    }
}
