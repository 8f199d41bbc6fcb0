//! Extracted media metadata.
//!
//! Audio-only files and files with a picture are different shapes, so the
//! extractor hands back a tagged `MediaKind` instead of nullable dimensions.

use serde::{Deserialize, Serialize};

/// Everything the engine needs to know about one probed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub duration_secs: f64,
    pub size_bytes: u64,
    /// Lowercased, trimmed. Empty when the file carries no audio stream.
    pub audio_codec: String,
    pub kind: MediaKind,
}

/// Visual (video or image) vs. audio-only payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "media", rename_all = "lowercase")]
pub enum MediaKind {
    Visual(VisualProps),
    Audio(AudioProps),
}

/// Stream properties of a file with a picture (video or still image).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualProps {
    pub width: u32,
    pub height: u32,
    /// Classified label such as `"16:9"`, see [`crate::ratio::classify`].
    pub aspect_ratio: String,
    pub frame_rate: Option<f64>,
    pub bit_rate_mbps: f64,
    /// Lowercased, trimmed.
    pub video_codec: String,
}

/// Stream properties of an audio-only file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioProps {
    pub sample_rate_hz: Option<f64>,
    pub channels: Option<u32>,
    pub bit_rate_kbps: f64,
}

impl MediaMetadata {
    pub fn is_audio_only(&self) -> bool {
        matches!(self.kind, MediaKind::Audio(_))
    }

    pub fn visual(&self) -> Option<&VisualProps> {
        match &self.kind {
            MediaKind::Visual(v) => Some(v),
            MediaKind::Audio(_) => None,
        }
    }

    pub fn audio(&self) -> Option<&AudioProps> {
        match &self.kind {
            MediaKind::Audio(a) => Some(a),
            MediaKind::Visual(_) => None,
        }
    }

    /// `(width, height)` for visual media.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.visual().map(|v| (v.width, v.height))
    }

    /// Bit rate in the unit native to the media kind: Mbps for visual, kbps for audio.
    pub fn bit_rate(&self) -> f64 {
        match &self.kind {
            MediaKind::Visual(v) => v.bit_rate_mbps,
            MediaKind::Audio(a) => a.bit_rate_kbps,
        }
    }
}
