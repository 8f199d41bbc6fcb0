//! Report types. Serialize to the `{title, type, status, value, allowed}` shape.

use serde::{Deserialize, Serialize};

/// Requirement category tag carried in each result's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    MimeType,
    Size,
    Resolution,
    MinSize,
    Duration,
    FrameRate,
    AspectRatio,
    AspectRatioInterval,
    SampleRate,
    Channels,
    CodecVideo,
    CodecAudio,
    BitRate,
}

impl RequirementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MimeType => "mime_type",
            Self::Size => "size",
            Self::Resolution => "resolution",
            Self::MinSize => "min_size",
            Self::Duration => "duration",
            Self::FrameRate => "frame_rate",
            Self::AspectRatio => "aspect_ratio",
            Self::AspectRatioInterval => "aspect_ratio_interval",
            Self::SampleRate => "sample_rate",
            Self::Channels => "channels",
            Self::CodecVideo => "codec_video",
            Self::CodecAudio => "codec_audio",
            Self::BitRate => "bit_rate",
        }
    }
}

/// Outcome of one requirement category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementResult {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: RequirementType,
    pub status: bool,
    pub value: String,
    pub allowed: Vec<String>,
}

/// Ordered per-category results for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationReport {
    pub results: Vec<RequirementResult>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: RequirementResult) {
        self.results.push(result);
    }

    /// True when every evaluated category passed. An empty report passes.
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.status)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RequirementResult> {
        self.results.iter().filter(|r| !r.status)
    }

    pub fn get(&self, kind: RequirementType) -> Option<&RequirementResult> {
        self.results.iter().find(|r| r.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
