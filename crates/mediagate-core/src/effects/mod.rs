//! External collaborators: metadata extraction and signature sniffing.
//!
//! The engine only talks to these traits. Implementations own their I/O and
//! must be safe to call from several validations at once.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;
use crate::models::MediaMetadata;

pub mod ffprobe;
#[cfg(feature = "native")]
pub mod native;
pub mod sniff;

/// Reads stream metadata from a file on disk.
pub trait MetadataExtractor: Send + Sync {
    fn probe(&self, path: &Path) -> Result<MediaMetadata, ProbeError>;
}

/// Detects the real type of a file from its leading bytes.
pub trait SignatureSniffer: Send + Sync {
    /// `None` when the bytes match no known signature.
    fn sniff(&self, buffer: &[u8]) -> Option<Signature>;
}

/// Result of signature sniffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub extension: String,
    pub mime_type: String,
}

impl Signature {
    pub fn new(extension: &str, mime_type: &str) -> Self {
        Self {
            extension: extension.to_string(),
            mime_type: mime_type.to_string(),
        }
    }
}

/// Which extractor implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    /// External `ffprobe` binary. Handles video, images and audio.
    #[default]
    Ffprobe,
    /// Pure Rust: images and audio, no video containers.
    Native,
    /// `ffprobe`, falling back to native when the binary is missing.
    Auto,
}

impl FromStr for ProbeBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ffprobe" => Ok(ProbeBackend::Ffprobe),
            "native" => Ok(ProbeBackend::Native),
            "auto" => Ok(ProbeBackend::Auto),
            other => Err(format!("unknown probe backend: {}", other)),
        }
    }
}

impl fmt::Display for ProbeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProbeBackend::Ffprobe => "ffprobe",
            ProbeBackend::Native => "native",
            ProbeBackend::Auto => "auto",
        })
    }
}

/// Build the extractor for `backend`. `ffprobe` is the binary to run.
pub fn build_extractor(backend: ProbeBackend, ffprobe: &str) -> Box<dyn MetadataExtractor> {
    let external = ffprobe::FfprobeExtractor::with_program(ffprobe);
    match backend {
        ProbeBackend::Ffprobe => Box::new(external),
        #[cfg(feature = "native")]
        ProbeBackend::Native => Box::new(native::NativeExtractor::new()),
        #[cfg(feature = "native")]
        ProbeBackend::Auto => Box::new(FallbackExtractor {
            primary: Box::new(external),
            fallback: Box::new(native::NativeExtractor::new()),
        }),
        #[cfg(not(feature = "native"))]
        other => {
            log::warn!("mediagate: {} probing not compiled in, using ffprobe", other);
            Box::new(external)
        }
    }
}

/// Tries `primary`; uses `fallback` only when the primary tool is not installed.
pub struct FallbackExtractor {
    primary: Box<dyn MetadataExtractor>,
    fallback: Box<dyn MetadataExtractor>,
}

impl FallbackExtractor {
    pub fn new(primary: Box<dyn MetadataExtractor>, fallback: Box<dyn MetadataExtractor>) -> Self {
        Self { primary, fallback }
    }
}

impl MetadataExtractor for FallbackExtractor {
    fn probe(&self, path: &Path) -> Result<MediaMetadata, ProbeError> {
        match self.primary.probe(path) {
            Err(e) if e.is_tool_missing() => {
                log::info!("mediagate: {}; falling back to native probing", e);
                self.fallback.probe(path)
            }
            other => other,
        }
    }
}
