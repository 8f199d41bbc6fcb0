//! Pure Rust metadata extraction, no external binaries.
//!
//! 1. `image` reads still-image headers (format + dimensions)
//! 2. symphonia probes audio containers (codec, sample rate, channels, length)
//! 3. lofty fills in the audio bit rate
//!
//! Video containers need ffprobe; they come back as `Unsupported`. That
//! covers files whose signature is a video type and any container holding
//! a track symphonia cannot decode (the video track of an MP4 or MOV).

use std::fs::File;
use std::path::Path;

use image::{ImageFormat, ImageReader};
use lofty::prelude::*;
use lofty::probe::Probe;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::ProbeError;
use crate::models::{AudioProps, MediaKind, MediaMetadata, VisualProps};
use crate::numeric::round2;
use crate::ratio;

use super::sniff::{read_head, MagicSniffer, HEAD_LEN};
use super::{MetadataExtractor, SignatureSniffer};

/// Extractor for stills and audio built on the pure Rust decoders.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeExtractor;

impl NativeExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for NativeExtractor {
    fn probe(&self, path: &Path) -> Result<MediaMetadata, ProbeError> {
        let size_bytes = std::fs::metadata(path)
            .map_err(|source| ProbeError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        if let Some(meta) = probe_image(path, size_bytes)? {
            return Ok(meta);
        }
        probe_audio(path, size_bytes)
    }
}

/// `Ok(None)` when the file is not a still image.
fn probe_image(path: &Path, size_bytes: u64) -> Result<Option<MediaMetadata>, ProbeError> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|source| ProbeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let Some(format) = reader.format() else {
        return Ok(None);
    };
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ProbeError::Decode(e.to_string()))?;

    Ok(Some(MediaMetadata {
        duration_secs: 0.0,
        size_bytes,
        audio_codec: String::new(),
        kind: MediaKind::Visual(VisualProps {
            width,
            height,
            aspect_ratio: ratio::classify(width, height),
            frame_rate: None,
            bit_rate_mbps: 0.0,
            video_codec: image_codec(format),
        }),
    }))
}

/// Codec names as ffprobe spells them, so catalogs work with either backend.
fn image_codec(format: ImageFormat) -> String {
    match format {
        ImageFormat::Png => "png".into(),
        ImageFormat::Jpeg => "mjpeg".into(),
        ImageFormat::Gif => "gif".into(),
        ImageFormat::WebP => "webp".into(),
        ImageFormat::Bmp => "bmp".into(),
        ImageFormat::Tiff => "tiff".into(),
        other => other
            .extensions_str()
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| format!("{:?}", other).to_lowercase()),
    }
}

fn probe_audio(path: &Path, size_bytes: u64) -> Result<MediaMetadata, ProbeError> {
    let head = read_head(path, HEAD_LEN)?;
    if let Some(sig) = MagicSniffer::new().sniff(&head) {
        if sig.mime_type.starts_with("video/") {
            return Err(video_unsupported(path, &sig.mime_type));
        }
    }

    let file = File::open(path).map_err(|source| ProbeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ProbeError::Unsupported(format!("{}: {}", path.display(), e)))?;

    let tracks = probed.format.tracks();
    if tracks.is_empty() {
        return Err(ProbeError::NoStreams(path.to_path_buf()));
    }
    // Symphonia keeps video tracks with a null codec.
    if tracks.iter().any(|t| t.codec_params.codec == CODEC_TYPE_NULL) {
        return Err(video_unsupported(path, "undecodable track"));
    }
    let track = &tracks[0];
    let params = &track.codec_params;

    let codec = symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|d| d.short_name.to_lowercase())
        .unwrap_or_default();

    let sample_rate = params.sample_rate;
    let mut duration_secs = match (params.n_frames, params.time_base, sample_rate) {
        (Some(frames), Some(tb), _) => {
            let t = tb.calc_time(frames);
            t.seconds as f64 + t.frac
        }
        (Some(frames), None, Some(rate)) if rate > 0 => frames as f64 / rate as f64,
        _ => 0.0,
    };

    let mut bit_rate_kbps = 0.0;
    match Probe::open(path).and_then(|p| p.read()) {
        Ok(tagged) => {
            let props = tagged.properties();
            if let Some(kbps) = props.audio_bitrate().or_else(|| props.overall_bitrate()) {
                bit_rate_kbps = kbps as f64;
            }
            if duration_secs == 0.0 {
                duration_secs = props.duration().as_secs_f64();
            }
        }
        Err(e) => log::debug!("mediagate: no bit rate for {}: {}", path.display(), e),
    }

    Ok(MediaMetadata {
        duration_secs,
        size_bytes,
        audio_codec: codec,
        kind: MediaKind::Audio(AudioProps {
            sample_rate_hz: sample_rate.map(f64::from),
            channels: params.channels.map(|c| c.count() as u32),
            bit_rate_kbps: round2(bit_rate_kbps),
        }),
    })
}

fn video_unsupported(path: &Path, what: &str) -> ProbeError {
    ProbeError::Unsupported(format!(
        "{}: {} needs ffprobe",
        path.display(),
        what
    ))
}
