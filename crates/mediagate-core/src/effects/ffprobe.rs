//! ffprobe-backed metadata extraction.
//!
//! Runs `ffprobe -print_format json -show_format -show_streams` once per
//! file and normalizes the first video (or, failing that, audio) stream.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::ProbeError;
use crate::models::{AudioProps, MediaKind, MediaMetadata, VisualProps};
use crate::numeric::{round2, round_half_up};
use crate::ratio;

use super::MetadataExtractor;

pub const DEFAULT_PROGRAM: &str = "ffprobe";

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<Stream>,
    #[serde(default)]
    format: Container,
}

#[derive(Debug, Default, Deserialize)]
struct Container {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Stream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    bit_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
    #[serde(default)]
    disposition: Disposition,
}

#[derive(Debug, Default, Deserialize)]
struct Disposition {
    #[serde(default)]
    attached_pic: i64,
}

impl Stream {
    fn is(&self, codec_type: &str) -> bool {
        self.codec_type.as_deref() == Some(codec_type)
    }

    /// Embedded cover art shows up as a one-frame video stream.
    fn is_cover_art(&self) -> bool {
        self.disposition.attached_pic != 0
    }

    fn codec(&self) -> String {
        self.codec_name
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }
}

/// Metadata extractor that shells out to ffprobe.
#[derive(Debug, Clone)]
pub struct FfprobeExtractor {
    program: String,
}

impl FfprobeExtractor {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for FfprobeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor for FfprobeExtractor {
    fn probe(&self, path: &Path) -> Result<MediaMetadata, ProbeError> {
        log::debug!("mediagate: {} {}", self.program, path.display());

        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "--",
            ])
            .arg(path)
            .output()
            .map_err(|source| ProbeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Tool {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_output(&output.stdout, path)
    }
}

/// Normalize ffprobe JSON into [`MediaMetadata`].
pub fn parse_output(json: &[u8], path: &Path) -> Result<MediaMetadata, ProbeError> {
    let probe: ProbeOutput = serde_json::from_slice(json)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.is("video") && !s.is_cover_art());
    let audio = probe.streams.iter().find(|s| s.is("audio"));

    let main = video.or(audio).ok_or_else(|| ProbeError::NoStreams(path.to_path_buf()))?;

    let duration_secs = parse_f64(probe.format.duration.as_deref())
        .or_else(|| parse_f64(main.duration.as_deref()))
        .unwrap_or(0.0);
    let size_bytes = probe
        .format
        .size
        .as_deref()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let bits_per_sec = parse_f64(main.bit_rate.as_deref())
        .or_else(|| parse_f64(probe.format.bit_rate.as_deref()))
        .unwrap_or(0.0);
    let audio_codec = audio.map(Stream::codec).unwrap_or_default();

    let kind = match video {
        Some(v) => {
            let width = v.width.unwrap_or(0);
            let height = v.height.unwrap_or(0);
            MediaKind::Visual(VisualProps {
                width,
                height,
                aspect_ratio: ratio::classify(width, height),
                frame_rate: frame_rate(v),
                bit_rate_mbps: round2(bits_per_sec / 1_000_000.0),
                video_codec: v.codec(),
            })
        }
        None => MediaKind::Audio(AudioProps {
            sample_rate_hz: parse_f64(main.sample_rate.as_deref()),
            channels: main.channels,
            bit_rate_kbps: round2(bits_per_sec / 1000.0),
        }),
    };

    Ok(MediaMetadata {
        duration_secs,
        size_bytes,
        audio_codec,
        kind,
    })
}

/// Average frame rate rounded to whole frames; `None` for stills (`0/0`).
fn frame_rate(stream: &Stream) -> Option<f64> {
    stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_fraction)
        .map(|fps| round_half_up(fps, 0))
}

fn parse_fraction(text: &str) -> Option<f64> {
    let (num, den) = match text.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (text.trim().parse::<f64>().ok()?, 1.0),
    };
    let fps = num / den;
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn parse_f64(text: Option<&str>) -> Option<f64> {
    text.and_then(|t| t.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "h264", "codec_type": "video", "width": 1920, "height": 1080,
             "avg_frame_rate": "30000/1001", "r_frame_rate": "30000/1001", "bit_rate": "8000000",
             "duration": "12.000000", "disposition": {"default": 1, "attached_pic": 0}},
            {"index": 1, "codec_name": "AAC ", "codec_type": "audio", "sample_rate": "48000",
             "channels": 2, "bit_rate": "128000"}
        ],
        "format": {"duration": "12.012000", "size": "3670016", "bit_rate": "8200000"}
    }"#;

    const AUDIO_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "mp3", "codec_type": "audio", "sample_rate": "44100",
             "channels": 2, "bit_rate": "128000"},
            {"index": 1, "codec_name": "mjpeg", "codec_type": "video", "width": 500, "height": 500,
             "avg_frame_rate": "0/0", "disposition": {"attached_pic": 1}}
        ],
        "format": {"duration": "215.3", "size": "3450000", "bit_rate": "128200"}
    }"#;

    const IMAGE_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "png", "codec_type": "video", "width": 1080, "height": 1350,
             "avg_frame_rate": "0/0", "r_frame_rate": "25/1"}
        ],
        "format": {"size": "204800"}
    }"#;

    #[test]
    fn parses_video_with_audio() {
        let meta = parse_output(VIDEO_JSON.as_bytes(), Path::new("clip.mp4")).unwrap();
        let visual = meta.visual().unwrap();
        assert_eq!((visual.width, visual.height), (1920, 1080));
        assert_eq!(visual.aspect_ratio, "16:9");
        assert_eq!(visual.frame_rate, Some(30.0));
        assert_eq!(visual.bit_rate_mbps, 8.0);
        assert_eq!(visual.video_codec, "h264");
        assert_eq!(meta.audio_codec, "aac");
        assert_eq!(meta.duration_secs, 12.012);
        assert_eq!(meta.size_bytes, 3_670_016);
    }

    #[test]
    fn cover_art_does_not_make_audio_visual() {
        let meta = parse_output(AUDIO_JSON.as_bytes(), Path::new("song.mp3")).unwrap();
        assert!(meta.is_audio_only());
        let audio = meta.audio().unwrap();
        assert_eq!(audio.sample_rate_hz, Some(44100.0));
        assert_eq!(audio.channels, Some(2));
        assert_eq!(audio.bit_rate_kbps, 128.0);
        assert_eq!(meta.audio_codec, "mp3");
        assert_eq!(meta.dimensions(), None);
    }

    #[test]
    fn still_image_has_no_frame_rate() {
        let meta = parse_output(IMAGE_JSON.as_bytes(), Path::new("post.png")).unwrap();
        let visual = meta.visual().unwrap();
        assert_eq!(visual.aspect_ratio, "4:5");
        assert_eq!(visual.frame_rate, None);
        assert_eq!(visual.bit_rate_mbps, 0.0);
        assert_eq!(meta.duration_secs, 0.0);
        assert_eq!(meta.audio_codec, "");
    }

    #[test]
    fn no_streams_is_an_error() {
        let err = parse_output(br#"{"streams": [{"codec_type": "data"}], "format": {}}"#, Path::new("x.bin"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::NoStreams(_)));
    }

    #[test]
    fn garbage_output_is_a_parse_error() {
        let err = parse_output(b"not json", Path::new("x.bin")).unwrap_err();
        assert!(matches!(err, ProbeError::Parse(_)));
    }

    #[test]
    fn fraction_parsing() {
        assert_eq!(parse_fraction("25/1"), Some(25.0));
        assert_eq!(parse_fraction("0/0"), None);
        assert_eq!(parse_fraction("24"), Some(24.0));
        assert_eq!(parse_fraction("x/1"), None);
    }

    #[test]
    fn missing_binary_reports_spawn_error() {
        let extractor = FfprobeExtractor::with_program("mediagate-no-such-ffprobe");
        let err = extractor.probe(Path::new("clip.mp4")).unwrap_err();
        assert!(err.is_tool_missing());
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_reports_status_and_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("ffprobe");
        std::fs::write(
            &script,
            "#!/bin/sh\necho 'clip.mp4: Invalid data found when processing input' >&2\nexit 1\n",
        )
        .expect("write");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let program = script.to_string_lossy().into_owned();
        let err = FfprobeExtractor::with_program(&program)
            .probe(Path::new("clip.mp4"))
            .unwrap_err();
        match err {
            ProbeError::Tool { program: ref p, ref status, ref stderr } => {
                assert_eq!(p, &program);
                assert!(status.contains('1'), "{}", status);
                assert_eq!(stderr, "clip.mp4: Invalid data found when processing input");
            }
            ref other => panic!("expected Tool, got {:?}", other),
        }
        assert!(!err.is_tool_missing());
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_without_stderr_is_a_tool_error() {
        let err = FfprobeExtractor::with_program("false")
            .probe(Path::new("clip.mp4"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::Tool { ref stderr, .. } if stderr.is_empty()));
    }
}
