//! Validation engine.
//!
//! [`Validator`] runs the per-request pipeline: input checks, requirement
//! resolution, one probe, an optional signature sniff, then [`evaluate`].
//! `evaluate` is pure and produces the categories in a fixed order:
//!
//! ```text
//! mime_type, size, resolution, min_size, duration, frame_rate, aspect_ratio,
//! aspect_ratio_interval, sample_rate, channels, codec_video, codec_audio, bit_rate
//! ```
//!
//! A category appears only when one of its keys is configured. Visual-only
//! categories are skipped for audio files and vice versa.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::RequirementResolver;
use crate::effects::sniff::MagicSniffer;
use crate::effects::{build_extractor, MetadataExtractor, SignatureSniffer};
use crate::error::{ProbeError, ValidationError};
use crate::messages::{self, Locale};
use crate::mime;
use crate::models::{
    AudioProps, MediaMetadata, RequirementKey, RequirementResult, RequirementSet,
    RequirementType, ValidationReport, VisualProps,
};
use crate::numeric::{fmt_num, round2};
use crate::ratio;
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What a request returns when the file cannot be probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return `ValidationError::Unreadable`.
    #[default]
    Propagate,
    /// Log the failure and return an empty report.
    EmptyReport,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "propagate" | "error" => Ok(FailurePolicy::Propagate),
            "empty" | "empty_report" | "empty-report" => Ok(FailurePolicy::EmptyReport),
            other => Err(format!("unknown failure policy: {}", other)),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailurePolicy::Propagate => "propagate",
            FailurePolicy::EmptyReport => "empty",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidatorOptions {
    pub policy: FailurePolicy,
    pub locale: Locale,
}

// ---------------------------------------------------------------------------
// Request inputs
// ---------------------------------------------------------------------------

/// The uploaded file: where it lives and how big the upload said it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub path: PathBuf,
    /// Bytes. 0 means "unknown", the probed container size is used instead.
    pub size: u64,
}

impl Upload {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    /// Take the size from the file system.
    pub fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let meta = std::fs::metadata(path).map_err(|source| ProbeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, meta.len()))
    }
}

/// Placement to resolve requirements for, and the media category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlacementRef {
    pub placement: String,
    pub media_id: Option<u32>,
}

impl PlacementRef {
    pub fn new(placement: impl Into<String>) -> Self {
        Self {
            placement: placement.into(),
            media_id: None,
        }
    }

    pub fn with_media(mut self, media_id: u32) -> Self {
        self.media_id = Some(media_id);
        self
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Validates uploads against requirement sets.
///
/// Holds no per-request state; one instance can serve concurrent requests
/// as long as its collaborators can.
pub struct Validator {
    extractor: Box<dyn MetadataExtractor>,
    sniffer: Box<dyn SignatureSniffer>,
    options: ValidatorOptions,
}

impl Validator {
    pub fn new(extractor: Box<dyn MetadataExtractor>, sniffer: Box<dyn SignatureSniffer>) -> Self {
        Self {
            extractor,
            sniffer,
            options: ValidatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Stock collaborators chosen by `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            build_extractor(settings.probe, &settings.ffprobe),
            Box::new(MagicSniffer::new()),
        )
        .with_options(settings.options())
    }

    pub fn options(&self) -> ValidatorOptions {
        self.options
    }

    /// Validate against an already resolved requirement set.
    pub fn check(
        &self,
        upload: &Upload,
        buffer: &[u8],
        requirements: &RequirementSet,
    ) -> Result<ValidationReport, ValidationError> {
        check_inputs(upload, buffer)?;
        if !requirements.has_constraints() {
            return Err(ValidationError::EmptyRequirements);
        }
        self.run(upload, buffer, requirements)
    }

    /// Resolve the placement's requirements, then validate.
    ///
    /// Media categories the resolver does not validate get an empty report
    /// without the file being probed.
    pub fn check_placement(
        &self,
        upload: &Upload,
        buffer: &[u8],
        placement: &PlacementRef,
        resolver: &dyn RequirementResolver,
    ) -> Result<ValidationReport, ValidationError> {
        check_inputs(upload, buffer)?;
        let id = placement.placement.trim();
        if id.is_empty() {
            return Err(ValidationError::MissingPlacement);
        }

        if !resolver.validates_media(placement.media_id) {
            log::debug!(
                "mediagate: media {:?} is not validated, skipping placement {}",
                placement.media_id,
                id
            );
            return Ok(ValidationReport::new());
        }

        let requirements = resolver.resolve(id)?;
        if !requirements.has_constraints() {
            return Err(ValidationError::RequirementsNotFound(id.to_string()));
        }
        self.run(upload, buffer, &requirements)
    }

    fn run(
        &self,
        upload: &Upload,
        buffer: &[u8],
        requirements: &RequirementSet,
    ) -> Result<ValidationReport, ValidationError> {
        let metadata = match self.extractor.probe(&upload.path) {
            Ok(metadata) => metadata,
            Err(e) => return self.extraction_failed(&upload.path, e),
        };

        // Sniffing reads the buffer; skip it when nobody asked about formats.
        let detected = if allowed_mime_types(requirements).is_empty() {
            None
        } else {
            self.sniffer.sniff(buffer).map(|s| s.mime_type)
        };

        let size_bytes = if upload.size > 0 {
            upload.size
        } else {
            metadata.size_bytes
        };

        Ok(evaluate(
            &metadata,
            detected.as_deref(),
            size_bytes,
            requirements,
            self.options.locale,
        ))
    }

    fn extraction_failed(&self, path: &Path, e: ProbeError) -> Result<ValidationReport, ValidationError> {
        match self.options.policy {
            FailurePolicy::Propagate => {
                log::warn!("mediagate: could not probe {}: {}", path.display(), e);
                Err(ValidationError::from(e))
            }
            FailurePolicy::EmptyReport => {
                log::error!(
                    "mediagate: could not probe {}, returning empty report: {}",
                    path.display(),
                    e
                );
                Ok(ValidationReport::new())
            }
        }
    }
}

fn check_inputs(upload: &Upload, buffer: &[u8]) -> Result<(), ValidationError> {
    if upload.path.as_os_str().is_empty() {
        return Err(ValidationError::MissingPath);
    }
    if buffer.is_empty() {
        return Err(ValidationError::MissingBuffer);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

struct Context<'a> {
    metadata: &'a MediaMetadata,
    detected_mime: Option<&'a str>,
    size_bytes: u64,
    requirements: &'a RequirementSet,
    locale: Locale,
}

type Check = fn(&Context<'_>) -> Option<RequirementResult>;

const CHECKS: [Check; 13] = [
    check_mime_type,
    check_size,
    check_resolution,
    check_min_size,
    check_duration,
    check_frame_rate,
    check_aspect_ratio,
    check_aspect_ratio_interval,
    check_sample_rate,
    check_channels,
    check_codec_video,
    check_codec_audio,
    check_bit_rate,
];

/// Evaluate every configured category against extracted metadata.
///
/// `detected_mime` is the sniffed type (`None` when undetectable or not
/// sniffed). `size_bytes` is the upload size used by the size category.
pub fn evaluate(
    metadata: &MediaMetadata,
    detected_mime: Option<&str>,
    size_bytes: u64,
    requirements: &RequirementSet,
    locale: Locale,
) -> ValidationReport {
    let cx = Context {
        metadata,
        detected_mime,
        size_bytes,
        requirements,
        locale,
    };

    let mut report = ValidationReport::new();
    for check in CHECKS {
        if let Some(result) = check(&cx) {
            log::debug!(
                "mediagate: {} {} (value {:?})",
                result.kind.as_str(),
                if result.status { "pass" } else { "fail" },
                result.value
            );
            report.push(result);
        }
    }
    report
}

impl Context<'_> {
    fn result(&self, kind: RequirementType, status: bool, value: String, allowed: Vec<String>) -> Option<RequirementResult> {
        Some(RequirementResult {
            title: messages::title(self.locale, kind).to_string(),
            kind,
            status,
            value,
            allowed,
        })
    }

    /// `(min, max)` when either is configured; an absent bound reads as 0.
    fn bounds(&self, min: RequirementKey, max: RequirementKey) -> Option<(f64, f64)> {
        let min = self.requirements.number(min);
        let max = self.requirements.number(max);
        (min != 0.0 || max != 0.0).then_some((min, max))
    }

    fn visual(&self) -> Option<&VisualProps> {
        self.metadata.visual()
    }

    fn audio(&self) -> Option<&AudioProps> {
        self.metadata.audio()
    }

    fn unknown(&self) -> String {
        messages::unknown(self.locale).to_string()
    }
}

fn within(value: f64, (min, max): (f64, f64)) -> bool {
    value >= min && value <= max
}

fn allowed_mime_types(requirements: &RequirementSet) -> Vec<String> {
    requirements
        .values(RequirementKey::MimeType)
        .into_iter()
        .filter(|m| !m.is_empty())
        .collect()
}

/// Codec allow-list: trimmed, lowercased, de-duplicated.
fn allowed_codecs(requirements: &RequirementSet, key: RequirementKey) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for codec in requirements.values(key) {
        let codec = codec.trim().to_lowercase();
        if !codec.is_empty() && !out.contains(&codec) {
            out.push(codec);
        }
    }
    out
}

fn check_mime_type(cx: &Context<'_>) -> Option<RequirementResult> {
    let allowed = allowed_mime_types(cx.requirements);
    if allowed.is_empty() {
        return None;
    }
    let (status, value) = match cx.detected_mime {
        Some(detected) => (mime::is_allowed(detected, &allowed), detected.to_string()),
        None => (false, cx.unknown()),
    };
    cx.result(RequirementType::MimeType, status, value, allowed)
}

fn check_size(cx: &Context<'_>) -> Option<RequirementResult> {
    let bounds = cx.bounds(RequirementKey::MinSizeMb, RequirementKey::MaxSizeMb)?;
    let size_mb = cx.size_bytes as f64 / 1024.0 / 1024.0;
    cx.result(
        RequirementType::Size,
        within(size_mb, bounds),
        format!("{}MB", fmt_num(round2(size_mb))),
        messages::size_bounds(cx.locale, bounds.0, bounds.1),
    )
}

fn check_resolution(cx: &Context<'_>) -> Option<RequirementResult> {
    let visual = cx.visual()?;
    let req = cx.requirements;
    let h_width = req.number(RequirementKey::MaxWidthHorizontalPx);
    let h_height = req.number(RequirementKey::MaxHeightHorizontalPx);
    let v_width = req.number(RequirementKey::MaxWidthVerticalPx);
    let v_height = req.number(RequirementKey::MaxHeightVerticalPx);
    if [h_width, h_height, v_width, v_height].iter().all(|b| *b == 0.0) {
        return None;
    }

    let (width, height) = (visual.width as f64, visual.height as f64);
    let fits_horizontal = width <= h_width && height <= h_height;
    let fits_vertical = width <= v_width && height <= v_height;
    cx.result(
        RequirementType::Resolution,
        fits_horizontal || fits_vertical,
        messages::dimensions(cx.locale, visual.width, visual.height),
        messages::resolution_bounds(cx.locale, h_width, h_height, v_width, v_height),
    )
}

fn check_min_size(cx: &Context<'_>) -> Option<RequirementResult> {
    let visual = cx.visual()?;
    let (min_width, min_height) = cx.bounds(RequirementKey::MinWidth, RequirementKey::MinHeight)?;
    cx.result(
        RequirementType::MinSize,
        visual.width as f64 >= min_width && visual.height as f64 >= min_height,
        messages::dimensions(cx.locale, visual.width, visual.height),
        messages::min_size_bounds(cx.locale, min_width, min_height),
    )
}

fn check_duration(cx: &Context<'_>) -> Option<RequirementResult> {
    let bounds = cx.bounds(RequirementKey::MinDuration, RequirementKey::MaxDuration)?;
    let duration = cx.metadata.duration_secs;
    cx.result(
        RequirementType::Duration,
        within(duration, bounds),
        messages::seconds(cx.locale, round2(duration)),
        messages::duration_bounds(cx.locale, bounds.0, bounds.1),
    )
}

fn check_frame_rate(cx: &Context<'_>) -> Option<RequirementResult> {
    let visual = cx.visual()?;
    let bounds = cx.bounds(RequirementKey::MinFrameRate, RequirementKey::MaxFrameRate)?;
    let (status, value) = match visual.frame_rate {
        Some(fps) => (within(fps, bounds), fmt_num(round2(fps))),
        None => (false, cx.unknown()),
    };
    cx.result(
        RequirementType::FrameRate,
        status,
        value,
        messages::frame_rate_bounds(cx.locale, bounds.0, bounds.1),
    )
}

fn check_aspect_ratio(cx: &Context<'_>) -> Option<RequirementResult> {
    let visual = cx.visual()?;
    let allowed: Vec<String> = cx
        .requirements
        .values(RequirementKey::AspectRatio)
        .into_iter()
        .filter(|r| !r.is_empty())
        .collect();
    if allowed.is_empty() {
        return None;
    }
    cx.result(
        RequirementType::AspectRatio,
        allowed.contains(&visual.aspect_ratio),
        visual.aspect_ratio.clone(),
        allowed,
    )
}

fn check_aspect_ratio_interval(cx: &Context<'_>) -> Option<RequirementResult> {
    let visual = cx.visual()?;
    let min = cx.requirements.value(RequirementKey::MinAspectRatio).filter(|v| v.is_set())?;
    let max = cx.requirements.value(RequirementKey::MaxAspectRatio).filter(|v| v.is_set())?;
    cx.result(
        RequirementType::AspectRatioInterval,
        ratio::in_range(visual.width as f64, visual.height as f64, min, max),
        format!("{}, {}x{}", visual.aspect_ratio, visual.width, visual.height),
        messages::aspect_interval(cx.locale, &min.to_text(), &max.to_text()),
    )
}

fn check_sample_rate(cx: &Context<'_>) -> Option<RequirementResult> {
    let audio = cx.audio()?;
    let bounds = cx.bounds(RequirementKey::MinSampleRate, RequirementKey::MaxSampleRate)?;
    let (status, value) = match audio.sample_rate_hz {
        Some(hz) => (within(hz, bounds), format!("{} Hz", fmt_num(hz))),
        None => (false, cx.unknown()),
    };
    cx.result(
        RequirementType::SampleRate,
        status,
        value,
        messages::sample_rate_bounds(cx.locale, bounds.0, bounds.1),
    )
}

fn check_channels(cx: &Context<'_>) -> Option<RequirementResult> {
    let audio = cx.audio()?;
    let bounds = cx.bounds(RequirementKey::MinChannels, RequirementKey::MaxChannels)?;
    let (status, value) = match audio.channels {
        Some(n) => (within(n as f64, bounds), n.to_string()),
        None => (false, cx.unknown()),
    };
    cx.result(
        RequirementType::Channels,
        status,
        value,
        messages::channel_bounds(cx.locale, bounds.0, bounds.1),
    )
}

fn check_codec_video(cx: &Context<'_>) -> Option<RequirementResult> {
    let visual = cx.visual()?;
    let allowed = allowed_codecs(cx.requirements, RequirementKey::CodecVideo);
    if allowed.is_empty() {
        return None;
    }
    let codec = visual.video_codec.trim().to_lowercase();
    cx.result(RequirementType::CodecVideo, allowed.contains(&codec), codec, allowed)
}

fn check_codec_audio(cx: &Context<'_>) -> Option<RequirementResult> {
    let allowed = allowed_codecs(cx.requirements, RequirementKey::CodecAudio);
    if allowed.is_empty() {
        return None;
    }
    let codec = cx.metadata.audio_codec.trim().to_lowercase();
    cx.result(RequirementType::CodecAudio, allowed.contains(&codec), codec, allowed)
}

fn check_bit_rate(cx: &Context<'_>) -> Option<RequirementResult> {
    let bounds = cx.bounds(RequirementKey::MinBitRate, RequirementKey::MaxBitRate)?;
    let observed = cx.metadata.bit_rate();
    let unit = cx
        .requirements
        .value(RequirementKey::BitRateUnit)
        .filter(|v| v.is_set())
        .and_then(|v| match v.to_text().parse::<RateUnit>() {
            Ok(unit) => Some(unit),
            Err(e) => {
                log::warn!("mediagate: {}; guessing bit-rate unit", e);
                None
            }
        });

    let (min, max, label) = reconcile_bit_rate(cx.metadata.is_audio_only(), observed, bounds, unit);
    cx.result(
        RequirementType::BitRate,
        within(observed, (min, max)),
        format!("{} {}", fmt_num(round2(observed)), label),
        messages::bit_rate_bounds(cx.locale, min, max, label),
    )
}

// ---------------------------------------------------------------------------
// Bit-rate units
// ---------------------------------------------------------------------------

/// Unit the configured bit-rate bounds were authored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateUnit {
    Kbps,
    Mbps,
}

impl FromStr for RateUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kbps" | "kbit/s" | "kb/s" => Ok(RateUnit::Kbps),
            "mbps" | "mbit/s" | "mb/s" => Ok(RateUnit::Mbps),
            other => Err(format!("unknown bit-rate unit: {}", other)),
        }
    }
}

/// Bring configured bounds into the observed file's unit.
///
/// Visual files carry Mbps, audio files kbps. With an explicit unit the
/// bounds are scaled exactly. Without one, audio bounds are guessed to be
/// Mbps when the maximum is positive, below the observed rate, and the
/// observed rate is above 50 kbps. That guess misfires for genuine kbps
/// bounds below a loud file's rate, e.g. `max_bit_rate: 48` against 64 kbps.
fn reconcile_bit_rate(
    audio_only: bool,
    observed: f64,
    (min, max): (f64, f64),
    unit: Option<RateUnit>,
) -> (f64, f64, &'static str) {
    if !audio_only {
        return match unit {
            Some(RateUnit::Kbps) => (min / 1000.0, max / 1000.0, "Mbps"),
            _ => (min, max, "Mbps"),
        };
    }

    let scale = match unit {
        Some(RateUnit::Mbps) => true,
        Some(RateUnit::Kbps) => false,
        None => max > 0.0 && max < observed && observed > 50.0,
    };
    if scale {
        (min * 1000.0, max * 1000.0, "kbps")
    } else {
        (min, max, "kbps")
    }
}
