//! Requirement keys, authored values and the resolved requirement set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::numeric::{fmt_num, parse_leading_f64};

/// Every requirement key a catalog may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKey {
    MimeType,
    MaxSizeMb,
    MinSizeMb,
    MaxHeightHorizontalPx,
    MaxWidthHorizontalPx,
    MaxHeightVerticalPx,
    MaxWidthVerticalPx,
    MinHeight,
    MinWidth,
    MinDuration,
    MaxDuration,
    MinFrameRate,
    MaxFrameRate,
    AspectRatio,
    MinAspectRatio,
    MaxAspectRatio,
    MinSampleRate,
    MaxSampleRate,
    MinChannels,
    MaxChannels,
    CodecVideo,
    CodecAudio,
    MinBitRate,
    MaxBitRate,
    /// Explicit unit (`kbps` or `mbps`) for the bit-rate bounds.
    BitRateUnit,
}

impl RequirementKey {
    pub const ALL: [RequirementKey; 25] = [
        Self::MimeType,
        Self::MaxSizeMb,
        Self::MinSizeMb,
        Self::MaxHeightHorizontalPx,
        Self::MaxWidthHorizontalPx,
        Self::MaxHeightVerticalPx,
        Self::MaxWidthVerticalPx,
        Self::MinHeight,
        Self::MinWidth,
        Self::MinDuration,
        Self::MaxDuration,
        Self::MinFrameRate,
        Self::MaxFrameRate,
        Self::AspectRatio,
        Self::MinAspectRatio,
        Self::MaxAspectRatio,
        Self::MinSampleRate,
        Self::MaxSampleRate,
        Self::MinChannels,
        Self::MaxChannels,
        Self::CodecVideo,
        Self::CodecAudio,
        Self::MinBitRate,
        Self::MaxBitRate,
        Self::BitRateUnit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MimeType => "mime_type",
            Self::MaxSizeMb => "max_size_mb",
            Self::MinSizeMb => "min_size_mb",
            Self::MaxHeightHorizontalPx => "max_height_horizontal_px",
            Self::MaxWidthHorizontalPx => "max_width_horizontal_px",
            Self::MaxHeightVerticalPx => "max_height_vertical_px",
            Self::MaxWidthVerticalPx => "max_width_vertical_px",
            Self::MinHeight => "min_height",
            Self::MinWidth => "min_width",
            Self::MinDuration => "min_duration",
            Self::MaxDuration => "max_duration",
            Self::MinFrameRate => "min_frame_rate",
            Self::MaxFrameRate => "max_frame_rate",
            Self::AspectRatio => "aspect_ratio",
            Self::MinAspectRatio => "min_aspect_ratio",
            Self::MaxAspectRatio => "max_aspect_ratio",
            Self::MinSampleRate => "min_sample_rate",
            Self::MaxSampleRate => "max_sample_rate",
            Self::MinChannels => "min_channels",
            Self::MaxChannels => "max_channels",
            Self::CodecVideo => "codec_video",
            Self::CodecAudio => "codec_audio",
            Self::MinBitRate => "min_bit_rate",
            Self::MaxBitRate => "max_bit_rate",
            Self::BitRateUnit => "bit_rate_unit",
        }
    }
}

impl fmt::Display for RequirementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequirementKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown requirement key: {}", s))
    }
}

/// A constraint value exactly as authored: a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Number(f64),
    Text(String),
}

impl MetaValue {
    /// Numeric reading. Unparsable text counts as 0, i.e. "not configured".
    pub fn as_number(&self) -> f64 {
        match self {
            MetaValue::Number(n) if n.is_finite() => *n,
            MetaValue::Number(_) => 0.0,
            MetaValue::Text(t) => parse_leading_f64(t).unwrap_or(0.0),
        }
    }

    /// Non-zero number or non-empty text.
    pub fn is_set(&self) -> bool {
        match self {
            MetaValue::Number(n) => *n != 0.0 && !n.is_nan(),
            MetaValue::Text(t) => !t.is_empty(),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            MetaValue::Number(n) => fmt_num(*n),
            MetaValue::Text(t) => t.clone(),
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<f64> for MetaValue {
    fn from(n: f64) -> Self {
        MetaValue::Number(n)
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        MetaValue::Number(n as f64)
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

/// One authored catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementEntry {
    pub meta_key: String,
    pub meta_value: MetaValue,
}

/// The requirements applicable to one placement, in authored order.
///
/// Scalar keys read their first occurrence; list keys (`mime_type`,
/// `aspect_ratio`, `codec_*`) read every occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementSet {
    entries: Vec<(RequirementKey, MetaValue)>,
}

impl RequirementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type authored rows. Unknown keys are logged and dropped.
    pub fn from_entries<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = RequirementEntry>,
    {
        let mut set = Self::new();
        for row in rows {
            match row.meta_key.trim().parse::<RequirementKey>() {
                Ok(key) => set.push(key, row.meta_value),
                Err(e) => log::warn!("mediagate: ignoring requirement row: {}", e),
            }
        }
        set
    }

    pub fn push(&mut self, key: RequirementKey, value: impl Into<MetaValue>) {
        self.entries.push((key, value.into()));
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, key: RequirementKey, value: impl Into<MetaValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any category-governing key carries a value. `bit_rate_unit`
    /// only qualifies other keys, and zeros or blank text configure nothing.
    pub fn has_constraints(&self) -> bool {
        self.entries.iter().any(|(key, value)| {
            *key != RequirementKey::BitRateUnit
                && match value {
                    MetaValue::Text(t) => !t.trim().is_empty(),
                    number => number.is_set(),
                }
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = (RequirementKey, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// First value authored for `key`.
    pub fn value(&self, key: RequirementKey) -> Option<&MetaValue> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// First value for `key` read as a number; 0 when absent.
    pub fn number(&self, key: RequirementKey) -> f64 {
        self.value(key).map(MetaValue::as_number).unwrap_or(0.0)
    }

    /// All values for `key` as text, de-duplicated, authored order kept.
    pub fn values(&self, key: RequirementKey) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for (_, v) in self.entries.iter().filter(|(k, _)| *k == key) {
            let text = v.to_text();
            if !out.contains(&text) {
                out.push(text);
            }
        }
        out
    }
}

impl FromIterator<(RequirementKey, MetaValue)> for RequirementSet {
    fn from_iter<T: IntoIterator<Item = (RequirementKey, MetaValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_roundtrip() {
        for key in RequirementKey::ALL {
            assert_eq!(key.as_str().parse::<RequirementKey>(), Ok(key));
        }
        assert!("max_size".parse::<RequirementKey>().is_err());
    }

    #[test]
    fn key_serde_matches_as_str() {
        let json = serde_json::to_string(&RequirementKey::MaxWidthVerticalPx).unwrap();
        assert_eq!(json, "\"max_width_vertical_px\"");
    }

    #[test]
    fn meta_value_numeric_reading() {
        assert_eq!(MetaValue::from(5.0).as_number(), 5.0);
        assert_eq!(MetaValue::from("15").as_number(), 15.0);
        assert_eq!(MetaValue::from("4:3").as_number(), 4.0);
        assert_eq!(MetaValue::from("h264").as_number(), 0.0);
    }

    #[test]
    fn meta_value_is_set() {
        assert!(!MetaValue::from(0.0).is_set());
        assert!(MetaValue::from(0.5).is_set());
        assert!(!MetaValue::from("").is_set());
        assert!(MetaValue::from("0").is_set());
    }

    #[test]
    fn rows_deserialize_number_or_text() {
        let rows: Vec<RequirementEntry> = serde_json::from_str(
            r#"[{"meta_key":"max_size_mb","meta_value":5},
                {"meta_key":"codec_video","meta_value":"h264"}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].meta_value, MetaValue::Number(5.0));
        assert_eq!(rows[1].meta_value, MetaValue::Text("h264".into()));
    }

    #[test]
    fn from_entries_drops_unknown_keys() {
        let set = RequirementSet::from_entries(vec![
            RequirementEntry { meta_key: "max_size_mb".into(), meta_value: 5.0.into() },
            RequirementEntry { meta_key: "max_fun".into(), meta_value: 1.0.into() },
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.number(RequirementKey::MaxSizeMb), 5.0);
    }

    #[test]
    fn scalar_reads_first_occurrence() {
        let set = RequirementSet::new()
            .with(RequirementKey::MaxDuration, 15.0)
            .with(RequirementKey::MaxDuration, 30.0);
        assert_eq!(set.number(RequirementKey::MaxDuration), 15.0);
        assert_eq!(set.number(RequirementKey::MinDuration), 0.0);
    }

    #[test]
    fn list_values_deduplicated_in_order() {
        let set = RequirementSet::new()
            .with(RequirementKey::AspectRatio, "16:9")
            .with(RequirementKey::AspectRatio, "1:1")
            .with(RequirementKey::AspectRatio, "16:9");
        assert_eq!(set.values(RequirementKey::AspectRatio), vec!["16:9", "1:1"]);
        assert!(set.values(RequirementKey::CodecVideo).is_empty());
    }
}
