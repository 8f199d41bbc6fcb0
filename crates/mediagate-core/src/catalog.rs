//! Requirement resolution: placement id -> [`RequirementSet`].
//!
//! The engine only sees [`RequirementResolver`]. [`Catalog`] is the stock
//! implementation, a JSON document mapping placement ids to authored rows:
//!
//! ```json
//! {
//!   "validated_media": [14, 22],
//!   "placements": {
//!     "101": [
//!       { "meta_key": "max_size_mb", "meta_value": 5 },
//!       { "meta_key": "codec_video", "meta_value": "h264" }
//!     ]
//!   }
//! }
//! ```
//!
//! The bare `placements` object is accepted on its own as well.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::models::{MetaValue, RequirementEntry, RequirementKey, RequirementSet};

/// Looks up the requirements configured for a placement.
pub trait RequirementResolver: Send + Sync {
    fn resolve(&self, placement: &str) -> Result<RequirementSet, ValidationError>;

    /// Whether files for this media category are technically validated at all.
    fn validates_media(&self, _media_id: Option<u32>) -> bool {
        true
    }
}

impl<F> RequirementResolver for F
where
    F: Fn(&str) -> Result<RequirementSet, ValidationError> + Send + Sync,
{
    fn resolve(&self, placement: &str) -> Result<RequirementSet, ValidationError> {
        self(placement)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Full {
        #[serde(default)]
        validated_media: Vec<u32>,
        placements: HashMap<String, Vec<RequirementEntry>>,
    },
    Bare(HashMap<String, Vec<RequirementEntry>>),
}

/// Static placement -> requirement rows mapping.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    validated_media: Vec<u32>,
    placements: HashMap<String, Vec<RequirementEntry>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| ValidationError::Catalog(e.to_string()))?;
        Ok(match file {
            CatalogFile::Full {
                validated_media,
                placements,
            } => Self {
                validated_media,
                placements: trim_ids(placements),
            },
            CatalogFile::Bare(placements) => Self {
                validated_media: Vec::new(),
                placements: trim_ids(placements),
            },
        })
    }

    pub fn load(path: &Path) -> Result<Self, ValidationError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ValidationError::Catalog(format!("{}: {}", path.display(), e)))?;
        let catalog = Self::from_json_str(&json)?;
        log::debug!(
            "mediagate: loaded {} placements from {}",
            catalog.placements.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Builder: add (or replace) the rows of one placement.
    pub fn with_placement(mut self, placement: &str, rows: Vec<RequirementEntry>) -> Self {
        self.placements.insert(placement.trim().to_string(), rows);
        self
    }

    /// Builder: restrict validation to these media categories.
    pub fn with_validated_media(mut self, media: Vec<u32>) -> Self {
        self.validated_media = media;
        self
    }

    pub fn validated_media(&self) -> &[u32] {
        &self.validated_media
    }

    /// Placement ids, sorted.
    pub fn placements(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.placements.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

fn trim_ids(
    placements: HashMap<String, Vec<RequirementEntry>>,
) -> HashMap<String, Vec<RequirementEntry>> {
    placements
        .into_iter()
        .map(|(id, rows)| (id.trim().to_string(), rows))
        .collect()
}

impl RequirementResolver for Catalog {
    fn resolve(&self, placement: &str) -> Result<RequirementSet, ValidationError> {
        let placement = placement.trim();
        let rows = self
            .placements
            .get(placement)
            .filter(|rows| !rows.is_empty())
            .ok_or_else(|| ValidationError::RequirementsNotFound(placement.to_string()))?;

        let set = RequirementSet::from_entries(rows.iter().cloned());
        if !set.has_constraints() {
            return Err(ValidationError::RequirementsNotFound(placement.to_string()));
        }
        Ok(set)
    }

    /// An empty list, or no media id on the request, validates everything.
    fn validates_media(&self, media_id: Option<u32>) -> bool {
        match media_id {
            Some(id) if !self.validated_media.is_empty() => self.validated_media.contains(&id),
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Inline requirement documents
// ---------------------------------------------------------------------------

/// Parse a requirement set given directly as JSON.
///
/// Accepts either the catalog row form (`[{"meta_key", "meta_value"}, ...]`)
/// or an object of key -> value, where list keys may take an array:
/// `{"max_size_mb": 5, "codec_video": ["h264", "vp9"]}`.
pub fn requirement_set_from_json(value: &Value) -> Result<RequirementSet, ValidationError> {
    match value {
        Value::Array(_) => {
            let rows: Vec<RequirementEntry> = serde_json::from_value(value.clone())
                .map_err(|e| ValidationError::Catalog(e.to_string()))?;
            Ok(RequirementSet::from_entries(rows))
        }
        Value::Object(map) => {
            let mut set = RequirementSet::new();
            for (name, raw) in map {
                let key = match name.trim().parse::<RequirementKey>() {
                    Ok(key) => key,
                    Err(e) => {
                        log::warn!("mediagate: ignoring requirement: {}", e);
                        continue;
                    }
                };
                match raw {
                    Value::Array(items) => {
                        for item in items {
                            push_scalar(&mut set, key, item)?;
                        }
                    }
                    other => push_scalar(&mut set, key, other)?,
                }
            }
            Ok(set)
        }
        _ => Err(ValidationError::Catalog(
            "requirements must be a JSON array of rows or an object".into(),
        )),
    }
}

fn push_scalar(set: &mut RequirementSet, key: RequirementKey, value: &Value) -> Result<(), ValidationError> {
    let value = match value {
        Value::Number(n) => MetaValue::Number(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => MetaValue::Text(s.clone()),
        other => {
            return Err(ValidationError::Catalog(format!(
                "{}: expected a number or a string, got {}",
                key, other
            )))
        }
    };
    set.push(key, value);
    Ok(())
}
