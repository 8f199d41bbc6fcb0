//! mediagate-core: technical validation of uploaded media.
//!
//! A file is checked against the requirements of the placement it was
//! uploaded for, and every configured category gets a pass/fail result.
//!
//! # Architecture
//!
//! ```text
//! Upload + buffer
//!   -> RequirementResolver   (catalog: placement id -> RequirementSet)
//!   -> MetadataExtractor     (ffprobe or native decoders -> MediaMetadata)
//!   -> SignatureSniffer      (magic bytes -> MIME type, only if asked for)
//!   -> evaluate              (pure: metadata x requirements -> ValidationReport)
//! ```
//!
//! ```no_run
//! use mediagate_core::{Catalog, PlacementRef, Settings, Upload, Validator};
//!
//! # fn main() -> Result<(), mediagate_core::ValidationError> {
//! let settings = Settings::from_env();
//! let catalog = Catalog::load(std::path::Path::new("catalog.json"))?;
//! let validator = Validator::from_settings(&settings);
//!
//! let path = std::path::Path::new("upload.mp4");
//! let upload = Upload::from_path(path)?;
//! let buffer = std::fs::read(path).unwrap_or_default();
//! let report = validator.check_placement(&upload, &buffer, &PlacementRef::new("101"), &catalog)?;
//! println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod effects;
pub mod engine;
pub mod error;
#[doc(hidden)]
pub mod fixtures;
pub mod messages;
pub mod mime;
pub mod models;
pub mod numeric;
pub mod ratio;
pub mod settings;

pub use catalog::{requirement_set_from_json, Catalog, RequirementResolver};
pub use effects::{MetadataExtractor, ProbeBackend, Signature, SignatureSniffer};
pub use engine::{evaluate, FailurePolicy, PlacementRef, Upload, Validator, ValidatorOptions};
pub use error::{ProbeError, ValidationError};
pub use messages::Locale;
pub use models::*;
pub use settings::Settings;
