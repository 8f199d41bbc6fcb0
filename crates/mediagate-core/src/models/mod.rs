//! Mediagate data models.
//!
//! Metadata is a tagged enum so audio-only files never reach the visual
//! checks. Requirement sets keep authored order; reports keep engine order.

pub mod media;
pub mod report;
pub mod requirements;

pub use media::{AudioProps, MediaKind, MediaMetadata, VisualProps};
pub use report::{RequirementResult, RequirementType, ValidationReport};
pub use requirements::{MetaValue, RequirementEntry, RequirementKey, RequirementSet};
