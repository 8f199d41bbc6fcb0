//! Error types.
//!
//! `ProbeError` is what extractors report. `ValidationError` is what callers
//! of the engine see; its `Display` is for logs, `user_message` is the static
//! text safe to show an uploader.

use std::path::PathBuf;

use thiserror::Error;

use crate::messages::{self, Locale};

/// Failure to extract metadata from a file.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Tool {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("could not parse probe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no video or audio stream found in {0}")]
    NoStreams(PathBuf),

    #[error("unsupported media for this extractor: {0}")]
    Unsupported(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl ProbeError {
    /// The probing tool itself is unavailable (as opposed to the file being bad).
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, ProbeError::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Failure of a validation request as a whole. Never a per-category outcome.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no file path given")]
    MissingPath,

    #[error("no file contents given")]
    MissingBuffer,

    #[error("no placement given")]
    MissingPlacement,

    #[error("requirement set is empty")]
    EmptyRequirements,

    #[error("no requirements configured for placement {0}")]
    RequirementsNotFound(String),

    #[error("invalid requirement catalog: {0}")]
    Catalog(String),

    #[error("could not read the file")]
    Unreadable {
        #[source]
        source: ProbeError,
    },
}

impl ValidationError {
    /// Static, non-technical message for the uploader.
    pub fn user_message(&self, locale: Locale) -> &'static str {
        match self {
            ValidationError::MissingPath => messages::missing_path(locale),
            ValidationError::MissingBuffer => messages::missing_buffer(locale),
            ValidationError::MissingPlacement => messages::missing_placement(locale),
            ValidationError::EmptyRequirements | ValidationError::RequirementsNotFound(_) => {
                messages::requirements_not_found(locale)
            }
            ValidationError::Catalog(_) => messages::catalog_invalid(locale),
            ValidationError::Unreadable { .. } => messages::unreadable(locale),
        }
    }

    /// Input and configuration errors are raised before any probing.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, ValidationError::Unreadable { .. })
    }
}

impl From<ProbeError> for ValidationError {
    fn from(source: ProbeError) -> Self {
        ValidationError::Unreadable { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn unreadable_keeps_cause_but_hides_it_from_users() {
        let err = ValidationError::from(ProbeError::NoStreams(PathBuf::from("/tmp/x.bin")));
        assert_eq!(err.to_string(), "could not read the file");
        assert!(err.source().unwrap().to_string().contains("/tmp/x.bin"));
        assert_eq!(err.user_message(Locale::Es), "No se ha podido leer el archivo del material.");
        assert!(!err.is_input_error());
    }

    #[test]
    fn missing_binary_is_tool_missing() {
        let err = ProbeError::Spawn {
            program: "ffprobe".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
        };
        assert!(err.is_tool_missing());
        assert!(!ProbeError::Decode("bad".into()).is_tool_missing());
    }

    #[test]
    fn requirement_errors_are_input_errors() {
        let err = ValidationError::RequirementsNotFound("42".into());
        assert!(err.is_input_error());
        assert!(err.to_string().contains("42"));
    }
}
