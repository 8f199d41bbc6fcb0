//! Environment configuration shared by the CLI and the C surface.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::catalog::Catalog;
use crate::effects::ffprobe::DEFAULT_PROGRAM;
use crate::effects::ProbeBackend;
use crate::engine::{FailurePolicy, ValidatorOptions};
use crate::error::ValidationError;
use crate::messages::Locale;

pub const ENV_CATALOG: &str = "MEDIAGATE_CATALOG";
pub const ENV_FFPROBE: &str = "MEDIAGATE_FFPROBE";
pub const ENV_PROBE: &str = "MEDIAGATE_PROBE";
pub const ENV_LOCALE: &str = "MEDIAGATE_LOCALE";
pub const ENV_POLICY: &str = "MEDIAGATE_POLICY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Requirement catalog file, if any.
    pub catalog: Option<PathBuf>,
    /// ffprobe binary to run.
    pub ffprobe: String,
    pub probe: ProbeBackend,
    pub locale: Locale,
    pub policy: FailurePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog: None,
            ffprobe: DEFAULT_PROGRAM.to_string(),
            probe: ProbeBackend::default(),
            locale: Locale::default(),
            policy: FailurePolicy::default(),
        }
    }
}

impl Settings {
    /// Read the `MEDIAGATE_*` variables. Bad values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            catalog: get(ENV_CATALOG).map(PathBuf::from),
            ffprobe: get(ENV_FFPROBE).unwrap_or(defaults.ffprobe),
            probe: parse_or(ENV_PROBE, get(ENV_PROBE), defaults.probe),
            locale: parse_or(ENV_LOCALE, get(ENV_LOCALE), defaults.locale),
            policy: parse_or(ENV_POLICY, get(ENV_POLICY), defaults.policy),
        }
    }

    pub fn options(&self) -> ValidatorOptions {
        ValidatorOptions {
            policy: self.policy,
            locale: self.locale,
        }
    }

    /// Load the configured catalog; `Ok(None)` when no path is set.
    pub fn load_catalog(&self) -> Result<Option<Catalog>, ValidationError> {
        self.catalog.as_deref().map(Catalog::load).transpose()
    }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match raw.map(|v| v.parse::<T>()) {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            log::warn!("mediagate: ignoring {}: {}", name, e);
            default
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.ffprobe, "ffprobe");
        assert_eq!(settings.load_catalog().unwrap().map(|c| c.len()), None);
    }

    #[test]
    fn reads_every_variable() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_CATALOG, "/etc/mediagate/catalog.json"),
            (ENV_FFPROBE, "/opt/ffmpeg/bin/ffprobe"),
            (ENV_PROBE, "auto"),
            (ENV_LOCALE, "es"),
            (ENV_POLICY, "empty"),
        ]));
        assert_eq!(settings.catalog, Some(PathBuf::from("/etc/mediagate/catalog.json")));
        assert_eq!(settings.ffprobe, "/opt/ffmpeg/bin/ffprobe");
        assert_eq!(settings.probe, ProbeBackend::Auto);
        assert_eq!(settings.options().locale, Locale::Es);
        assert_eq!(settings.options().policy, FailurePolicy::EmptyReport);
    }

    #[test]
    fn bad_values_fall_back() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_PROBE, "gstreamer"),
            (ENV_LOCALE, "fr"),
            (ENV_FFPROBE, "  "),
        ]));
        assert_eq!(settings.probe, ProbeBackend::Ffprobe);
        assert_eq!(settings.locale, Locale::En);
        assert_eq!(settings.ffprobe, "ffprobe");
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let settings = Settings {
            catalog: Some(PathBuf::from("/nonexistent/mediagate/catalog.json")),
            ..Settings::default()
        };
        assert!(matches!(settings.load_catalog(), Err(ValidationError::Catalog(_))));
    }
}
