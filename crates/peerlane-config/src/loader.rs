//! Loading configuration documents from strings, values, and files.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::model::PeerlaneConfig;
use crate::validate::{ensure_known_fields, validate};

impl PeerlaneConfig {
    /// Decode and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and the validation
    /// errors of [`PeerlaneConfig::from_value`].
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|source| ConfigError::Parse { source })?;
        Self::from_value(value)
    }

    /// Decode and validate an already-parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownField`] for unexpected keys,
    /// [`ConfigError::Parse`] for mistyped values, and
    /// [`ConfigError::InvalidField`] for out-of-range values.
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        ensure_known_fields(&value)?;
        let config: Self =
            serde_json::from_value(value).map_err(|source| ConfigError::Parse { source })?;
        validate(&config)?;
        debug!(?config, "configuration decoded");
        Ok(config)
    }

    /// Read, decode, and validate a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and the errors
    /// of [`PeerlaneConfig::from_json_str`] otherwise.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            operation: "config.read",
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use peerlane_telemetry::LogFormat;
    use std::io::Write;

    #[test]
    fn partial_documents_fill_defaults() -> Result<()> {
        let config = PeerlaneConfig::from_json_str(r#"{"chaining": {"default_overwrite": true}}"#)?;
        assert!(config.chaining.default_overwrite);
        assert_eq!(config.chaining.descriptor_suffix, ".torrent");
        assert_eq!(config.events, crate::model::EventSettings::default());
        Ok(())
    }

    #[test]
    fn empty_document_is_default() -> Result<()> {
        assert_eq!(PeerlaneConfig::from_json_str("{}")?, PeerlaneConfig::default());
        Ok(())
    }

    #[test]
    fn malformed_and_mistyped_documents_fail_to_parse() {
        assert!(matches!(
            PeerlaneConfig::from_json_str("{"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            PeerlaneConfig::from_json_str(r#"{"events": {"replay_capacity": "many"}}"#),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            PeerlaneConfig::from_json_str(r#"{"telemetry": {"format": "xml"}}"#),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn invalid_values_are_rejected_after_decoding() {
        assert!(matches!(
            PeerlaneConfig::from_json_str(r#"{"chaining": {"descriptor_suffix": "torrent"}}"#),
            Err(ConfigError::InvalidField {
                section: "chaining",
                ..
            })
        ));
    }

    #[test]
    fn load_reads_files() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"telemetry": {{"level": "debug", "format": "json"}}, "events": {{"replay_capacity": 16}}}}"#
        )?;
        let config = PeerlaneConfig::load(file.path())?;
        assert_eq!(config.telemetry.level, "debug");
        assert_eq!(config.telemetry.format, Some(LogFormat::Json));
        assert_eq!(config.events.replay_capacity, 16);
        Ok(())
    }

    #[test]
    fn load_reports_missing_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("absent.json");
        match PeerlaneConfig::load(&missing) {
            Err(ConfigError::Io { path, operation, .. }) => {
                assert_eq!(path, missing);
                assert_eq!(operation, "config.read");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }
}
