//! Validation of decoded configuration documents.

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{ChainingPolicy, EventSettings, PeerlaneConfig, TelemetrySettings};

/// Upper bound on the replay ring.
pub const MAX_REPLAY_CAPACITY: usize = 1 << 20;

const SECTIONS: &[(&str, &[&str])] = &[
    ("chaining", &["descriptor_suffix", "default_overwrite"]),
    ("telemetry", &["level", "format"]),
    ("events", &["replay_capacity"]),
];

/// Reject keys that no section defines.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownField`] for the first unexpected key and
/// [`ConfigError::InvalidField`] when the root or a section is not an object.
pub fn ensure_known_fields(document: &Value) -> ConfigResult<()> {
    let root = document.as_object().ok_or(ConfigError::InvalidField {
        section: "root",
        field: "document",
        value: None,
        reason: "must be an object",
    })?;

    for (section, body) in root {
        let Some((name, fields)) = SECTIONS.iter().find(|(name, _)| *name == section.as_str()) else {
            return Err(ConfigError::UnknownField {
                section: "root".to_string(),
                field: section.clone(),
            });
        };
        let body = body.as_object().ok_or(ConfigError::InvalidField {
            section: *name,
            field: "section",
            value: None,
            reason: "must be an object",
        })?;
        if let Some(field) = body
            .keys()
            .find(|key| !fields.iter().any(|known| *known == key.as_str()))
        {
            return Err(ConfigError::UnknownField {
                section: (*name).to_string(),
                field: field.clone(),
            });
        }
    }
    Ok(())
}

/// Validate every section of a decoded document.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the first offending field.
pub fn validate(config: &PeerlaneConfig) -> ConfigResult<()> {
    validate_chaining(&config.chaining)?;
    validate_telemetry(&config.telemetry)?;
    validate_events(config.events)
}

fn validate_chaining(policy: &ChainingPolicy) -> ConfigResult<()> {
    let suffix = &policy.descriptor_suffix;
    let invalid = |reason| ConfigError::InvalidField {
        section: "chaining",
        field: "descriptor_suffix",
        value: Some(suffix.clone()),
        reason,
    };
    if !suffix.starts_with('.') {
        return Err(invalid("must start with '.'"));
    }
    if suffix.len() < 2 {
        return Err(invalid("must name an extension"));
    }
    if suffix.contains(['/', '\\']) {
        return Err(invalid("must not contain path separators"));
    }
    Ok(())
}

fn validate_telemetry(settings: &TelemetrySettings) -> ConfigResult<()> {
    let level = settings.level.trim();
    if level.is_empty() || level.contains(char::is_whitespace) {
        return Err(ConfigError::InvalidField {
            section: "telemetry",
            field: "level",
            value: Some(settings.level.clone()),
            reason: "must be a single filter directive",
        });
    }
    Ok(())
}

fn validate_events(settings: EventSettings) -> ConfigResult<()> {
    if settings.replay_capacity == 0 || settings.replay_capacity > MAX_REPLAY_CAPACITY {
        return Err(ConfigError::InvalidField {
            section: "events",
            field: "replay_capacity",
            value: Some(settings.replay_capacity.to_string()),
            reason: "must be between 1 and 1048576",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_are_named() {
        let err = ensure_known_fields(&json!({"chaining": {"suffix": ".torrent"}}))
            .expect_err("unknown field");
        match err {
            ConfigError::UnknownField { section, field } => {
                assert_eq!(section, "chaining");
                assert_eq!(field, "suffix");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = ensure_known_fields(&json!({"metrics": {}})).expect_err("unknown section");
        assert!(matches!(err, ConfigError::UnknownField { ref field, .. } if field == "metrics"));

        assert!(ensure_known_fields(&json!({"events": {"replay_capacity": 8}})).is_ok());
        assert!(ensure_known_fields(&json!([])).is_err());
    }

    #[test]
    fn descriptor_suffix_rules() {
        for suffix in ["", "torrent", ".", "./x", ".a\\b"] {
            let mut config = PeerlaneConfig::default();
            config.chaining.descriptor_suffix = suffix.to_string();
            assert!(
                matches!(
                    validate(&config),
                    Err(ConfigError::InvalidField {
                        field: "descriptor_suffix",
                        ..
                    })
                ),
                "{suffix:?} should be rejected"
            );
        }
        assert!(validate(&PeerlaneConfig::default()).is_ok());
    }

    #[test]
    fn replay_capacity_bounds() {
        let mut config = PeerlaneConfig::default();
        config.events.replay_capacity = 0;
        assert!(validate(&config).is_err());
        config.events.replay_capacity = MAX_REPLAY_CAPACITY + 1;
        assert!(validate(&config).is_err());
        config.events.replay_capacity = MAX_REPLAY_CAPACITY;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn level_must_be_one_directive() {
        let mut config = PeerlaneConfig::default();
        config.telemetry.level = "info debug".into();
        assert!(validate(&config).is_err());
        config.telemetry.level = "peerlane_transfer_core=debug,info".into();
        assert!(validate(&config).is_ok());
    }
}
