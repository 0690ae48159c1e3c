//! Typed configuration models.
//!
//! # Design
//! - Every section defaults independently so partial documents are valid.
//! - Conversions hand runtime crates their native option types.

use peerlane_events::{DEFAULT_REPLAY_CAPACITY, EventBus};
use peerlane_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha};
use peerlane_transfer_core::{ChainingOptions, DEFAULT_DESCRIPTOR_SUFFIX};
use serde::{Deserialize, Serialize};

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PeerlaneConfig {
    /// Descriptor promotion policy.
    pub chaining: ChainingPolicy,
    /// Logging settings.
    pub telemetry: TelemetrySettings,
    /// Event bus sizing.
    pub events: EventSettings,
}

/// Descriptor promotion policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainingPolicy {
    /// Case-sensitive file-name suffix of saved descriptors.
    pub descriptor_suffix: String,
    /// Overwrite choice suggested to the conflict handler.
    pub default_overwrite: bool,
}

impl Default for ChainingPolicy {
    fn default() -> Self {
        Self {
            descriptor_suffix: DEFAULT_DESCRIPTOR_SUFFIX.to_string(),
            default_overwrite: false,
        }
    }
}

impl From<&ChainingPolicy> for ChainingOptions {
    fn from(policy: &ChainingPolicy) -> Self {
        Self {
            descriptor_suffix: policy.descriptor_suffix.clone(),
            default_overwrite: policy.default_overwrite,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySettings {
    /// Level directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format; inferred from the build profile when absent.
    pub format: Option<LogFormat>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: None,
        }
    }
}

impl TelemetrySettings {
    /// Logging configuration borrowing from these settings.
    #[must_use]
    pub fn logging_config(&self) -> LoggingConfig<'_> {
        LoggingConfig {
            level: &self.level,
            format: self.format.unwrap_or_else(LogFormat::infer),
            build_sha: build_sha(),
        }
    }
}

/// Event bus sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventSettings {
    /// Number of events retained for late subscribers.
    pub replay_capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            replay_capacity: DEFAULT_REPLAY_CAPACITY,
        }
    }
}

impl EventSettings {
    /// Event bus sized by these settings.
    #[must_use]
    pub fn event_bus(&self) -> EventBus {
        EventBus::with_capacity(self.replay_capacity)
    }
}

impl PeerlaneConfig {
    /// Chaining options for the transfer core.
    #[must_use]
    pub fn chaining_options(&self) -> ChainingOptions {
        ChainingOptions::from(&self.chaining)
    }
}
