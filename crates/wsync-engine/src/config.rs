use serde::{Deserialize, Serialize};
use wsync_gate::{ValidatorConfig, DEFAULT_MAX_PAYLOAD_BYTES};

use crate::error::{EngineError, EngineResult};

/// Configuration for the sync engine.
///
/// Every field has a default, so a TOML file only needs the keys it
/// overrides:
///
/// ```toml
/// max_payload_bytes = 65536
/// default_limit = 100
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum payload size in bytes. `0` disables the size check.
    pub max_payload_bytes: usize,
    /// Result limit applied when a query does not set one.
    pub default_limit: usize,
    /// Cap each filter's key set at the query limit before intersecting.
    ///
    /// Off by default: filters are unbounded and the limit applies to the
    /// intersected, sorted result. Turning this on reproduces the legacy
    /// behavior where a filter can silently drop matches before intersection.
    pub cap_filters_before_intersection: bool,
    /// How many times a collection delete is attempted on transient
    /// store failures.
    pub delete_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            default_limit: 1000,
            cap_filters_before_intersection: false,
            delete_attempts: 3,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML text.
    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> EngineResult<()> {
        if self.default_limit == 0 {
            return Err(EngineError::Config("default_limit must be at least 1".into()));
        }
        if self.delete_attempts == 0 {
            return Err(EngineError::Config("delete_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// The subset of settings the record validator needs.
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            max_payload_bytes: self.max_payload_bytes,
        }
    }
}
