use serde::{Deserialize, Serialize};

/// Default maximum payload size in bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 262_144;

/// Configuration for the record validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Maximum payload size in bytes. `0` disables the size check.
    pub max_payload_bytes: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}
