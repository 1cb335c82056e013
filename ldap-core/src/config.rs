//! Decoder configuration

use serde::{Deserialize, Serialize};

/// Default upper bound for one encoded PDU (2 MiB)
pub const DEFAULT_MAX_PDU_SIZE: usize = 2 * 1024 * 1024;

/// Default nesting limit for search filters
pub const DEFAULT_MAX_FILTER_DEPTH: usize = 64;

/// Decoder configuration
///
/// Shared by every connection; each connection's decoder keeps its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Largest accepted envelope length in bytes
    pub max_pdu_size: usize,
    /// Largest accepted search filter nesting depth
    pub max_filter_depth: usize,
    /// Whether DN fields of requests are checked against the string syntax
    pub validate_dn: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_pdu_size: DEFAULT_MAX_PDU_SIZE,
            max_filter_depth: DEFAULT_MAX_FILTER_DEPTH,
            validate_dn: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_partial_deserialize() {
        let config: DecoderConfig = serde_json::from_str(r#"{"max_pdu_size": 1024}"#).unwrap();
        assert_eq!(config.max_pdu_size, 1024);
        assert_eq!(config.max_filter_depth, DEFAULT_MAX_FILTER_DEPTH);
        assert!(config.validate_dn);
    }
}
