//! Request DTOs for the sidecar API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::SetOptions;

/// Request body for a direct write (PUT /cache/*key)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRequest {
    /// JSON document to store
    pub value: Value,
    /// Version of `value`; must be newer than the stored one
    #[serde(default)]
    pub version: Option<u64>,
    /// TTL override in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.ttl_ms == Some(0) {
            return Some("ttlMs must be greater than zero".to_string());
        }
        if self.version == Some(0) {
            return Some("version must be greater than zero".to_string());
        }
        None
    }

    pub fn options(&self) -> SetOptions {
        SetOptions {
            version: self.version,
            ttl: self.ttl_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_request_deserialize() {
        let req: SetRequest = serde_json::from_str(r#"{"value": {"a": 1}}"#).unwrap();
        assert_eq!(req.value, serde_json::json!({"a": 1}));
        assert!(req.version.is_none());
        assert!(req.ttl_ms.is_none());
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_set_request_options() {
        let req: SetRequest =
            serde_json::from_str(r#"{"value": "x", "version": 4, "ttlMs": 1500}"#).unwrap();
        let options = req.options();
        assert_eq!(options.version, Some(4));
        assert_eq!(options.ttl, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let req: SetRequest = serde_json::from_str(r#"{"value": 1, "ttlMs": 0}"#).unwrap();
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_missing_value_fails() {
        assert!(serde_json::from_str::<SetRequest>(r#"{"version": 1}"#).is_err());
    }
}
