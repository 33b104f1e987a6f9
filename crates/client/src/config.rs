use serde::{Deserialize, Serialize};

use crate::error::ClientError;

const fn default_num_levels() -> usize {
    140
}

fn default_id_prefix() -> String {
    "id".to_string()
}

/// Configuration for talking to a relay deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the relay service hosting the identity trees.
    relay_url: String,
    /// Depth of the relay's sparse Merkle trees. Current deployments use
    /// 140 levels.
    #[serde(default = "default_num_levels")]
    num_levels: usize,
    /// Prefix for keys written to the injected store.
    #[serde(default = "default_id_prefix")]
    id_prefix: String,
}

impl Config {
    /// Instantiates a configuration for the relay at `relay_url` with
    /// protocol defaults.
    #[must_use]
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            num_levels: default_num_levels(),
            id_prefix: default_id_prefix(),
        }
    }

    /// Overrides the tree depth used when verifying relay proofs.
    #[must_use]
    pub const fn with_num_levels(mut self, num_levels: usize) -> Self {
        self.num_levels = num_levels;
        self
    }

    /// Overrides the store key prefix.
    #[must_use]
    pub fn with_id_prefix(mut self, id_prefix: impl Into<String>) -> Self {
        self.id_prefix = id_prefix.into();
        self
    }

    /// Loads a configuration from JSON.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if the JSON is not valid.
    pub fn from_json(json_str: &str) -> Result<Self, ClientError> {
        serde_json::from_str(json_str)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {e}")))
    }

    /// Base URL of the relay service, without a trailing slash.
    #[must_use]
    pub fn relay_url(&self) -> &str {
        self.relay_url.trim_end_matches('/')
    }

    /// Depth of the relay's sparse Merkle trees.
    #[must_use]
    pub const fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Prefix for keys written to the injected store.
    #[must_use]
    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("http://127.0.0.1:8000/");
        assert_eq!(config.relay_url(), "http://127.0.0.1:8000");
        assert_eq!(config.num_levels(), 140);
        assert_eq!(config.id_prefix(), "id");
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let config = Config::from_json(r#"{"relay_url":"http://relay.example"}"#).unwrap();
        assert_eq!(config.num_levels(), 140);
        assert_eq!(config.id_prefix(), "id");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Config::from_json("not json").is_err());
        assert!(Config::from_json("{}").is_err());
    }

    #[test]
    fn test_builder_overrides_and_roundtrip() {
        let config = Config::new("http://relay.example")
            .with_num_levels(64)
            .with_id_prefix("test");
        let json = serde_json::to_string(&config).unwrap();
        let back = Config::from_json(&json).unwrap();
        assert_eq!(back.num_levels(), 64);
        assert_eq!(back.id_prefix(), "test");
    }
}
