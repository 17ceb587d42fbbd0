//! Configuration types for the OneBot adapter.
//!
//! This section is read from the `onebot` key of the global configuration
//! file.
//!
//! # Example Configuration
//!
//! ```yaml
//! onebot:
//!   # HTTP API endpoints, keyed by bot self_id
//!   api_root:
//!     "10001": http://127.0.0.1:5700
//!   access_token: secret
//!   api_timeout_secs: 30
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// OneBot adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OneBotConfig {
    /// HTTP API roots by bot id. Only used by bots connected over HTTP.
    pub api_root: HashMap<String, String>,

    /// Bearer token sent with HTTP API calls.
    pub access_token: Option<String>,

    /// How long an API call may take, in seconds.
    pub api_timeout_secs: u64,
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            api_root: HashMap::new(),
            access_token: None,
            api_timeout_secs: 30,
        }
    }
}

impl OneBotConfig {
    /// Returns the API timeout as a [`Duration`].
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Returns the configured API root for a bot, if any.
    pub fn api_root_for(&self, self_id: &str) -> Option<&str> {
        self.api_root
            .get(self_id)
            .map(String::as_str)
            .filter(|root| !root.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
api_root:
  "10001": http://127.0.0.1:5700
  "10002": ""
access_token: secret
api_timeout_secs: 5
"#;

        let config: OneBotConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api_root_for("10001"), Some("http://127.0.0.1:5700"));
        assert_eq!(config.api_root_for("10002"), None);
        assert_eq!(config.api_root_for("10003"), None);
        assert_eq!(config.access_token.as_deref(), Some("secret"));
        assert_eq!(config.api_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_defaults() {
        let config: OneBotConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.api_root.is_empty());
        assert!(config.access_token.is_none());
        assert_eq!(config.api_timeout_secs, 30);
    }
}
