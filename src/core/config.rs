use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub disable_images: bool,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prefix for relative page URLs.
    pub base_url: Option<String>,
    pub wait_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

impl SessionConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            disable_images: false,
            args: vec![],
            timeout_ms: 30000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            wait_timeout_ms: 5000,
            poll_interval_ms: 100,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.browser.headless);
        assert_eq!(config.session.wait_timeout(), Duration::from_secs(5));
        assert_eq!(config.session.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json_str(
            r#"{ "session": { "base_url": "http://localhost:8080", "wait_timeout_ms": 250 } }"#,
        )
        .unwrap();
        assert_eq!(
            config.session.base_url.as_deref(),
            Some("http://localhost:8080")
        );
        assert_eq!(config.session.wait_timeout_ms, 250);
        assert_eq!(config.session.poll_interval_ms, 100);
        assert_eq!(config.browser.viewport.width, 1280);
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let session = SessionConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(session.poll_interval(), Duration::from_millis(1));
    }
}
