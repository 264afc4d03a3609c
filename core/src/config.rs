//! Runner configuration.
//!
//! Only operational settings live here. The engine's cost constants are
//! fixed in `engine` and are not configurable.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// SQLite file for saved scenarios. `:memory:` keeps nothing.
    pub database_path: String,
    /// Directory that generated reports are written into.
    pub output_dir: String,
    /// Upper bound on a single report render.
    pub render_timeout_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            database_path: "roi.db".into(),
            output_dir: ".".into(),
            render_timeout_ms: 10_000,
        }
    }
}

impl RunnerConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        let config: RunnerConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: RunnerConfig = serde_json::from_str(r#"{"output_dir": "reports"}"#).unwrap();
        assert_eq!(config.output_dir, "reports");
        assert_eq!(config.database_path, "roi.db");
        assert_eq!(config.render_timeout(), Duration::from_secs(10));
    }
}
