//! Configuration and data-directory discovery.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// `WITNESSD_DATA_DIR` overrides the base data directory; if unset, the
/// platform-specific data path is used.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("WITNESSD_DATA_DIR") {
        return PathBuf::from(dir);
    }
    ProjectDirs::from("io", "witnessd", "witnessd")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".witnessd"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub data_dir: Option<PathBuf>,
    pub commit_interval_secs: u64,
    pub monotonic_threshold: f32,
    /// Whether to preserve the pre-`context`/`forensics` behavior of the
    /// older of the two legacy entrypoints this core replaces.
    pub legacy_compat: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            commit_interval_secs: 30,
            monotonic_threshold: 0.95,
            legacy_compat: false,
        }
    }
}

impl EngineConfig {
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(data_dir)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_commit_interval_is_thirty_seconds() {
        assert_eq!(EngineConfig::default().commit_interval_secs, 30);
    }

    #[test]
    fn env_var_overrides_data_dir() {
        std::env::set_var("WITNESSD_DATA_DIR", "/tmp/witnessd-test-dir");
        assert_eq!(data_dir(), PathBuf::from("/tmp/witnessd-test-dir"));
        std::env::remove_var("WITNESSD_DATA_DIR");
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg = EngineConfig::from_toml("commit_interval_secs = 60\n").unwrap();
        assert_eq!(cfg.commit_interval_secs, 60);
        assert_eq!(cfg.monotonic_threshold, 0.95);
    }
}
