use crate::selection::RangeDays;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const ENV_SERVER: &str = "PACEBOARD_SERVER";
pub const ENV_LOG: &str = "PACEBOARD_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub default_range: u32,
    pub seed_demo: bool,
    pub charts: bool,
    pub toast_seconds: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_url: "http://127.0.0.1:8010".to_string(),
            default_range: RangeDays::default().days(),
            seed_demo: true,
            charts: true,
            toast_seconds: 4,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Fully resolved configuration for this run.
    pub fn load(server_flag: Option<&str>) -> Result<Config> {
        let mut config = match config_path() {
            Some(path) => Config::from_file(&path)?,
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        if let Some(server) = server_flag {
            config.server_url = server.to_string();
        }
        Ok(config)
    }

    /// Defaults when the file does not exist; a file that exists but does not
    /// parse is an error.
    pub fn from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(&data).with_context(|| format!("parsing config {:?}", path))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(server) = lookup(ENV_SERVER).filter(|v| !v.trim().is_empty()) {
            self.server_url = server.trim().to_string();
        }
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
    }

    /// The configured range, or 30 days when it is not one of the offered
    /// ranges.
    pub fn range(&self) -> RangeDays {
        RangeDays::from_days(self.default_range).unwrap_or_else(|| {
            warn!(
                default_range = self.default_range,
                "unsupported default range, using 30 days"
            );
            RangeDays::default()
        })
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "paceboard")
}

pub fn config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("paceboard-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("paceboard-definitely-missing.yml");
        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_file("partial.yml", "server_url: http://habits.local:9000\ncharts: false\n");
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server_url, "http://habits.local:9000");
        assert!(!config.charts);
        assert!(config.seed_demo);
        assert_eq!(config.default_range, 30);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = temp_file("broken.yml", "default_range: [not a number\n");
        let err = Config::from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing config"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> =
            [(ENV_SERVER, " http://env:1 "), (ENV_LOG, "debug")].into_iter().collect();
        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.server_url, "http://env:1");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn unsupported_range_falls_back_to_thirty_days() {
        let config = Config {
            default_range: 45,
            ..Config::default()
        };
        assert_eq!(config.range(), RangeDays::Month);
        let config = Config {
            default_range: 90,
            ..Config::default()
        };
        assert_eq!(config.range(), RangeDays::Quarter);
    }
}
