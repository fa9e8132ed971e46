use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostoConfig {
    /// Directory holding the store namespace
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Store namespace (a subdirectory of `data_dir`)
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_namespace() -> String {
    "gas_stations_prefs".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PostoConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            namespace: default_namespace(),
            log_dir: default_log_dir(),
            log_level: default_log_level(),
        }
    }
}

impl PostoConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PostoConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PostoConfig = toml::from_str("log_level = \"debug\"").unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.namespace, "gas_stations_prefs");
        assert_eq!(config.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = PostoConfig::load_or_default(temp_dir.path().join("posto.toml")).unwrap();
        assert_eq!(config, PostoConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("posto.toml");
        std::fs::write(
            &path,
            "data_dir = \"/var/lib/posto\"\nnamespace = \"prefs\"\n",
        )
        .unwrap();

        let config = PostoConfig::load_or_default(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/posto"));
        assert_eq!(config.namespace, "prefs");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("posto.toml");
        std::fs::write(&path, "log_level = [").unwrap();

        assert!(PostoConfig::load_or_default(&path).is_err());
    }
}
