use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_DATA_FILE: &str = "data.json";
const DEFAULT_MAX_LOGIN_ATTEMPTS: u32 = 3;

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Configuration for the session journal
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct JournalConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Directory for per-session `.jsonl` files
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Snapshot path
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    /// Save after every command that changes state
    #[serde(default)]
    pub autosave: Option<bool>,
    #[serde(default)]
    pub max_login_attempts: Option<u32>,
    #[serde(default)]
    pub journal: JournalConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.kedai/config.local.toml) > project (.kedai/config.toml) > user (~/.kedai/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".kedai").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".kedai").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Should be gitignored
        let local_config = Path::new(".kedai").join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Merge another config into this one; values set in `other` win
    pub fn merge(&mut self, other: Config) {
        if other.data_file.is_some() {
            self.data_file = other.data_file;
        }
        if other.autosave.is_some() {
            self.autosave = other.autosave;
        }
        if other.max_login_attempts.is_some() {
            self.max_login_attempts = other.max_login_attempts;
        }
        if other.journal.enabled.is_some() {
            self.journal.enabled = other.journal.enabled;
        }
        if other.journal.dir.is_some() {
            self.journal.dir = other.journal.dir;
        }
    }

    pub fn data_file(&self) -> PathBuf {
        self.data_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
    }

    pub fn autosave(&self) -> bool {
        self.autosave.unwrap_or(false)
    }

    pub fn max_login_attempts(&self) -> u32 {
        self.max_login_attempts
            .unwrap_or(DEFAULT_MAX_LOGIN_ATTEMPTS)
    }

    pub fn journal_enabled(&self) -> bool {
        self.journal.enabled.unwrap_or(true)
    }

    pub fn journal_dir(&self, root: &Path) -> PathBuf {
        self.journal
            .dir
            .clone()
            .unwrap_or_else(|| root.join(".kedai").join("journal"))
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(path) = &self.data_file {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: "data_file".to_string(),
                    message: "Must not be empty".to_string(),
                });
            } else if path.is_dir() {
                errors.push(ValidationError {
                    field: "data_file".to_string(),
                    message: format!("'{}' is a directory", path.display()),
                });
            }
        }

        if self.max_login_attempts == Some(0) {
            errors.push(ValidationError {
                field: "max_login_attempts".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if let Some(dir) = &self.journal.dir {
            if dir.is_file() {
                errors.push(ValidationError {
                    field: "journal.dir".to_string(),
                    message: format!("'{}' is a file", dir.display()),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.data_file(), PathBuf::from("data.json"));
        assert!(!config.autosave());
        assert_eq!(config.max_login_attempts(), 3);
        assert!(config.journal_enabled());
        assert_eq!(
            config.journal_dir(Path::new("/srv/cafe")),
            PathBuf::from("/srv/cafe/.kedai/journal")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
data_file = "shop.json"
autosave = true

[journal]
enabled = false
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.data_file(), PathBuf::from("shop.json"));
        assert!(config.autosave());
        assert!(!config.journal_enabled());
        assert_eq!(config.max_login_attempts, None);
    }

    #[test]
    fn test_load_from_bad_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "autosave = \"sometimes\"").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
    }

    #[test]
    fn test_merge_overrides_only_set_values() {
        let mut base = Config {
            data_file: Some(PathBuf::from("a.json")),
            autosave: Some(true),
            ..Default::default()
        };
        base.merge(Config {
            max_login_attempts: Some(5),
            ..Default::default()
        });
        assert_eq!(base.data_file(), PathBuf::from("a.json"));
        assert!(base.autosave());
        assert_eq!(base.max_login_attempts(), 5);

        base.merge(Config {
            autosave: Some(false),
            ..Default::default()
        });
        assert!(!base.autosave());
    }

    #[test]
    fn test_validate_zero_attempts() {
        let config = Config {
            max_login_attempts: Some(0),
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.contains("max_login_attempts"));
    }

    #[test]
    fn test_validate_data_file_is_dir() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            data_file: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("directory"));
    }
}
