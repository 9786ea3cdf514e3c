//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Environment variable holding the Mailchimp Transactional API key
pub const API_KEY_ENV: &str = "MAILCHIMP_API_KEY";

/// Environment variable overriding the verified sender address
pub const SENDER_EMAIL_ENV: &str = "SENDER_EMAIL_VERIFIED";

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "PLAYFORGE_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "playforge.toml";

/// Playforge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub results_per_page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub projects_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Only ever populated from the environment
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub sender_email: Option<String>,
    pub sender_name: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            results_per_page: 15,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            projects_dir: PathBuf::from("projects"),
            templates_dir: PathBuf::from("project_templates"),
            database_path: PathBuf::from("database.db"),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            sender_email: None,
            sender_name: "Game Platform".to_string(),
            base_url: "https://mandrillapp.com/api/1.0".to_string(),
            timeout_secs: 30,
        }
    }
}

impl StorageConfig {
    /// Storage rooted at a single directory (used by tests and `config init`)
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            projects_dir: root.join("projects"),
            templates_dir: root.join("project_templates"),
            database_path: root.join("database.db"),
        }
    }
}

impl MailConfig {
    /// Whether both the API key and the sender are available
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.sender_email.is_some()
    }

    pub fn redacted_api_key(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| {
            let chars: Vec<char> = key.chars().collect();
            if chars.len() <= 4 {
                "***".to_string()
            } else {
                let suffix: String = chars[chars.len() - 4..].iter().collect();
                format!("***{}", suffix)
            }
        })
    }

    /// Pull secrets and overrides from the environment
    fn apply_env(&mut self) {
        self.api_key = env::var(API_KEY_ENV).ok().filter(|v| !v.trim().is_empty());
        if let Some(sender) = env::var(SENDER_EMAIL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            self.sender_email = Some(sender);
        }
    }
}

impl Config {
    /// Get the per-user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("playforge").join("config.toml"))
    }

    /// Resolve which config file to read, if any
    ///
    /// Order: explicit path, `PLAYFORGE_CONFIG`, `./playforge.toml`, user config dir.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        Self::user_config_path().filter(|p| p.is_file())
    }

    /// Load configuration from file (or defaults) and apply environment overrides
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match Self::locate(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => Config::default(),
        };
        config.mail.apply_env();
        Ok(config)
    }

    /// Parse a config file without consulting the environment
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.mail.api_key.is_some() {
            return Err(Error::ConfigError(format!(
                "Mail API keys must be provided via the {} environment variable, not stored in configuration",
                API_KEY_ENV
            )));
        }
        if self.server.results_per_page == 0 {
            return Err(Error::ConfigError(
                "server.results_per_page must be at least 1".to_string(),
            ));
        }
        if self.mail.timeout_secs == 0 {
            return Err(Error::ConfigError(
                "mail.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "server.bind" => Ok(self.server.bind.clone()),
            "server.results_per_page" => Ok(self.server.results_per_page.to_string()),

            "storage.projects_dir" => Ok(self.storage.projects_dir.display().to_string()),
            "storage.templates_dir" => Ok(self.storage.templates_dir.display().to_string()),
            "storage.database_path" => Ok(self.storage.database_path.display().to_string()),

            "mail.sender_email" => Ok(self
                .mail
                .sender_email
                .clone()
                .unwrap_or_else(|| format!("(not set - use {} env var)", SENDER_EMAIL_ENV))),
            "mail.sender_name" => Ok(self.mail.sender_name.clone()),
            "mail.base_url" => Ok(self.mail.base_url.clone()),
            "mail.timeout_secs" => Ok(self.mail.timeout_secs.to_string()),

            // API key (special handling - show redacted)
            "mail.api_key" => Ok(self
                .mail
                .redacted_api_key()
                .unwrap_or_else(|| format!("(not set - use {} env var)", API_KEY_ENV))),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `playforge config show` to see available keys.",
                key
            )),
        }
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "server.bind",
            "server.results_per_page",
            "storage.projects_dir",
            "storage.templates_dir",
            "storage.database_path",
            "mail.api_key",
            "mail.sender_email",
            "mail.sender_name",
            "mail.base_url",
            "mail.timeout_secs",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.results_per_page, 15);
        assert_eq!(config.storage.projects_dir, PathBuf::from("projects"));
        assert_eq!(config.mail.base_url, "https://mandrillapp.com/api/1.0");
        assert!(!config.mail.is_configured());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [storage]
            projects_dir = "/srv/games"

            [mail]
            sender_email = "teacher@example.org"
            "#,
        )
        .expect("Failed to parse config");

        assert_eq!(config.storage.projects_dir, PathBuf::from("/srv/games"));
        assert_eq!(config.storage.templates_dir, PathBuf::from("project_templates"));
        assert_eq!(config.mail.sender_email.as_deref(), Some("teacher@example.org"));
        assert_eq!(config.server.bind, "127.0.0.1:5000");
    }

    #[test]
    fn test_api_key_in_file_is_rejected() {
        let result = Config::from_toml(
            r#"
            [mail]
            api_key = "secret"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let result = Config::from_toml("[server]\nresults_per_page = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_failures_are_config_errors() {
        let mut config = Config::default();
        config.mail.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert_eq!(err.code(), "E700");
        assert!(err.suggestion().is_some());

        let err = Config::from_toml("[mail]\napi_key = \"secret\"\n").unwrap_err();
        let cause = err.downcast_ref::<Error>().expect("config error in chain");
        assert!(matches!(cause, Error::ConfigError(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("playforge.toml");

        let mut config = Config::default();
        config.storage = StorageConfig::rooted_at(dir.path());
        config.server.results_per_page = 20;
        config.save(&path).expect("Failed to save config");

        let loaded = Config::from_file(&path).expect("Failed to reload config");
        assert_eq!(loaded.server.results_per_page, 20);
        assert_eq!(loaded.storage.projects_dir, dir.path().join("projects"));
    }

    #[test]
    fn test_redacted_api_key() {
        let mut mail = MailConfig::default();
        assert_eq!(mail.redacted_api_key(), None);
        mail.api_key = Some("md-abcdef1234".to_string());
        assert_eq!(mail.redacted_api_key().as_deref(), Some("***1234"));
        mail.api_key = Some("abc".to_string());
        assert_eq!(mail.redacted_api_key().as_deref(), Some("***"));
    }

    #[test]
    fn test_list_covers_all_keys() {
        let config = Config::default();
        let entries = config.list().expect("Failed to list config");
        assert_eq!(entries.len(), 10);
        assert!(entries.iter().any(|(k, _)| k == "mail.api_key"));
        assert!(config.get("nope").is_err());
    }
}
