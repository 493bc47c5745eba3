//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with LOUNGE_, nested keys split by `__`)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! Secrets like the database password and the cookie signing key should be
//! kept in environment variables, not in the config file.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    /// Address the HTTP server binds to
    pub bind: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Lounge".to_string(),
            base_url: "http://localhost:8080".to_string(),
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL. Overridden by DATABASE_URL when that is set.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://lounge.db?mode=rwc".to_string(),
        }
    }
}

/// Registration rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Every account email must contain this domain
    pub email_domain: String,
    /// Minimum age in years on the day of registration
    pub minimum_age: i32,
    /// Module credits a student must be enrolled on
    pub required_credits: i32,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            email_domain: "@exeter.ac.uk".to_string(),
            minimum_age: 18,
            required_credits: 120,
        }
    }
}

/// Leaderboard display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Maximum number of ranked entries
    pub size: usize,
    /// Picture shown for anyone not displaying their full name
    pub default_picture: String,
    /// Name shown for your own entry while your profile is hidden
    pub hidden_placeholder: String,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            size: 15,
            default_picture: crate::user::DEFAULT_PROFILE_PIC.to_string(),
            hidden_placeholder: "Anonymous".to_string(),
        }
    }
}

/// Live chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// The single public room everybody joins
    pub room_id: u32,
    /// Hosts treated as our own; links elsewhere open in a new tab
    pub local_domains: Vec<String>,
    /// Words censored before a message is relayed
    pub censor_words: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            room_id: 1,
            local_domains: vec!["localhost".to_string()],
            censor_words: crate::word_filter::DEFAULT_CENSOR_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub database: DatabaseConfig,
    pub registration: RegistrationConfig,
    pub leaderboard: LeaderboardConfig,
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // e.g. LOUNGE_SITE__BIND, LOUNGE_REGISTRATION__REQUIRED_CREDITS
            .add_source(
                Environment::with_prefix("LOUNGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

/// Initialize application configuration
///
/// Triggers the lazy load of the config file and logs the result.
pub fn init() {
    let config = get_config();
    log::info!("Configuration loaded: site.name = {}", config.site.name);
}

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

pub fn site() -> SiteConfig {
    get_config().site
}

pub fn database() -> DatabaseConfig {
    get_config().database
}

pub fn registration() -> RegistrationConfig {
    get_config().registration
}

pub fn leaderboard() -> LeaderboardConfig {
    get_config().leaderboard
}

pub fn chat() -> ChatConfig {
    get_config().chat
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.site.name, "Lounge");
        assert_eq!(config.registration.email_domain, "@exeter.ac.uk");
        assert_eq!(config.registration.minimum_age, 18);
        assert_eq!(config.registration.required_credits, 120);
        assert_eq!(config.leaderboard.size, 15);
        assert_eq!(config.chat.room_id, 1);
    }

    #[test]
    fn test_default_censor_list_is_not_empty() {
        let config = AppConfig::default();
        assert!(!config.chat.censor_words.is_empty());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[site]
name = "Exe Lounge"
bind = "127.0.0.1:9000"

[registration]
email_domain = "@example.ac.uk"
required_credits = 60

[chat]
local_domains = ["lounge.example.ac.uk"]
censor_words = ["heck"]
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(temp_file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.site.name, "Exe Lounge");
        assert_eq!(config.site.bind, "127.0.0.1:9000");
        assert_eq!(config.registration.email_domain, "@example.ac.uk");
        assert_eq!(config.registration.required_credits, 60);
        assert_eq!(config.chat.local_domains, vec!["lounge.example.ac.uk"]);
        assert_eq!(config.chat.censor_words[0], "heck");
        // Defaults should still apply for unspecified values
        assert_eq!(config.registration.minimum_age, 18);
        assert_eq!(config.leaderboard.size, 15);
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config = AppConfig::load_from_path("/nonexistent/config.toml").unwrap();
        assert_eq!(config.site.name, "Lounge");
        assert_eq!(config.leaderboard.hidden_placeholder, "Anonymous");
    }
}
