//! Configuration management for autorule.
//!
//! Handles loading and saving configuration from TOML files.
//! Config files are stored in platform-specific locations:
//!
//! - **macOS/Linux**: `~/.config/autorule/config.toml`
//! - **Windows**: `%APPDATA%\autorule\config.toml`
//!
//! Secrets (API token, webhook token) never live in the file; they come from
//! the environment via [`Credentials::from_env`].
//!
//! # Example
//!
//! ```ignore
//! use autorule_core::config::{Config, Credentials};
//!
//! let config = Config::load()?.apply_env();
//! let connection = config.connection(Credentials::from_env())?;
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "autorule";

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const SITE_URL_VARS: &[&str] = &["JIRA_SITE_URL", "ATLASSIAN_SITE_URL"];
const EMAIL_VARS: &[&str] = &["JIRA_EMAIL", "ATLASSIAN_USER"];
const API_TOKEN_VARS: &[&str] = &["JIRA_API_TOKEN", "ATLASSIAN_TOKEN"];
const WEBHOOK_USER_VARS: &[&str] = &["JIRA_WEBHOOK_USER"];
const WEBHOOK_TOKEN_VARS: &[&str] = &["JIRA_WEBHOOK_TOKEN"];

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Jira site configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira: Option<JiraConfig>,

    /// Friendly alias → Jira field id (e.g. `release_version = "customfield_10709"`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_aliases: BTreeMap<String, String>,
}

/// Jira site configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Site URL (e.g. `https://yoursite.atlassian.net`)
    #[serde(default)]
    pub site_url: String,
    /// Account email used for API authentication
    #[serde(default)]
    pub email: String,
    /// Service-account email for outgoing webhook Basic auth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_user: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            email: String::new(),
            webhook_user: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Secrets supplied by the operating environment.
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub api_token: Option<String>,
    pub webhook_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field(
                "webhook_token",
                &self.webhook_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Credentials {
    /// Read tokens from `JIRA_API_TOKEN`/`ATLASSIAN_TOKEN` and `JIRA_WEBHOOK_TOKEN`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_token: first_non_empty(&lookup, API_TOKEN_VARS),
            webhook_token: first_non_empty(&lookup, WEBHOOK_TOKEN_VARS),
        }
    }
}

/// Everything needed to open a connection, fully resolved.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub site_url: String,
    pub email: String,
    pub api_token: String,
    pub webhook_user: Option<String>,
    pub webhook_token: Option<String>,
    pub timeout: Duration,
    pub field_aliases: BTreeMap<String, String>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("site_url", &self.site_url)
            .field("email", &self.email)
            .field("webhook_user", &self.webhook_user)
            .field("timeout", &self.timeout)
            .field("field_aliases", &self.field_aliases)
            .finish_non_exhaustive()
    }
}

fn first_non_empty(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Overlay `JIRA_*` / `ATLASSIAN_*` environment variables.
    pub fn apply_env(self) -> Self {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    pub fn apply_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let site_url = first_non_empty(&lookup, SITE_URL_VARS);
        let email = first_non_empty(&lookup, EMAIL_VARS);
        let webhook_user = first_non_empty(&lookup, WEBHOOK_USER_VARS);

        if site_url.is_none() && email.is_none() && webhook_user.is_none() {
            return self;
        }

        let jira = self.jira.get_or_insert_with(JiraConfig::default);
        if let Some(url) = site_url {
            jira.site_url = url;
        }
        if let Some(email) = email {
            jira.email = email;
        }
        if webhook_user.is_some() {
            jira.webhook_user = webhook_user;
        }
        self
    }

    /// Combine file settings and secrets into a connection configuration.
    pub fn connection(&self, credentials: Credentials) -> Result<ConnectionConfig> {
        let jira = self.jira.clone().unwrap_or_default();

        if jira.site_url.is_empty() {
            return Err(Error::Config(
                "jira.site_url must be set in config or JIRA_SITE_URL / ATLASSIAN_SITE_URL"
                    .to_string(),
            ));
        }
        if jira.email.is_empty() {
            return Err(Error::Config(
                "jira.email must be set in config or JIRA_EMAIL / ATLASSIAN_USER".to_string(),
            ));
        }
        let api_token = credentials.api_token.ok_or_else(|| {
            Error::Config("JIRA_API_TOKEN / ATLASSIAN_TOKEN must be set".to_string())
        })?;

        Ok(ConnectionConfig {
            site_url: jira.site_url.trim_end_matches('/').to_string(),
            email: jira.email,
            api_token,
            webhook_user: jira.webhook_user,
            webhook_token: credentials.webhook_token,
            timeout: Duration::from_secs(jira.timeout_secs),
            field_aliases: self.field_aliases.clone(),
        })
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `jira.<field>` or `aliases.<alias>`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = split_key(key)?;

        match section {
            "jira" => {
                let mut config = self.jira.clone().unwrap_or_default();
                match field {
                    "site_url" | "url" => config.site_url = value.to_string(),
                    "email" => config.email = value.to_string(),
                    "webhook_user" => config.webhook_user = Some(value.to_string()),
                    "timeout_secs" | "timeout" => {
                        config.timeout_secs = value.parse().map_err(|_| {
                            Error::Config(format!("Invalid timeout '{}': expected seconds", value))
                        })?
                    }
                    _ => {
                        return Err(Error::Config(format!(
                            "Unknown Jira config field: {}",
                            field
                        )))
                    }
                }
                self.jira = Some(config);
            }
            "aliases" | "field_aliases" => {
                self.field_aliases
                    .insert(field.to_string(), value.to_string());
            }
            _ => {
                return Err(Error::Config(format!("Unknown config section: {}", section)));
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `jira.<field>` or `aliases.<alias>`
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (section, field) = split_key(key)?;

        match section {
            "jira" => {
                let Some(config) = &self.jira else {
                    return Ok(None);
                };
                match field {
                    "site_url" | "url" => Ok(Some(config.site_url.clone())),
                    "email" => Ok(Some(config.email.clone())),
                    "webhook_user" => Ok(config.webhook_user.clone()),
                    "timeout_secs" | "timeout" => Ok(Some(config.timeout_secs.to_string())),
                    _ => Err(Error::Config(format!(
                        "Unknown Jira config field: {}",
                        field
                    ))),
                }
            }
            "aliases" | "field_aliases" => Ok(self.field_aliases.get(field).cloned()),
            _ => Err(Error::Config(format!("Unknown config section: {}", section))),
        }
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() != 2 || parts[1].is_empty() {
        return Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: section.field",
            key
        )));
    }
    Ok((parts[0], parts[1]))
}

// =============================================================================
// Tests
// =============================================================================
