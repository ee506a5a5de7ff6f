//! Configuration management for CRMX.
//!
//! Loads configuration from ${CRMX_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// This ensures new comments/sections from the template are always present,
/// while preserving user's customized values.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for CRMX configuration and data directories.
    //!
    //! CRMX_HOME resolution order:
    //! 1. CRMX_HOME environment variable (if set)
    //! 2. ~/.config/crmx (default)

    use std::path::PathBuf;

    /// Returns the CRMX home directory.
    ///
    /// Checks CRMX_HOME env var first, falls back to ~/.config/crmx
    pub fn crmx_home() -> PathBuf {
        if let Ok(home) = std::env::var("CRMX_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("crmx"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        crmx_home().join("config.toml")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Auth backend and CRM proxy base URLs.
    pub backend: BackendConfig,

    /// Bitrix24 direct REST access.
    pub bitrix: BitrixConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Saves only the Bitrix webhook URL to the config file.
    ///
    /// Creates the file if it doesn't exist.
    /// Preserves existing fields and comments using toml_edit.
    pub fn save_webhook_url(url: &str) -> Result<()> {
        Self::save_webhook_url_to(&paths::config_path(), url)
    }

    /// Saves only the Bitrix webhook URL to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    pub fn save_webhook_url_to(path: &Path, url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        url::Url::parse(url).with_context(|| format!("Invalid webhook URL: {url}"))?;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["bitrix"]["webhook_url"] = value(url.trim_end_matches('/'));

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

/// Base URLs for the two backend pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Auth backend (login, registration, profile, token refresh).
    pub auth_base_url: String,
    /// CRM backend proxy (contact listing).
    pub api_base_url: String,
}

impl BackendConfig {
    const DEFAULT_AUTH_BASE_URL: &str = "http://localhost:8000/api/auth";
    const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

    /// Token refresh endpoint, shared by both pipelines.
    pub fn refresh_url(&self) -> String {
        format!("{}/token/refresh/", self.auth_base_url.trim_end_matches('/'))
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            auth_base_url: Self::DEFAULT_AUTH_BASE_URL.to_string(),
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

/// Bitrix24 direct REST configuration.
///
/// The webhook URL embeds a long-lived credential; it is never shipped with
/// the binary and must be configured explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BitrixConfig {
    /// Inbound webhook base, e.g. `https://example.bitrix24.com/rest/1/<token>`.
    pub webhook_url: String,
    /// Stage a new unpaid deal lands in.
    pub waiting_stage_id: String,
    /// Stage a paid deal moves to.
    pub won_stage_id: String,
    /// Default responsible user for new deals and tasks.
    pub responsible_id: i64,
}

impl BitrixConfig {
    /// Returns the webhook URL if set and non-empty.
    pub fn effective_webhook_url(&self) -> Option<&str> {
        let url = self.webhook_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

impl Default for BitrixConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            waiting_stage_id: "UC_3MCI1C".to_string(),
            won_stage_id: "WON".to_string(),
            responsible_id: 1,
        }
    }
}
