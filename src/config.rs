// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::DEFAULT_SEARCH_LIMIT;

/// Value shipped in the sample config; never a real token.
pub const PLACEHOLDER_TOKEN: &str = "DAN_TOKEN_CUA_BAN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bot: BotConfig,
    pub catalog: CatalogConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub token: Option<String>,
    pub api_url: String,
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub image_base_url: Option<String>,
    pub search_limit: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ophim1.com".to_string(),
            image_base_url: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Config {
        if !path.as_ref().exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Could not load config file, using defaults: {:#}", e);
            Self::default()
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config to TOML")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("moviebot").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn ensure_config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("moviebot");

        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        Ok(dir)
    }

    /// Where the watch history lives when the config doesn't say.
    pub fn history_path(&self) -> PathBuf {
        if let Some(path) = &self.history.path {
            return path.clone();
        }
        dirs::data_dir()
            .map(|p| p.join("moviebot").join("watch_history.json"))
            .unwrap_or_else(|| PathBuf::from("watch_history.json"))
    }

    /// Bot token from `env_token` (usually `BOT_TOKEN`) or the config file.
    pub fn bot_token(&self, env_token: Option<String>) -> Result<String> {
        let token = env_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.bot.token.clone())
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            anyhow::bail!(
                "No bot token configured. Set BOT_TOKEN or [bot] token in {}",
                Self::default_path().display()
            );
        }

        Ok(token)
    }
}
