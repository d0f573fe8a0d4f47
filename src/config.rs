use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::ScriptVisionError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "open_api_key")]
    #[serde(default)]
    pub openai_key: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default = "default_storage_namespace")]
    pub storage_namespace: String,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: u32,
}

fn default_text_model() -> String {
    "gpt-4.1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    600
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("projects")
}

fn default_storage_namespace() -> String {
    "scriptvision-v1".to_string()
}

fn default_max_suggestions() -> u32 {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_key: String::new(),
            text_model: default_text_model(),
            request_timeout_secs: default_request_timeout_secs(),
            storage_dir: default_storage_dir(),
            storage_namespace: default_storage_namespace(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;

        if config.storage_namespace.trim().is_empty() {
            anyhow::bail!("config.json: storage_namespace must not be empty");
        }
        if config.max_suggestions == 0 {
            anyhow::bail!("config.json: max_suggestions must be at least 1");
        }

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if fs::metadata(&path).await.is_ok() {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Only commands that call the provider need a key.
    pub fn require_openai_key(&self) -> std::result::Result<(), ScriptVisionError> {
        if self.openai_key.trim().is_empty() {
            return Err(ScriptVisionError::Config(
                "open_api_key missing".to_string(),
            ));
        }
        Ok(())
    }
}
