use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::{
    dates::DateOrder,
    notion::{ClientConfig, DEFAULT_API_BASE_URL, DEFAULT_NOTION_VERSION},
};

pub const TOKEN_ENV: &str = "CAPTUREBAR_TOKEN";
pub const DATA_DIR_ENV: &str = "CAPTUREBAR_DATA_DIR";
pub const DEBUG_ENV: &str = "CAPTUREBAR_DEBUG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    pub api_base_url: String,
    pub notion_version: String,
    pub request_timeout_secs: u64,
    /// How `03/04` style dates are read.
    pub date_order: DateOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            notion_version: DEFAULT_NOTION_VERSION.into(),
            request_timeout_secs: 15,
            date_order: DateOrder::default(),
            access_token: None,
        }
    }
}

impl CaptureSettings {
    /// Client configuration, with `CAPTUREBAR_TOKEN` taking precedence over
    /// the stored token.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let access_token = env::var(TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .or_else(|| self.access_token.clone())
            .ok_or_else(|| {
                anyhow!("no Notion access token; set {TOKEN_ENV} or accessToken in settings.json")
            })?;

        Ok(ClientConfig {
            base_url: self.api_base_url.clone(),
            notion_version: self.notion_version.clone(),
            access_token,
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        })
    }
}

/// Directory holding the template store and settings file.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("capturebar"))
        .context("could not determine the user data directory")
}

pub fn debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<CaptureSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`. A missing or unreadable file yields defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            CaptureSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> CaptureSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, settings: CaptureSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &CaptureSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
