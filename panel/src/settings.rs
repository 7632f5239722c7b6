//! Persisted user settings.
//!
//! The document keeps the flat `app` key space the task pipeline also reads
//! (`openai_api_key`, `pexels_api_keys`, ...) plus a `ui` preference block.
//! Callers go through the typed accessors below rather than raw keys.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};
use thiserror::Error;
use tracing::debug;

use crate::{
    provider::{LlmProvider, ProviderCredentials, ProviderKind},
    types::VideoSource,
};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings document: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiPreferences {
    pub voice_name: String,
    pub font_name: String,
    pub text_fore_color: String,
    pub font_size: u32,
    pub language: String,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            voice_name: String::new(),
            font_name: "MicrosoftYaHeiBold.ttc".into(),
            text_fore_color: "#FFFFFF".into(),
            font_size: 60,
            language: "en-US".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: BTreeMap<String, String>,
    pub ui: UiPreferences,
}

/// Credential edits from the form. `None` and empty strings leave stored values alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsUpdate {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model_name: Option<String>,
    pub account_id: Option<String>,
    pub secret_key: Option<String>,
}

impl Settings {
    pub async fn load(path: &Path) -> Result<Self, SettingsError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    fn get(&self, key: &str) -> &str {
        self.app.get(key).map(String::as_str).unwrap_or("")
    }

    fn set_if_present(&mut self, key: String, value: Option<String>) {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.app.insert(key, v);
        }
    }

    /// Unknown or missing provider names fall back to OpenAI.
    pub fn provider_kind(&self) -> ProviderKind {
        self.get("llm_provider").parse().unwrap_or_default()
    }

    pub fn set_provider_kind(&mut self, kind: ProviderKind) {
        self.app.insert("llm_provider".into(), kind.key().into());
    }

    pub fn credentials(&self, kind: ProviderKind) -> ProviderCredentials {
        let p = kind.key();
        ProviderCredentials {
            api_key: self.get(&format!("{p}_api_key")).to_string(),
            base_url: self.get(&format!("{p}_base_url")).to_string(),
            model_name: self.get(&format!("{p}_model_name")).to_string(),
            account_id: self.get(&format!("{p}_account_id")).to_string(),
            secret_key: self.get(&format!("{p}_secret_key")).to_string(),
        }
    }

    pub fn update_credentials(&mut self, kind: ProviderKind, edit: CredentialsUpdate) {
        let p = kind.key();
        self.set_if_present(format!("{p}_api_key"), edit.api_key);
        self.set_if_present(format!("{p}_base_url"), edit.base_url);
        if kind.has_model_name() {
            self.set_if_present(format!("{p}_model_name"), edit.model_name);
        }
        if kind == ProviderKind::Cloudflare {
            self.set_if_present(format!("{p}_account_id"), edit.account_id);
        }
        // The ERNIE secret is written even when blank.
        if kind == ProviderKind::Ernie {
            if let Some(secret) = edit.secret_key {
                self.app.insert(format!("{p}_secret_key"), secret);
            }
        }
    }

    /// The currently selected provider, resolved with its defaults.
    pub fn llm_provider(&self) -> LlmProvider {
        let kind = self.provider_kind();
        LlmProvider::resolve(kind, &self.credentials(kind))
    }

    /// Stored key of the selected provider, as typed. Unlike `LlmProvider::api_key`
    /// this keeps whatever a key-less provider such as G4f was given.
    pub fn provider_api_key(&self) -> String {
        self.credentials(self.provider_kind()).api_key
    }

    pub fn stock_api_keys(&self, source: VideoSource) -> Vec<String> {
        source
            .keys_setting()
            .map(|k| self.get(k).split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
            .unwrap_or_default()
    }

    /// Stores a comma-joined key list. Spaces are stripped; blank input keeps the old value.
    pub fn set_stock_api_keys(&mut self, source: VideoSource, raw: &str) {
        let Some(key) = source.keys_setting() else { return };
        let value: String = raw.chars().filter(|c| *c != ' ').collect();
        self.set_if_present(key.to_string(), Some(value));
    }

    pub fn hide_log(&self) -> bool {
        self.get("hide_log") == "true"
    }

    pub fn set_hide_log(&mut self, hide: bool) {
        self.app.insert("hide_log".into(), hide.to_string());
    }

    /// Copy safe to return to clients: secret-bearing values are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for (key, value) in copy.app.iter_mut() {
            let secret = key.ends_with("_api_key") || key.ends_with("_secret_key") || key.ends_with("_api_keys");
            if secret && !value.is_empty() {
                *value = mask(value);
            }
        }
        copy
    }
}

fn mask(value: &str) -> String {
    let tail: String = value.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    if value.chars().count() <= 8 { "********".into() } else { format!("********{tail}") }
}

/// Body of `PUT /settings`; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub llm_provider: Option<String>,
    pub credentials: Option<CredentialsUpdate>,
    pub pexels_api_keys: Option<String>,
    pub pixabay_api_keys: Option<String>,
    pub hide_log: Option<bool>,
    pub voice_name: Option<String>,
    pub font_name: Option<String>,
    pub text_fore_color: Option<String>,
    pub font_size: Option<u32>,
    pub language: Option<String>,
}

impl Settings {
    /// Applies a form edit. The provider switch happens before credentials so
    /// the credentials land on the newly selected provider.
    pub fn apply(&mut self, update: SettingsUpdate) -> Result<(), crate::provider::UnknownProvider> {
        if let Some(name) = update.llm_provider {
            self.set_provider_kind(name.parse()?);
        }
        if let Some(creds) = update.credentials {
            let kind = self.provider_kind();
            self.update_credentials(kind, creds);
        }
        if let Some(raw) = update.pexels_api_keys { self.set_stock_api_keys(VideoSource::Pexels, &raw); }
        if let Some(raw) = update.pixabay_api_keys { self.set_stock_api_keys(VideoSource::Pixabay, &raw); }
        if let Some(hide) = update.hide_log { self.set_hide_log(hide); }
        if let Some(v) = update.voice_name { self.ui.voice_name = v; }
        if let Some(v) = update.font_name { self.ui.font_name = v; }
        if let Some(v) = update.text_fore_color { self.ui.text_fore_color = v; }
        if let Some(v) = update.font_size { self.ui.font_size = v; }
        if let Some(v) = update.language { self.ui.language = v; }
        Ok(())
    }
}
