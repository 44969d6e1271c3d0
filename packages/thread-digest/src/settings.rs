//! Persisted user settings.
//!
//! The store itself is an opaque key-value interface with no atomicity
//! across keys; [`Settings`] is the typed view the digest reads.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

use crate::error::{SettingsError, SettingsResult};
use crate::prompt::{effective_template, DEFAULT_PROMPT_TEMPLATE};
use crate::summarize::{resolve_model, KNOWN_MODELS};

pub const API_KEY_KEY: &str = "openaiApiKey";
pub const MODEL_KEY: &str = "openaiModel";
pub const PROMPT_TEMPLATE_KEY: &str = "openaiPromptTemplate";

/// Asynchronous key-value persistence.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Values for those of `keys` that are stored.
    async fn get(&self, keys: &[&str]) -> SettingsResult<HashMap<String, String>>;

    /// Store `values`, leaving other keys untouched.
    async fn set(&self, values: HashMap<String, String>) -> SettingsResult<()>;
}

/// Settings kept in a flat JSON object on disk.
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/thread-digest/settings.json`
    pub fn default_location() -> SettingsResult<Self> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(dir.join("thread-digest").join("settings.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    async fn read_all(&self) -> SettingsResult<Map<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) if data.trim().is_empty() => Ok(Map::new()),
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self, keys: &[&str]) -> SettingsResult<HashMap<String, String>> {
        let all = self.read_all().await?;
        Ok(keys
            .iter()
            .filter_map(|key| {
                all.get(*key)
                    .and_then(Value::as_str)
                    .map(|v| (key.to_string(), v.to_string()))
            })
            .collect())
    }

    async fn set(&self, values: HashMap<String, String>) -> SettingsResult<()> {
        let mut all = self.read_all().await?;
        for (key, value) in values {
            all.insert(key, Value::String(value));
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let data = serde_json::to_string_pretty(&all)?;
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, keys: &[&str]) -> SettingsResult<HashMap<String, String>> {
        let values = self.values.read().unwrap();
        Ok(keys
            .iter()
            .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, values: HashMap<String, String>) -> SettingsResult<()> {
        self.values.write().unwrap().extend(values);
        Ok(())
    }
}

fn stored<'a>(saved: &'a HashMap<String, String>, key: &str) -> &'a str {
    saved.get(key).map(String::as_str).unwrap_or_default()
}

/// Typed settings: API key, model, prompt template.
#[derive(Debug)]
pub struct Settings {
    api_key: SecretString,
    pub model: String,
    pub prompt_template: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new("", "", "")
    }
}

impl Settings {
    /// Build settings, normalizing blank model and template to defaults.
    pub fn new(api_key: &str, model: &str, prompt_template: &str) -> Self {
        Self {
            api_key: SecretString::from(api_key.trim().to_string()),
            model: resolve_model(model).to_string(),
            prompt_template: effective_template(prompt_template).to_string(),
        }
    }

    pub async fn load(store: &dyn SettingsStore) -> SettingsResult<Self> {
        let saved = store
            .get(&[API_KEY_KEY, MODEL_KEY, PROMPT_TEMPLATE_KEY])
            .await?;

        Ok(Self::new(
            stored(&saved, API_KEY_KEY),
            stored(&saved, MODEL_KEY),
            stored(&saved, PROMPT_TEMPLATE_KEY),
        ))
    }

    pub async fn save(&self, store: &dyn SettingsStore) -> SettingsResult<()> {
        store
            .set(HashMap::from([
                (API_KEY_KEY.to_string(), self.api_key().to_string()),
                (MODEL_KEY.to_string(), self.model.clone()),
                (PROMPT_TEMPLATE_KEY.to_string(), self.prompt_template.clone()),
            ]))
            .await
    }

    /// The API key. Only expose when building a request.
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn set_api_key(&mut self, api_key: &str) {
        self.api_key = SecretString::from(api_key.trim().to_string());
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key().is_empty()
    }

    /// Use `fallback` when no key is stored.
    pub fn with_fallback_api_key(mut self, fallback: Option<&str>) -> Self {
        if let Some(key) = fallback.filter(|_| !self.has_api_key()) {
            self.set_api_key(key);
        }
        self
    }

    pub fn set_model(&mut self, model: &str) {
        self.model = resolve_model(model).to_string();
    }

    pub fn set_prompt_template(&mut self, template: &str) {
        self.prompt_template = effective_template(template).to_string();
    }

    pub fn is_custom_model(&self) -> bool {
        !KNOWN_MODELS.contains(&self.model.as_str())
    }

    pub fn uses_default_template(&self) -> bool {
        self.prompt_template == DEFAULT_PROMPT_TEMPLATE
    }

    /// Key with all but the last four chars masked. Keys of four chars or
    /// fewer are masked entirely.
    pub fn redacted_api_key(&self) -> String {
        let key = self.api_key();
        let count = key.chars().count();
        if count == 0 {
            return "(not set)".to_string();
        }
        if count <= 4 {
            return "****".to_string();
        }
        let tail: String = key.chars().skip(count.saturating_sub(4)).collect();
        format!("{}{}", "*".repeat(count.saturating_sub(4).min(8)), tail)
    }
}
