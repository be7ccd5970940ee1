// Runtime configuration resolved from the process environment

use std::collections::HashMap;
use std::fmt;

use super::error::ProxyError;

pub const DEFAULT_CHAT_MODEL: &str = "openai/gpt-4.1-mini";
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-2.5-flash-image-preview";

/// Candidate keys per setting, in lookup order. The server-side name comes
/// first, the bundler-injected `VITE_` name second.
pub const API_KEY_KEYS: &[&str] = &["OPENROUTER_API_KEY", "VITE_OPENROUTER_API_KEY"];
pub const CHAT_MODEL_KEYS: &[&str] = &["OPENROUTER_CHAT_MODEL", "VITE_OPENROUTER_CHAT_MODEL"];
pub const IMAGE_MODEL_KEYS: &[&str] = &["OPENROUTER_IMAGE_MODEL", "VITE_OPENROUTER_IMAGE_MODEL"];
pub const REFERER_KEYS: &[&str] = &["OPENROUTER_REFERER", "VITE_OPENROUTER_REFERER"];
pub const APP_NAME_KEYS: &[&str] = &["OPENROUTER_APP_NAME", "VITE_OPENROUTER_APP_NAME"];

/// Flat string-keyed configuration lookup.
pub trait EnvSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// First candidate with a non-empty value.
    fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.get(key))
            .find(|value| !value.is_empty())
    }
}

/// Read-only snapshot of environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvMap {
    vars: HashMap<String, String>,
}

impl EnvMap {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for EnvMap {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

#[derive(Clone, PartialEq)]
pub struct RuntimeConfig {
    pub api_key: String,
    pub chat_model: String,
    pub image_model: String,
    pub app_name: Option<String>,
    pub referer: Option<String>,
}

impl RuntimeConfig {
    pub fn resolve(env: &dyn EnvSource) -> Result<Self, ProxyError> {
        let api_key = env.first_of(API_KEY_KEYS).ok_or_else(|| {
            ProxyError::Configuration(format!("Server is missing {}", API_KEY_KEYS[0]))
        })?;

        Ok(Self {
            api_key,
            chat_model: env
                .first_of(CHAT_MODEL_KEYS)
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            image_model: env
                .first_of(IMAGE_MODEL_KEYS)
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            app_name: env.first_of(APP_NAME_KEYS),
            referer: env.first_of(REFERER_KEYS),
        })
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("api_key", &"<redacted>")
            .field("chat_model", &self.chat_model)
            .field("image_model", &self.image_model)
            .field("app_name", &self.app_name)
            .field("referer", &self.referer)
            .finish()
    }
}
