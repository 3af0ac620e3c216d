use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::util::SecretString;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
}

impl Provider {
    /// Environment variable consulted when `api_key_env` is not configured.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAI | Provider::OpenAICompatible => "OPENAI_API_KEY",
        }
    }

    /// Hosted providers reject unauthenticated calls; only local servers run keyless.
    pub fn requires_key(&self) -> bool {
        !matches!(self, Provider::OpenAICompatible)
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::OpenAICompatible => "http://localhost:11434/v1",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Gemini => "gemini",
            Provider::OpenAI => "openai",
            Provider::OpenAICompatible => "openai-compatible",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,
    #[serde(default = "default_model")]
    pub model: String,
    /// Env var holding the API key. Inferred from the provider when absent;
    /// "none" means no key is sent, which only openai-compatible accepts.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Upper bound on a single oracle call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn api_key_env_name(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }

    /// Read the API key once. `None` means the key is missing, which every
    /// request then reports as a configuration error.
    pub fn api_key(&self) -> Option<SecretString> {
        let env_var = self.api_key_env_name();
        if is_keyless(env_var) {
            return (!self.provider.requires_key()).then(|| SecretString::new(String::new()));
        }
        match env::var(env_var) {
            Ok(v) if !v.trim().is_empty() => Some(SecretString::new(v)),
            // Local openai-compatible servers usually run keyless
            _ if self.provider == Provider::OpenAICompatible => {
                Some(SecretString::new(String::new()))
            }
            _ => None,
        }
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

fn is_keyless(env_var: &str) -> bool {
    env_var.eq_ignore_ascii_case("none")
}

/// Reason reported when a request is attempted without a usable key.
pub fn missing_key_message(env_var: &str) -> String {
    if is_keyless(env_var) {
        "api_key_env = \"none\" is only valid for the openai-compatible provider".to_string()
    } else {
        format!("{} is not set", env_var)
    }
}

fn default_provider() -> Provider {
    Provider::Gemini
}

fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0:8787".to_string()
}

impl Config {
    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path)
                .with_context(|| format!("failed to load config from {}", config_path));
        }

        Self::load_first(&Self::search_paths())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("trendsmith.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("trendsmith").join("config.toml"));
        }
        paths
    }

    /// First existing file wins. A file that exists but fails to parse is an
    /// error, never a silent fall back to defaults.
    fn load_first(paths: &[PathBuf]) -> Result<Self> {
        for path in paths {
            match fs::read_to_string(path) {
                Ok(content) => {
                    debug!("Loading config from {:?}", path);
                    return toml::from_str(&content)
                        .with_context(|| format!("failed to parse config {}", path.display()));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to read config {}", path.display()));
                }
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
