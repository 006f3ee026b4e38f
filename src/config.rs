//! Configuration management for the muse CLI

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MuseError, Result};

/// Application configuration persisted as JSON under the platform config dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub endpoint: String,
    pub timeout: u64,
    pub verbose: bool,
    pub storage_dir: PathBuf,
    #[serde(default)]
    pub speech: SpeechConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.stylemuse.app".to_string(),
            timeout: 120,
            verbose: false,
            storage_dir: default_storage_dir(),
            speech: SpeechConfig::default(),
        }
    }
}

impl AppConfig {
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };

        if config_file.exists() {
            let content = fs::read_to_string(&config_file).await?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => Ok(config),
                Err(_) => {
                    // Unreadable config is replaced with defaults rather than
                    // blocking every command.
                    let config = Self::default();
                    config.save(&config_file).await?;
                    Ok(config)
                }
            }
        } else {
            let config = Self::default();
            config.save(&config_file).await?;
            Ok(config)
        }
    }

    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content).await?;
        Ok(())
    }

    /// Path of the persisted session record.
    pub fn session_path(&self) -> PathBuf {
        self.storage_dir.join("session.json")
    }

    pub fn to_client_config(&self) -> ClientConfig {
        let use_proxy =
            !self.endpoint.contains("localhost") && !self.endpoint.contains("127.0.0.1");

        ClientConfigBuilder::new()
            .base_url(&self.endpoint)
            .timeout(self.timeout)
            .verbose(self.verbose)
            .use_proxy(use_proxy)
            .build()
            .unwrap_or_else(|_| ClientConfig::default())
    }
}

/// Speech adapter settings (synthesis and transcription endpoints).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Voice-synthesis endpoint; `{voice_id}` is substituted in.
    pub synthesis_endpoint: String,
    pub voice_id: String,
    pub model_id: String,
    pub stability: f64,
    pub similarity_boost: f64,
    /// Environment variable holding the synthesis API key.
    pub synthesis_key_env: String,
    /// Multipart transcription endpoint.
    pub transcription_endpoint: String,
    pub transcription_model: String,
    /// Environment variable holding the transcription API key.
    pub transcription_key_env: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            synthesis_endpoint: "https://api.elevenlabs.io/v1/text-to-speech/{voice_id}"
                .to_string(),
            voice_id: "EXAVITQu4vr4xnSDxMaL".to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            synthesis_key_env: "ELEVENLABS_API_KEY".to_string(),
            transcription_endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            transcription_model: "whisper-1".to_string(),
            transcription_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stylemuse")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stylemuse")
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
}

fn default_timeout() -> u64 {
    120
}

fn default_use_proxy() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stylemuse.app".to_string(),
            timeout: default_timeout(),
            verbose: false,
            use_proxy: default_use_proxy(),
        }
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<u64>,
    verbose: Option<bool>,
    use_proxy: Option<bool>,
    config_file: Option<PathBuf>,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    pub fn use_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = Some(use_proxy);
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_file_and_env(self.config_file.as_deref())?;

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
        if let Some(use_proxy) = self.use_proxy {
            config.use_proxy = use_proxy;
        }

        config.validate()?;
        Ok(config)
    }
}

impl ClientConfig {
    pub fn new() -> Result<Self> {
        Self::from_file_and_env::<&str>(None)
    }

    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    pub fn from_file_and_env<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("base_url", "https://api.stylemuse.app")?
            .set_default("timeout", 120)?
            .set_default("verbose", false)?
            .set_default("use_proxy", true)?;

        if let Some(config_path) = config_file {
            if config_path.as_ref().exists() {
                builder = builder.add_source(File::from(config_path.as_ref()));
            }
        }
        builder = builder.add_source(Environment::with_prefix("STYLEMUSE").try_parsing(true));

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(MuseError::invalid_endpoint("Base URL cannot be empty"));
        }
        Ok(())
    }

    /// Build a full URL for an API endpoint path.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        let base_url = if self.base_url.starts_with("http://")
            || self.base_url.starts_with("https://")
        {
            self.base_url.clone()
        } else {
            format!("https://{}", self.base_url)
        };

        format!("{}/{}", base_url.trim_end_matches('/'), endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_joins_cleanly() {
        let config = ClientConfig {
            base_url: "https://api.stylemuse.app/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.endpoint_url("/api/chats/u1"),
            "https://api.stylemuse.app/api/chats/u1"
        );
        assert_eq!(
            config.endpoint_url("chat"),
            "https://api.stylemuse.app/chat"
        );
    }

    #[test]
    fn endpoint_url_defaults_to_https() {
        let config = ClientConfig {
            base_url: "api.stylemuse.app".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.endpoint_url("api/login"),
            "https://api.stylemuse.app/api/login"
        );
    }

    #[test]
    fn empty_base_url_fails_validation() {
        let config = ClientConfig {
            base_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn localhost_bypasses_proxy() {
        let app = AppConfig {
            endpoint: "http://localhost:8000".to_string(),
            ..Default::default()
        };
        assert!(!app.to_client_config().use_proxy);
    }
}
