//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SPEECH_MODEL, ...)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! The speech service API key is deliberately NOT part of this struct; it
//! is read from `GEMINI_API_KEY` at connect time and never serialized.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub speech: SpeechConfig,
    pub audio: AudioConfig,
    pub performance: PerformanceConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Speech service (Gemini Live) configuration.
///
/// ## Fields:
/// - `model`: model name sent in the session setup
/// - `base_url`: WebSocket endpoint of the live API
/// - `connect_timeout_ms`: handshake deadline per connection
/// - `prewarm`: whether to open and close a throwaway session at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub model: String,
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub prewarm: bool,
}

/// Expected format of microphone audio arriving from the browser.
///
/// The capture side records mono float samples at this rate; the transport
/// only converts the sample format, never resamples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u8,
}

/// Performance tuning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum number of simultaneous WebSocket conversations
    pub max_concurrent_sessions: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            speech: SpeechConfig {
                model: "gemini-1.5-flash-latest".to_string(),
                base_url: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent".to_string(),
                connect_timeout_ms: 10_000,
                prewarm: true,
            },
            audio: AudioConfig {
                sample_rate: 16_000,
                channels: 1,
            },
            performance: PerformanceConfig {
                max_concurrent_sessions: 10,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER_HOST=0.0.0.0`: override server host
    /// - `APP_SPEECH_MODEL=gemini-2.0-flash-exp`: override speech model
    /// - `HOST` / `PORT`: deployment-platform overrides without the prefix
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms commonly inject these without the APP_ prefix
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Catching configuration errors at startup keeps them out of the
    /// per-connection paths, which have no good place to report them.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.speech.model.is_empty() {
            return Err(anyhow::anyhow!("Speech model cannot be empty"));
        }

        if !self.speech.base_url.starts_with("ws://") && !self.speech.base_url.starts_with("wss://")
        {
            return Err(anyhow::anyhow!(
                "Speech base_url must be a ws:// or wss:// URL"
            ));
        }

        if self.speech.connect_timeout_ms == 0 {
            return Err(anyhow::anyhow!(
                "Speech connect timeout must be greater than 0"
            ));
        }

        if self.audio.sample_rate == 0 {
            return Err(anyhow::anyhow!("Audio sample rate must be greater than 0"));
        }

        if self.audio.channels != 1 {
            return Err(anyhow::anyhow!(
                "Only mono microphone audio is supported (channels = 1)"
            ));
        }

        if self.performance.max_concurrent_sessions == 0 {
            return Err(anyhow::anyhow!(
                "Max concurrent sessions must be greater than 0"
            ));
        }

        Ok(())
    }

    /// Apply a partial update from a JSON document (runtime config endpoint).
    ///
    /// Only the fields present in the JSON are touched, so a client can send
    /// just `{"speech": {"model": "..."}}` to switch models. The updated
    /// configuration is re-validated before it is accepted.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(speech) = partial.get("speech") {
            if let Some(model) = speech.get("model").and_then(|v| v.as_str()) {
                self.speech.model = model.to_string();
            }
            if let Some(base_url) = speech.get("base_url").and_then(|v| v.as_str()) {
                self.speech.base_url = base_url.to_string();
            }
            if let Some(timeout) = speech.get("connect_timeout_ms").and_then(|v| v.as_u64()) {
                self.speech.connect_timeout_ms = timeout;
            }
            if let Some(prewarm) = speech.get("prewarm").and_then(|v| v.as_bool()) {
                self.speech.prewarm = prewarm;
            }
        }

        if let Some(audio) = partial.get("audio") {
            if let Some(rate) = audio.get("sample_rate").and_then(|v| v.as_u64()) {
                self.audio.sample_rate = rate as u32;
            }
            if let Some(channels) = audio.get("channels").and_then(|v| v.as_u64()) {
                self.audio.channels = channels as u8;
            }
        }

        if let Some(performance) = partial.get("performance") {
            if let Some(sessions) = performance
                .get("max_concurrent_sessions")
                .and_then(|v| v.as_u64())
            {
                self.performance.max_concurrent_sessions = sessions as usize;
            }
        }

        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.audio.sample_rate, 16_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.speech.base_url = "https://not-a-socket".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.audio.channels = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"speech": {"model": "gemini-2.0-flash-exp"}, "server": {"port": 9090}}"#;
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.speech.model, "gemini-2.0-flash-exp");
        assert_eq!(config.server.port, 9090);
        // Untouched fields keep their values
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.speech.prewarm);
    }

    #[test]
    fn test_config_update_rejects_invalid() {
        let mut config = AppConfig::default();
        let json = r#"{"performance": {"max_concurrent_sessions": 0}}"#;
        assert!(config.update_from_json(json).is_err());
    }
}
