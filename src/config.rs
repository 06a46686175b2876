use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub relay: RelayConfig,
    pub stream: StreamConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    /// External agent webhook that receives recorded audio
    pub webhook_url: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamConfig {
    /// Token-generation provider: "gemini" or "canned"
    pub provider: String,
    pub model: String,
    /// Credential for the generation API; `GEMINI_API_KEY` in the
    /// environment takes precedence when set
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Where the transcript log is persisted
    pub transcript_path: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VOICE_RELAY").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Resolved generation credential: the conventional environment variable
    /// wins over the config file.
    pub fn stream_api_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.stream.api_key.clone())
    }
}
