use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub upstream: UpstreamSettings,
    pub capture: CaptureSettings,
    pub turns: TurnSettings,
    pub suggest: SuggestSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Streaming recognizer connection settings. The query parameters here are
/// rendered verbatim onto the upstream URL; the API key is read from the
/// environment and never appears in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSettings {
    pub url: String,
    pub model: String,
    pub language: String,
    pub smart_format: bool,
    pub interim_results: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSettings {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interval between emitted audio chunks, in milliseconds.
    pub chunk_interval_ms: u64,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TurnSettings {
    /// Quiet interval after which buffered speech is committed as a turn.
    pub inactivity_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestSettings {
    pub base_url: String,
    pub model: String,
    pub max_context_chars: usize,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "vocalis-relay".to_string(),
                http: HttpConfig {
                    bind: "0.0.0.0".to_string(),
                    port: 3001,
                },
            },
            upstream: UpstreamSettings::default(),
            capture: CaptureSettings::default(),
            turns: TurnSettings::default(),
            suggest: SuggestSettings::default(),
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            url: "wss://api.deepgram.com/v1/listen".to_string(),
            model: "nova-3".to_string(),
            language: "en-US".to_string(),
            smart_format: true,
            interim_results: true,
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 1,
            chunk_interval_ms: 250,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain: true,
        }
    }
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self { inactivity_ms: 1500 }
    }
}

impl Default for SuggestSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            max_context_chars: 1800,
        }
    }
}
