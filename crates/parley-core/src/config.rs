//! Gateway configuration. Built once at process start (optional JSON file,
//! then environment overrides) and passed by reference into constructors;
//! nothing reads the environment at call time.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_FALLBACK_MODEL: &str = "gpt-4o-mini";

const DEFAULT_PERSONA: &str = "You are Parley, a friendly and professional assistant \
for web development and AI services. Answer questions about AI chatbots, web apps, \
and site development, and invite visitors to book an intro call when they want to \
discuss a project.";

/// Tunables for the stateless completion path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub persona: String,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_FALLBACK_MODEL.to_string(),
            max_tokens: 500,
            temperature: 0.7,
            persona: DEFAULT_PERSONA.to_string(),
        }
    }
}

/// Request pacing consumed by the browser widget, never enforced here. The
/// gateway only serializes these so the widget knows how hard it may poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientPacing {
    pub min_request_delay_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_requests_per_minute: u32,
}

impl Default for ClientPacing {
    fn default() -> Self {
        Self {
            min_request_delay_ms: 5_000,
            max_retries: 3,
            retry_delay_ms: 10_000,
            max_requests_per_minute: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub assistant_id: String,
    pub fallback: FallbackSettings,
    pub pacing: ClientPacing,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            assistant_id: String::new(),
            fallback: FallbackSettings::default(),
            pacing: ClientPacing::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from an optional JSON file, then apply environment overrides.
    /// Priority: environment > file > built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };
        if config.base_url.is_empty() {
            config.base_url = DEFAULT_BASE_URL.to_string();
        }
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(key) = env_nonempty("PARLEY_API_KEY").or_else(|| env_nonempty("OPENAI_API_KEY"))
        {
            self.api_key = Some(key);
        }
        if let Some(url) = env_nonempty("PARLEY_BASE_URL") {
            self.base_url = url;
        }
        if let Some(id) = env_nonempty("PARLEY_ASSISTANT_ID") {
            self.assistant_id = id;
        }
        if let Some(model) = env_nonempty("PARLEY_FALLBACK_MODEL") {
            self.fallback.model = model;
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
