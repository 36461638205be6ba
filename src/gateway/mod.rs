//! Text-generation backends.
//!
//! The backend is chosen once from [`Config`] and handed to the caller as a
//! boxed [`GenerationGateway`]; nothing downstream matches on the backend kind.

pub mod claude;
pub mod codex;
pub mod gemini;
pub mod retry;
pub mod subprocess;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::error::GatewayError;

pub use claude::ClaudeGateway;
pub use codex::CodexGateway;
pub use gemini::GeminiGateway;
pub use retry::Retrying;

/// Supported generation backends.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Gemini,
    Claude,
    Codex,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Gemini => "gemini",
            Backend::Claude => "claude",
            Backend::Codex => "codex",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Backend::Gemini),
            "claude" => Ok(Backend::Claude),
            "codex" => Ok(Backend::Codex),
            other => Err(format!(
                "unknown backend '{other}' (expected gemini, claude or codex)"
            )),
        }
    }
}

/// A backend that turns one prompt into one free-form text response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    fn backend(&self) -> Backend;

    /// Send `prompt` and return the response text, trimmed and non-empty.
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;
}

/// Build the configured backend, wrapped in the retry policy.
pub fn from_config(config: &Config) -> Result<Box<dyn GenerationGateway>, GatewayError> {
    let inner: Box<dyn GenerationGateway> = match config.backend {
        Backend::Gemini => Box::new(GeminiGateway::from_config(config)?),
        Backend::Claude => Box::new(ClaudeGateway::new(config.timeout())),
        Backend::Codex => Box::new(CodexGateway::new(config.timeout())),
    };
    info!(backend = %inner.backend(), "selected generation backend");
    Ok(Box::new(Retrying::new(inner)))
}

/// Trim a response, rejecting one with no text left.
pub(crate) fn usable_text(raw: &str) -> Result<String, GatewayError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }
    Ok(text.to_string())
}
