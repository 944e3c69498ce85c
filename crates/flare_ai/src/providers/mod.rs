//! AI provider trait and the OpenAI-compatible Gemini implementation.

pub mod gemini;
pub(crate) mod openai_wire;

use async_trait::async_trait;
use flare_core::{ErrorCategory, UserFacing};

use crate::types::{ChatRequest, ChatResponse};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that any provider may return.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited")]
    RateLimit,

    #[error("Invalid API key")]
    InvalidKey,

    #[error("Timeout")]
    Timeout,

    #[error("Provider error: {0}")]
    Other(String),
}

impl UserFacing for ProviderError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) | Self::Timeout => ErrorCategory::Network,
            Self::InvalidKey => ErrorCategory::Configuration,
            Self::RateLimit | Self::Other(_) => ErrorCategory::Service,
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A generative-AI backend.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the provider has what it needs to make a call.
    async fn is_available(&self) -> bool;

    /// Non-streaming completion.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}
