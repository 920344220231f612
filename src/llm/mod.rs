//! LLM provider abstraction for recipe text and image generation.

mod fake;
mod gemini;

pub use fake::FakeProvider;
pub use gemini::GeminiProvider;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::{LlmBackend, LlmConfig};

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Model not available: {0}")]
    ModelUnavailable(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Base64 image bytes returned inline by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync + fmt::Debug {
    /// Asks for JSON output constrained by `schema` and returns the raw response text.
    async fn generate_json(&self, prompt: &str, schema: &Value) -> Result<String, LlmError>;

    /// Asks for an image. `Ok(None)` means the model answered without image data.
    async fn generate_image(&self, prompt: &str) -> Result<Option<InlineImage>, LlmError>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}

pub fn provider_from_config(cfg: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match cfg.backend {
        LlmBackend::Fake => Ok(Arc::new(FakeProvider::default())),
        LlmBackend::Gemini => {
            let api_key = cfg
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| LlmError::NotConfigured("GEMINI_API_KEY not set".to_string()))?;
            Ok(Arc::new(GeminiProvider::new(
                api_key,
                cfg.base_url.clone(),
                cfg.text_model.clone(),
                cfg.image_model.clone(),
            )))
        }
    }
}
