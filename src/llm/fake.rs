//! Deterministic provider for local development (`LLM_PROVIDER=fake`) and tests.
//!
//! Responses are matched by checking whether the prompt contains a registered
//! substring (case-insensitive). Every prompt received is recorded.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{InlineImage, LlmError, LlmProvider};

const CANNED_RECIPE: &str = r#"{
  "title": "Jollof Rice",
  "description": "A one-pot West African rice dish cooked in a rich tomato and pepper base.",
  "ingredients": ["3 cups long-grain rice", "6 plum tomatoes", "2 scotch bonnet peppers", "1 large onion", "3 cups chicken stock"],
  "instructions": ["Blend tomatoes, peppers and onion.", "Fry the blend until reduced.", "Add rice and stock, cover and simmer until tender."],
  "prepTime": "20 mins",
  "cookTime": "45 mins",
  "servings": 6,
  "temperature": "Medium-Low",
  "averageRating": 4.7,
  "ratingCount": 128,
  "tags": ["Rice", "Spicy", "Party"],
  "nutrients": [
    {"name": "Calories", "value": 420, "unit": "kcal"},
    {"name": "Protein", "value": 9, "unit": "g"},
    {"name": "Carbs", "value": 78, "unit": "g"},
    {"name": "Fat", "value": 8, "unit": "g"}
  ]
}"#;

#[derive(Debug)]
pub struct FakeProvider {
    responses: Mutex<Vec<(String, String)>>,
    default_response: Option<String>,
    image: Option<InlineImage>,
    failure: Option<LlmError>,
    prompts: Mutex<Vec<String>>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            default_response: Some(CANNED_RECIPE.to_string()),
            image: None,
            failure: None,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[allow(dead_code)]
impl FakeProvider {
    /// A provider with no canned default: unmatched prompts fail.
    pub fn new() -> Self {
        Self {
            default_response: None,
            ..Self::default()
        }
    }

    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let provider = Self::new();
        provider.add_response(prompt_contains, response);
        provider
    }

    pub fn add_response(&self, prompt_contains: &str, response: &str) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((prompt_contains.to_lowercase(), response.to_string()));
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    pub fn with_image(mut self, mime_type: &str, data: &str) -> Self {
        self.image = Some(InlineImage {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        });
        self
    }

    /// Every call fails with `err`.
    pub fn failing(err: LlmError) -> Self {
        Self {
            failure: Some(err),
            ..Self::new()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, prompt: &str) {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn generate_json(&self, prompt: &str, _schema: &Value) -> Result<String, LlmError> {
        self.record(prompt);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let prompt_lower = prompt.to_lowercase();
        let matched = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|(pattern, _)| prompt_lower.contains(pattern))
            .map(|(_, response)| response.clone());

        match matched.or_else(|| self.default_response.clone()) {
            Some(response) => Ok(response),
            None => Err(LlmError::RequestFailed(format!(
                "FakeProvider: no response configured for prompt: {}",
                prompt.chars().take(100).collect::<String>()
            ))),
        }
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<InlineImage>, LlmError> {
        self.record(prompt);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.image.clone())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
