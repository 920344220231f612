//! Google Gemini `generateContent` provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{InlineImage, LlmError, LlmProvider};

#[derive(Debug)]
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: String, text_model: String, image_model: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            text_model,
            image_model,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    async fn send(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, LlmError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let body = response
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if let Some(err) = status_error(status, &body, model, retry_after) {
            return Err(err);
        }

        debug!(model, bytes = body.len(), "gemini response received");
        serde_json::from_str(&body).map_err(|e| LlmError::ParseError(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
}

impl<'a> GenerateContentRequest<'a> {
    fn json(prompt: &'a str, schema: &'a Value) -> Self {
        Self {
            contents: vec![Content::user(prompt)],
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(schema),
                ..Default::default()
            },
        }
    }

    fn image(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content::user(prompt)],
            generation_config: GenerationConfig {
                response_modalities: Some(vec!["TEXT", "IMAGE"]),
                ..Default::default()
            },
        }
    }
}

impl<'a> Content<'a> {
    fn user(text: &'a str) -> Self {
        Self {
            role: "user",
            parts: vec![TextPart { text }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter())
            .into_iter()
            .flatten()
    }

    fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }

    fn inline_image(&self) -> Option<InlineImage> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
            .map(|d| InlineImage {
                mime_type: d.mime_type.clone(),
                data: d.data.clone(),
            })
    }
}

fn status_error(
    status: u16,
    body: &str,
    model: &str,
    retry_after_secs: Option<u64>,
) -> Option<LlmError> {
    match status {
        200..=299 => None,
        429 => Some(LlmError::RateLimited { retry_after_secs }),
        404 => Some(LlmError::ModelUnavailable(model.to_string())),
        _ => {
            let message = serde_json::from_str::<ErrorResponse>(body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.to_string());
            Some(LlmError::ApiError { status, message })
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate_json(&self, prompt: &str, schema: &Value) -> Result<String, LlmError> {
        let request = GenerateContentRequest::json(prompt, schema);
        let response = self.send(&self.text_model, &request).await?;
        response
            .text()
            .ok_or_else(|| LlmError::ParseError("No response text from Gemini".to_string()))
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<InlineImage>, LlmError> {
        let request = GenerateContentRequest::image(prompt);
        let response = self.send(&self.image_model, &request).await?;
        Ok(response.inline_image())
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.text_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_request_carries_schema_and_mime_type() {
        let schema = json!({"type": "OBJECT"});
        let req = GenerateContentRequest::json("make soup", &schema);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["contents"][0]["role"], "user");
        assert_eq!(v["contents"][0]["parts"][0]["text"], "make soup");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["generationConfig"]["responseSchema"], schema);
        assert!(v["generationConfig"].get("responseModalities").is_none());
    }

    #[test]
    fn image_request_asks_for_image_modality() {
        let req = GenerateContentRequest::image("a photo");
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["generationConfig"]["responseModalities"], json!(["TEXT", "IMAGE"]));
        assert!(v["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn maps_status_codes() {
        assert!(status_error(200, "", "m", None).is_none());
        assert!(matches!(
            status_error(429, "", "m", Some(7)),
            Some(LlmError::RateLimited { retry_after_secs: Some(7) })
        ));
        assert!(matches!(
            status_error(404, "", "gemini-x", None),
            Some(LlmError::ModelUnavailable(m)) if m == "gemini-x"
        ));
        match status_error(400, r#"{"error":{"message":"bad key"}}"#, "m", None) {
            Some(LlmError::ApiError { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad key");
            }
            other => panic!("unexpected {other:?}"),
        }
        match status_error(500, "boom", "m", None) {
            Some(LlmError::ApiError { message, .. }) => assert_eq!(message, "boom"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn extracts_text_and_inline_image() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "{\"title\":"},
                        {"text": "\"Soup\"}"},
                        {"inlineData": {"mimeType": "image/png", "data": "AAAA"}}
                    ]
                }
            }]
        }))
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some("{\"title\":\"Soup\"}"));
        assert_eq!(
            resp.inline_image(),
            Some(InlineImage {
                mime_type: "image/png".into(),
                data: "AAAA".into()
            })
        );
    }

    #[test]
    fn empty_candidates_yield_nothing() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.text().is_none());
        assert!(resp.inline_image().is_none());
    }
}
