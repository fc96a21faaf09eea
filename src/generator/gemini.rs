use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Generator, GeneratorError};
use crate::api::{ApiClient, Content, model_path};

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Result<String, GeneratorError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(GeneratorError::EmptyResponse(reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate
                .finish_reason
                .unwrap_or_else(|| "empty candidate".to_string());
            return Err(GeneratorError::EmptyResponse(reason));
        }
        Ok(text)
    }
}

pub struct GeminiGenerator {
    client: ApiClient,
    model: String,
}

impl GeminiGenerator {
    pub fn new(client: ApiClient, model: &str) -> Self {
        Self {
            client,
            model: model_path(model),
        }
    }
}

impl Generator for GeminiGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        debug!("Generating with {} ({} chars of prompt)", self.model, prompt.len());
        let body = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), prompt)],
        };
        let path = format!("{}:generateContent", self.model);
        let resp: GenerateContentResponse = self.client.post_json(&path, &body)?;
        resp.into_text()
    }

    fn model(&self) -> &str {
        &self.model
    }
}
