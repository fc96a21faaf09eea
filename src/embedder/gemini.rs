/// Remote embedder backed by the Generative Language embedding endpoints.
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedder, EmbedderError};
use crate::api::{ApiClient, Content, model_path};

/// `batchEmbedContents` accepts at most this many requests per call.
const MAX_BATCH: usize = 100;

const TASK_QUERY: &str = "RETRIEVAL_QUERY";
const TASK_DOCUMENT: &str = "RETRIEVAL_DOCUMENT";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

pub struct GeminiEmbedder {
    client: ApiClient,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn new(client: ApiClient, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            model: model_path(model),
            dimensions,
        }
    }

    fn request<'a>(&'a self, text: &str, task_type: &'static str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: &self.model,
            content: Content::text(None, text),
            task_type,
        }
    }

    fn check_dimensions(&self, values: Vec<f32>) -> Result<Vec<f32>, EmbedderError> {
        if values.len() != self.dimensions {
            return Err(EmbedderError::InvalidResponse(format!(
                "expected {}-d vector from {}, got {}-d",
                self.dimensions,
                self.model,
                values.len()
            )));
        }
        Ok(values)
    }
}

impl Embedder for GeminiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let path = format!("{}:embedContent", self.model);
        let resp: EmbedContentResponse =
            self.client.post_json(&path, &self.request(text, TASK_QUERY))?;
        self.check_dimensions(resp.embedding.values)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let path = format!("{}:batchEmbedContents", self.model);
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH) {
            debug!("Embedding batch of {} texts with {}", batch.len(), self.model);
            let body = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|t| self.request(t, TASK_DOCUMENT))
                    .collect(),
            };
            let resp: BatchEmbedResponse = self.client.post_json(&path, &body)?;

            if resp.embeddings.len() != batch.len() {
                return Err(EmbedderError::InvalidResponse(format!(
                    "sent {} texts, received {} embeddings",
                    batch.len(),
                    resp.embeddings.len()
                )));
            }
            for embedding in resp.embeddings {
                vectors.push(self.check_dimensions(embedding.values)?);
            }
        }

        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
