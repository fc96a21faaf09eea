/// Embedder trait and shared types for text embedding.
pub mod gemini;
pub mod mock;

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding request failed: {0}")]
    Request(#[from] ApiError),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`.
pub trait Embedder: Send + Sync {
    /// Embed a search query.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed document chunks for storage.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}
