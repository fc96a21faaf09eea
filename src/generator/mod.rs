/// Text generation backends.
pub mod gemini;
pub mod mock;

use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("generation request failed: {0}")]
    Request(#[from] ApiError),

    #[error("model returned no text ({0})")]
    EmptyResponse(String),
}

/// A model that turns one prompt into one completion.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
