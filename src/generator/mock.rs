/// Generator that records prompts and replies with a fixed answer.
use std::sync::{Mutex, PoisonError};

use super::{Generator, GeneratorError};

pub struct RecordingGenerator {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Generator for RecordingGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "recording"
    }
}
