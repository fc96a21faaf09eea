//! Question answering over the persisted store.
pub mod prompt;
pub mod repl;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::embedder::{Embedder, EmbedderError};
use crate::generator::{Generator, GeneratorError};
use crate::store::models::SearchResult;
use crate::store::{StoreError, VectorStore};

/// Text returned when no store could be opened.
pub const CANNOT_PROCEED: &str = "Cannot proceed without a valid vector store.";

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("chunk count must be positive")]
    ZeroChunks,

    #[error(transparent)]
    Embedding(#[from] EmbedderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generation(#[from] GeneratorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchResult>,
}

#[derive(Debug)]
pub enum QueryOutcome {
    /// No store is loaded; nothing was retrieved or generated.
    Unavailable,
    Answered(Answer),
}

impl QueryOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Unavailable => CANNOT_PROCEED,
            Self::Answered(answer) => &answer.text,
        }
    }
}

pub struct QueryEngine {
    store: Option<VectorStore>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
}

impl QueryEngine {
    /// Open the store in `store_dir`. A store that cannot be opened is
    /// logged and leaves the engine unavailable rather than failing.
    pub fn load(
        store_dir: &Path,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let store = match VectorStore::open_existing(store_dir, embedder.dimensions()) {
            Ok(store) => {
                info!("Vector store loaded from {}", store_dir.display());
                Some(store)
            }
            Err(e) => {
                error!("Could not load the vector store. Has `sync` been run yet? Reason: {e}");
                None
            }
        };

        Self {
            store,
            embedder,
            generator,
        }
    }

    pub fn with_store(
        store: VectorStore,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            store: Some(store),
            embedder,
            generator,
        }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    /// Retrieve the `k` chunks nearest to `question` and have the generator
    /// answer from them in one call.
    pub fn answer(&self, question: &str, k: usize) -> Result<QueryOutcome, QueryError> {
        let Some(store) = &self.store else {
            return Ok(QueryOutcome::Unavailable);
        };
        if k == 0 {
            return Err(QueryError::ZeroChunks);
        }

        info!("Retrieving top {k} chunks for {question:?}");
        let query_vector = self.embedder.embed(question)?;
        let sources = store.search(&query_vector, k)?;

        let prompt = prompt::build_stuff_prompt(question, sources.iter().map(|s| s.content.as_str()));
        info!(
            "Generating answer with {} from {} chunks",
            self.generator.model(),
            sources.len()
        );
        let text = self.generator.generate(&prompt)?;

        Ok(QueryOutcome::Answered(Answer { text, sources }))
    }
}
