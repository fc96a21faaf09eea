/// Offline embedder for tests.
///
/// Vectors are derived from a hash of the text, so equal texts always map to
/// equal vectors. Every call is counted, which lets tests assert that a code
/// path made no embedding requests at all.
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Embedder, EmbedderError};

pub struct MockEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
    embedded_texts: AtomicUsize,
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
            embedded_texts: AtomicUsize::new(0),
        }
    }

    /// Number of `embed`/`embed_batch` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Number of individual texts embedded so far.
    pub fn embedded_texts(&self) -> usize {
        self.embedded_texts.load(Ordering::Relaxed)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let bytes = hasher.finish().to_le_bytes();

        // Offset by one so no vector is all zeros (cosine distance needs a norm)
        let mut embedding: Vec<f32> = (0..self.dimensions)
            .map(|i| (bytes[i % 8] as f32 + 1.0) / 256.0 * if i % 3 == 0 { -1.0 } else { 1.0 })
            .collect();

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        for v in &mut embedding {
            *v /= norm;
        }
        embedding
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.embedded_texts.fetch_add(1, Ordering::Relaxed);
        Ok(self.vector_for(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.embedded_texts.fetch_add(texts.len(), Ordering::Relaxed);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_embed_deterministic() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed("hello").unwrap();
        let b = embedder.embed("hello").unwrap();
        assert_eq!(a, b, "same input should produce same output");
        assert_ne!(a, embedder.embed("world").unwrap());
    }

    #[test]
    fn test_mock_embed_normalized() {
        let embedder = MockEmbedder::default();
        let vec = embedder.embed("test normalization").unwrap();
        assert_eq!(vec.len(), 384);
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01, "got norm {norm}");
    }

    #[test]
    fn test_mock_counts_calls() {
        let embedder = MockEmbedder::new(8);
        assert_eq!(embedder.calls(), 0);

        embedder.embed_batch(&["a", "b", "c"]).unwrap();
        embedder.embed("q").unwrap();

        assert_eq!(embedder.calls(), 2);
        assert_eq!(embedder.embedded_texts(), 4);
    }
}
