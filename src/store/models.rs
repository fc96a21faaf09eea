use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A chunk ready to be written, borrowed from the splitter output.
#[derive(Debug, Clone)]
pub struct NewChunk<'a> {
    pub source: &'a str,
    pub page: Option<u32>,
    pub position: usize,
    pub content: &'a str,
}

/// Metadata persisted alongside every chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk_id: i64,
    pub source: String,
    pub page: Option<u32>,
    pub position: usize,
    pub content: String,
    pub similarity: f64,
}

#[derive(Debug, Clone)]
pub struct SourceSummary {
    pub source: String,
    pub chunks: usize,
    pub indexed_at: DateTime<Utc>,
}

/// Chunk identifiers grouped by their `source` path.
///
/// Built once from a full metadata listing so that removing a source does
/// not require rescanning the store.
#[derive(Debug, Default, Clone)]
pub struct SourceIndex {
    ids: BTreeMap<String, Vec<i64>>,
}

impl SourceIndex {
    pub fn from_metadata<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (i64, ChunkMetadata)>,
    {
        let mut ids: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        for (id, meta) in rows {
            ids.entry(meta.source).or_default().push(id);
        }
        Self { ids }
    }

    pub fn contains(&self, source: &str) -> bool {
        self.ids.contains_key(source)
    }

    /// Chunk ids recorded for `source`; empty when the source is unknown.
    pub fn ids_for(&self, source: &str) -> &[i64] {
        self.ids.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct sources, in sorted order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.ids.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.ids.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(source: &str) -> ChunkMetadata {
        ChunkMetadata {
            source: source.to_string(),
            page: None,
        }
    }

    #[test]
    fn test_source_index_groups_ids() {
        let index = SourceIndex::from_metadata(vec![
            (1, meta("docs/a.txt")),
            (2, meta("docs/b.pdf")),
            (3, meta("docs/a.txt")),
        ]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.chunk_count(), 3);
        assert_eq!(index.ids_for("docs/a.txt"), &[1, 3]);
        assert_eq!(index.ids_for("docs/b.pdf"), &[2]);
        assert!(index.ids_for("docs/missing.txt").is_empty());
        assert_eq!(
            index.sources().collect::<Vec<_>>(),
            vec!["docs/a.txt", "docs/b.pdf"]
        );
    }
}
