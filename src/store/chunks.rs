use super::{StoreError, VectorStore, models::*, serialize_vector};
use chrono::{DateTime, Utc};
use rusqlite::params;

impl VectorStore {
    /// Full chunk-id → metadata listing.
    pub fn metadata(&self) -> Result<Vec<(i64, ChunkMetadata)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, source, page FROM chunks ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let source: String = row.get(1)?;
            let page: Option<u32> = row.get(2)?;
            Ok((id, ChunkMetadata { source, page }))
        })?;

        let mut listing = Vec::new();
        for row in rows {
            listing.push(row?);
        }
        Ok(listing)
    }

    /// Group every stored chunk id by its `source`.
    pub fn source_index(&self) -> Result<SourceIndex, StoreError> {
        Ok(SourceIndex::from_metadata(self.metadata()?))
    }

    /// Inserts chunks and their embeddings in one transaction, returning the
    /// assigned chunk ids in input order.
    pub fn add_chunks(
        &mut self,
        chunks: &[NewChunk<'_>],
        embeddings: &[Vec<f32>],
    ) -> Result<Vec<i64>, StoreError> {
        if chunks.len() != embeddings.len() {
            return Err(StoreError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimensions()) {
            return Err(StoreError::DimensionMismatch {
                stored: self.dimensions(),
                actual: bad.len(),
            });
        }

        let indexed_at = Utc::now();
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(chunks.len());
        {
            let mut insert_chunk = tx.prepare(
                "INSERT INTO chunks (source, page, position, content, indexed_at) VALUES (?, ?, ?, ?, ?)",
            )?;
            let mut insert_vec =
                tx.prepare("INSERT INTO vec_chunks (rowid, embedding) VALUES (?, ?)")?;

            for (chunk, embedding) in chunks.iter().zip(embeddings) {
                insert_chunk.execute(params![
                    chunk.source,
                    chunk.page,
                    chunk.position as i64,
                    chunk.content,
                    indexed_at
                ])?;
                let chunk_id = tx.last_insert_rowid();
                insert_vec.execute(params![chunk_id, serialize_vector(embedding)])?;
                ids.push(chunk_id);
            }
        }
        tx.commit()?;

        Ok(ids)
    }

    /// Deletes the given chunk ids in one transaction. Unknown ids are
    /// ignored; returns how many chunks were actually removed.
    pub fn delete(&mut self, ids: &[i64]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut removed = 0;
        {
            // vec0 tables do not take part in foreign key cascades
            let mut delete_vec = tx.prepare("DELETE FROM vec_chunks WHERE rowid = ?")?;
            let mut delete_chunk = tx.prepare("DELETE FROM chunks WHERE id = ?")?;
            for id in ids {
                delete_vec.execute(params![id])?;
                removed += delete_chunk.execute(params![id])?;
            }
        }
        tx.commit()?;

        Ok(removed)
    }

    /// Per-source chunk counts, sorted by source.
    pub fn sources(&self) -> Result<Vec<SourceSummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT source, COUNT(*), MAX(indexed_at) FROM chunks GROUP BY source ORDER BY source",
        )?;
        let rows = stmt.query_map([], |row| {
            let chunks: i64 = row.get(1)?;
            let indexed_at: DateTime<Utc> = row.get(2)?;
            Ok(SourceSummary {
                source: row.get(0)?,
                chunks: chunks as usize,
                indexed_at,
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    /// Total number of stored chunks.
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: usize = 4;

    fn chunk<'a>(source: &'a str, position: usize, content: &'a str) -> NewChunk<'a> {
        NewChunk {
            source,
            page: None,
            position,
            content,
        }
    }

    fn vec_count(store: &VectorStore) -> i64 {
        store
            .conn
            .query_row("SELECT COUNT(*) FROM vec_chunks", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_chunks_crud() {
        let mut store = VectorStore::open_in_memory(DIM).unwrap();

        let ids = store
            .add_chunks(
                &[chunk("a.txt", 0, "Hello"), chunk("a.txt", 1, "World")],
                &[vec![0.1; DIM], vec![0.2; DIM]],
            )
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(vec_count(&store), 2);

        let listing = store.metadata().unwrap();
        assert_eq!(listing.len(), 2);
        assert!(listing.iter().all(|(_, m)| m.source == "a.txt"));

        let removed = store.delete(&ids).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(vec_count(&store), 0);
    }

    #[test]
    fn test_delete_only_touches_given_source() {
        let mut store = VectorStore::open_in_memory(DIM).unwrap();
        store
            .add_chunks(
                &[
                    chunk("x.txt", 0, "x0"),
                    chunk("x.txt", 1, "x1"),
                    chunk("x.txt", 2, "x2"),
                ],
                &[vec![0.1; DIM], vec![0.2; DIM], vec![0.3; DIM]],
            )
            .unwrap();
        store
            .add_chunks(
                &[chunk("y.txt", 0, "y0"), chunk("y.txt", 1, "y1")],
                &[vec![0.4; DIM], vec![0.5; DIM]],
            )
            .unwrap();

        let index = store.source_index().unwrap();
        let removed = store.delete(index.ids_for("x.txt")).unwrap();
        assert_eq!(removed, 3);

        let index = store.source_index().unwrap();
        assert_eq!(index.sources().collect::<Vec<_>>(), vec!["y.txt"]);
        assert_eq!(index.chunk_count(), 2);
        assert_eq!(vec_count(&store), 2);
    }

    #[test]
    fn test_delete_empty_is_noop() {
        let mut store = VectorStore::open_in_memory(DIM).unwrap();
        assert_eq!(store.delete(&[]).unwrap(), 0);
        assert_eq!(store.delete(&[42]).unwrap(), 0);
    }

    #[test]
    fn test_add_rejects_mismatched_lengths() {
        let mut store = VectorStore::open_in_memory(DIM).unwrap();
        let err = store
            .add_chunks(&[chunk("a.txt", 0, "Hello")], &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::LengthMismatch { .. }));

        let err = store
            .add_chunks(&[chunk("a.txt", 0, "Hello")], &[vec![0.1; DIM + 1]])
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_sources_summary() {
        let mut store = VectorStore::open_in_memory(DIM).unwrap();
        store
            .add_chunks(
                &[chunk("b.txt", 0, "b"), chunk("a.txt", 0, "a0"), chunk("a.txt", 1, "a1")],
                &[vec![0.1; DIM], vec![0.2; DIM], vec![0.3; DIM]],
            )
            .unwrap();

        let summaries = store.sources().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].source, "a.txt");
        assert_eq!(summaries[0].chunks, 2);
        assert_eq!(summaries[1].source, "b.txt");
        assert_eq!(summaries[1].chunks, 1);
    }
}
