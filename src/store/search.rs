use super::{StoreError, VectorStore, models::SearchResult, serialize_vector};
use rusqlite::params;

fn map_search_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchResult> {
    let distance: f64 = row.get(5)?;
    let similarity = 1.0 - (distance / 2.0);

    Ok(SearchResult {
        chunk_id: row.get(0)?,
        source: row.get(1)?,
        page: row.get(2)?,
        position: row.get::<_, i64>(3)? as usize,
        content: row.get(4)?,
        similarity,
    })
}

impl VectorStore {
    /// Return the `top_k` chunks nearest to `query_vector` by cosine distance.
    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>, StoreError> {
        if query_vector.len() != self.dimensions() {
            return Err(StoreError::DimensionMismatch {
                stored: self.dimensions(),
                actual: query_vector.len(),
            });
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                c.id,
                c.source,
                c.page,
                c.position,
                c.content,
                vec_distance_cosine(v.embedding, ?) AS distance
            FROM vec_chunks v
            JOIN chunks c ON v.rowid = c.id
            ORDER BY distance ASC
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(
            params![serialize_vector(query_vector), top_k as i64],
            map_search_row,
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
