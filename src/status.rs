/// Listing of what the vector store currently holds.
use std::io::Write;

use anyhow::Result;

use crate::store::VectorStore;

/// Write one line per indexed source, then the document and chunk totals.
pub fn write_status<W: Write>(store: &VectorStore, output: &mut W) -> Result<()> {
    let sources = store.sources()?;
    if sources.is_empty() {
        writeln!(output, "The store is empty.")?;
        return Ok(());
    }

    let width = sources.iter().map(|s| s.source.len()).max().unwrap_or(0);
    for summary in &sources {
        writeln!(
            output,
            "{:width$}  {:>5} chunks  indexed {}",
            summary.source,
            summary.chunks,
            summary.indexed_at.format("%Y-%m-%d %H:%M:%S")
        )?;
    }
    writeln!(
        output,
        "\n{} documents, {} chunks",
        sources.len(),
        store.count()?
    )?;
    Ok(())
}
