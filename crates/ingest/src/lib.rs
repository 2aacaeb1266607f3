pub mod chunk;
pub mod chunker;
pub mod reader;

pub use chunk::{Chunk, Document};
pub use chunker::{Chunker, ChunkerConfig};
pub use reader::FileReader;

use anyhow::Result;
use std::path::Path;

/// Main ingestion pipeline: load a file or directory, then chunk every document
pub async fn ingest_path(path: &Path, config: ChunkerConfig) -> Result<(Vec<Document>, Vec<Chunk>)> {
    let documents = FileReader::load_documents(path).await?;
    let chunks = Chunker::new(config).chunk_corpus(&documents);

    tracing::info!(
        documents = documents.len(),
        chunks = chunks.len(),
        "Chunked corpus"
    );

    Ok((documents, chunks))
}
