use crate::chunk::{Chunk, Document};

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Window size in whitespace-separated words
    pub max_tokens: usize,
    /// Words shared between consecutive windows
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 120,
            overlap: 20,
        }
    }
}

/// Sliding-window segmenter over whitespace tokens.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let tokens: Vec<&str> = document.body.split_whitespace().collect();
        let window = self.config.max_tokens.max(1);
        // An overlap as large as the window would never advance
        let step = window.saturating_sub(self.config.overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut idx = 0;

        while start < tokens.len() {
            let end = tokens.len().min(start + window);
            let text = tokens[start..end].join(" ");
            chunks.push(Chunk::new(&document.doc_id, idx, text));

            if end == tokens.len() {
                break;
            }
            start += step;
            idx += 1;
        }

        chunks
    }

    /// Chunk every document, preserving document order
    pub fn chunk_corpus(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| self.chunk_document(doc))
            .collect()
    }
}
