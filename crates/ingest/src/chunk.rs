use serde::{Deserialize, Serialize};

/// A source document as loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub title: String,
    pub body: String,
}

/// Atomic retrievable unit. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub doc_id: String,
    pub text: String,
}

impl Chunk {
    pub fn new(doc_id: &str, index: usize, text: String) -> Self {
        Self {
            chunk_id: Self::generate_chunk_id(doc_id, index),
            doc_id: doc_id.to_string(),
            text,
        }
    }

    /// Stable id from the owning document and the window sequence index
    pub fn generate_chunk_id(doc_id: &str, index: usize) -> String {
        format!("{}::chunk-{}", doc_id, index)
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_format() {
        let chunk = Chunk::new("notes/paris.md", 3, "Bob travels to Paris.".to_string());
        assert_eq!(chunk.chunk_id, "notes/paris.md::chunk-3");
        assert_eq!(chunk.doc_id, "notes/paris.md");
        assert_eq!(chunk.word_count(), 4);
    }
}
