use std::collections::HashMap;

use crate::embeddings::cosine_similarity;

#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub key: String,
    pub vector: Vec<f32>,
}

/// Per-chunk vectors in chunk iteration order, addressable by chunk id.
#[derive(Debug, Clone, Default)]
pub struct ChunkEmbeddings {
    embeddings: Vec<Embedding>,
    key_to_idx: HashMap<String, usize>,
}

impl ChunkEmbeddings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced key keeps its position
    pub fn insert(&mut self, embedding: Embedding) {
        if let Some(&idx) = self.key_to_idx.get(&embedding.key) {
            self.embeddings[idx] = embedding;
            return;
        }
        self.key_to_idx.insert(embedding.key.clone(), self.embeddings.len());
        self.embeddings.push(embedding);
    }

    pub fn get(&self, key: &str) -> Option<&[f32]> {
        self.key_to_idx
            .get(key)
            .map(|&idx| self.embeddings[idx].vector.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Embedding> {
        self.embeddings.iter()
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Score every stored vector against `query`, highest first.
    ///
    /// `sort_by` is a stable sort: equal scores keep insertion order.
    pub fn rank(&self, query: &[f32]) -> Vec<(&str, f32)> {
        let mut scores: Vec<(&str, f32)> = self
            .embeddings
            .iter()
            .map(|e| (e.key.as_str(), cosine_similarity(query, &e.vector)))
            .collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(key: &str, vector: Vec<f32>) -> Embedding {
        Embedding {
            key: key.to_string(),
            vector,
        }
    }

    #[test]
    fn test_rank_descending() {
        let mut store = ChunkEmbeddings::new();
        store.insert(embedding("far", vec![0.0, 1.0]));
        store.insert(embedding("near", vec![1.0, 0.1]));

        let ranked = store.rank(&[1.0, 0.0]);
        assert_eq!(ranked[0].0, "near");
        assert_eq!(ranked[1].0, "far");
    }

    #[test]
    fn test_rank_ties_keep_insertion_order() {
        let mut store = ChunkEmbeddings::new();
        for key in ["c", "a", "b"] {
            store.insert(embedding(key, vec![1.0, 1.0]));
        }
        store.insert(embedding("zero", vec![0.0, 0.0]));

        let keys: Vec<&str> = store.rank(&[2.0, 2.0]).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["c", "a", "b", "zero"]);
    }

    #[test]
    fn test_insert_replaces() {
        let mut store = ChunkEmbeddings::new();
        store.insert(embedding("a", vec![1.0]));
        store.insert(embedding("a", vec![2.0]));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a"), Some(&[2.0f32][..]));
    }
}
