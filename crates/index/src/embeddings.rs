use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;
use thiserror::Error;

use ingest::Chunk;

use crate::vector_index::{ChunkEmbeddings, Embedding};

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("token pattern is valid"));

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedderError {
    #[error("embedder must be fit before calling transform()")]
    NotFitted,
}

/// Lowercase the text and split it into alphanumeric runs
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Sorted token set with one smoothed idf weight per index.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    tokens: Vec<String>,
    token_to_idx: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.token_to_idx.get(token).copied()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn idf(&self) -> &[f32] {
        &self.idf
    }
}

/// TF-IDF style bag-of-words embedder with no model behind it.
#[derive(Debug, Clone, Default)]
pub struct LexicalEmbedder {
    vocabulary: Option<Vocabulary>,
}

impl LexicalEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.vocabulary.is_some()
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    /// Vector length produced by `transform`, 0 before fitting
    pub fn dimensions(&self) -> usize {
        self.vocabulary.as_ref().map(Vocabulary::len).unwrap_or(0)
    }

    /// Build the vocabulary and idf weights from `documents`.
    ///
    /// Index assignment follows sorted token order, so the result does not
    /// depend on document order.
    pub fn fit<I, S>(&mut self, documents: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let doc_tokens: Vec<HashSet<String>> = documents
            .into_iter()
            .map(|doc| tokenize(doc.as_ref()).into_iter().collect())
            .collect();

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for tokens in &doc_tokens {
            for token in tokens {
                *document_frequency.entry(token.as_str()).or_insert(0) += 1;
            }
        }

        let sorted: BTreeSet<&str> = document_frequency.keys().copied().collect();
        let doc_count = doc_tokens.len() as f32;

        let mut vocabulary = Vocabulary::default();
        for (idx, token) in sorted.into_iter().enumerate() {
            let df = document_frequency[token] as f32;
            // add-one smoothing
            vocabulary.idf.push((1.0 + doc_count / (1.0 + df)).ln());
            vocabulary.tokens.push(token.to_string());
            vocabulary.token_to_idx.insert(token.to_string(), idx);
        }

        tracing::info!(
            documents = doc_tokens.len(),
            vocabulary = vocabulary.len(),
            "Fitted lexical embedder"
        );
        self.vocabulary = Some(vocabulary);
    }

    /// Embed `text` against the fitted vocabulary. Unknown tokens are ignored.
    pub fn transform(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let vocabulary = self.vocabulary.as_ref().ok_or(EmbedderError::NotFitted)?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for token in tokenize(text) {
            *counts.entry(token).or_insert(0) += 1;
        }
        let max_count = counts.values().copied().max().unwrap_or(1) as f32;

        let mut vector = vec![0.0; vocabulary.len()];
        for (token, count) in &counts {
            let Some(idx) = vocabulary.index_of(token) else {
                continue;
            };
            let tf = 0.5 + 0.5 * (*count as f32 / max_count);
            vector[idx] = tf * vocabulary.idf[idx];
        }

        Ok(vector)
    }

    /// Fit on every chunk, then embed each one in chunk order
    pub fn fit_transform_chunks(&mut self, chunks: &[Chunk]) -> Result<ChunkEmbeddings, EmbedderError> {
        self.fit(chunks.iter().map(|c| c.text.as_str()));

        let mut embeddings = ChunkEmbeddings::new();
        for chunk in chunks {
            embeddings.insert(Embedding {
                key: chunk.chunk_id.clone(),
                vector: self.transform(&chunk.text)?,
            });
        }
        Ok(embeddings)
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}
