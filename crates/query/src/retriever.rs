use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use index::{ChunkEmbeddings, EdgeKind, EmbedderError, IndexArtifacts, KnowledgeGraph, LexicalEmbedder, NodeKind};
use ingest::Chunk;

/// Score multiplier for chunks reached through a shared entity.
pub const EXPANSION_DECAY: f32 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk_id: String,
    pub score: f32,
    pub text: String,
    /// `[chunk]` for a direct hit, `[seed, entity, chunk]` for an expansion
    pub trail: Vec<String>,
}

impl RetrievalResult {
    pub fn is_expansion(&self) -> bool {
        self.trail.len() == 3
    }
}

/// Ranks chunks by lexical similarity, then walks chunk -> entity -> chunk
/// edges around the top seeds.
///
/// Holds no per-query state; every field is read-only after construction.
#[derive(Debug, Clone)]
pub struct GraphRetriever {
    graph: KnowledgeGraph,
    chunk_index: HashMap<String, Chunk>,
    embedder: LexicalEmbedder,
    chunk_embeddings: ChunkEmbeddings,
}

impl GraphRetriever {
    pub fn new(
        graph: KnowledgeGraph,
        chunk_index: HashMap<String, Chunk>,
        embedder: LexicalEmbedder,
        chunk_embeddings: ChunkEmbeddings,
    ) -> Self {
        Self {
            graph,
            chunk_index,
            embedder,
            chunk_embeddings,
        }
    }

    pub fn from_artifacts(artifacts: IndexArtifacts, chunks: &[Chunk]) -> Self {
        let chunk_index = chunks
            .iter()
            .map(|c| (c.chunk_id.clone(), c.clone()))
            .collect();
        Self::new(artifacts.graph, chunk_index, artifacts.embedder, artifacts.embeddings)
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn embedder(&self) -> &LexicalEmbedder {
        &self.embedder
    }

    pub fn chunk_embeddings(&self) -> &ChunkEmbeddings {
        &self.chunk_embeddings
    }

    /// Top-`k` seeds plus their graph expansions, highest score first.
    ///
    /// `k == 0` returns no results. The query never refits the vocabulary.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievalResult>, EmbedderError> {
        let query_vec = self.embedder.transform(text)?;
        let scored = self.chunk_embeddings.rank(&query_vec);
        let seeds = &scored[..k.min(scored.len())];

        let mut visited = HashSet::new();
        let mut results = Vec::new();

        for &(seed_id, seed_score) in seeds {
            if !self.graph.contains(seed_id) {
                tracing::debug!(chunk_id = seed_id, "Seed not in graph, skipping");
                continue;
            }

            self.expand_seed(seed_id, seed_score, &mut visited, &mut results);

            if let Some(result) = self.result(seed_id, seed_score, vec![seed_id.to_string()]) {
                results.push(result);
            }
            visited.insert(seed_id.to_string());
        }

        // Stable: equal scores keep discovery order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::debug!(
            seeds = seeds.len(),
            results = results.len(),
            "Graph-augmented retrieval finished"
        );
        Ok(results)
    }

    /// Walk seed -> entity -> chunk. `visited` is shared across all seeds of a
    /// query, so the first discovery of a chunk wins.
    fn expand_seed(
        &self,
        seed_id: &str,
        seed_score: f32,
        visited: &mut HashSet<String>,
        results: &mut Vec<RetrievalResult>,
    ) {
        for (entity, edge) in self.graph.neighbors(seed_id) {
            if edge.kind() != EdgeKind::Mentions {
                continue;
            }

            for (expansion, _) in self.graph.neighbors(entity.id()) {
                let expansion_id = expansion.id();
                if expansion_id == seed_id
                    || visited.contains(expansion_id)
                    || expansion.kind() != NodeKind::Chunk
                {
                    continue;
                }

                let trail = vec![
                    seed_id.to_string(),
                    entity.id().to_string(),
                    expansion_id.to_string(),
                ];
                if let Some(result) = self.result(expansion_id, seed_score * EXPANSION_DECAY, trail) {
                    results.push(result);
                }
                visited.insert(expansion_id.to_string());
            }
        }
    }

    fn result(&self, chunk_id: &str, score: f32, trail: Vec<String>) -> Option<RetrievalResult> {
        let Some(chunk) = self.chunk_index.get(chunk_id) else {
            tracing::warn!(chunk_id, "Chunk node has no indexed text");
            return None;
        };
        Some(RetrievalResult {
            chunk_id: chunk_id.to_string(),
            score,
            text: chunk.text.clone(),
            trail,
        })
    }
}
