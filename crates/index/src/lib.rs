pub mod embeddings;
pub mod graph_index;
pub mod vector_index;

pub use embeddings::{cosine_similarity, tokenize, EmbedderError, LexicalEmbedder, Vocabulary};
pub use graph_index::{
    ChunkNode, EdgeKind, EntityNode, GraphEdge, GraphNode, GraphStats, KnowledgeGraph, NodeKind,
};
pub use vector_index::{ChunkEmbeddings, Embedding};

use anyhow::{Context, Result};
use extract::{EntitySet, Relation};
use ingest::Chunk;

/// Everything the build phase hands to retrieval. Read-only afterwards.
#[derive(Debug, Clone)]
pub struct IndexArtifacts {
    pub graph: KnowledgeGraph,
    pub embedder: LexicalEmbedder,
    pub embeddings: ChunkEmbeddings,
}

/// Builds the graph store and the vector store from one corpus
pub struct Indexer;

impl Indexer {
    pub fn build(chunks: &[Chunk], entities: &EntitySet, relations: &[Relation]) -> Result<IndexArtifacts> {
        let graph = KnowledgeGraph::build(chunks, entities, relations);

        let mut embedder = LexicalEmbedder::new();
        let embeddings = embedder
            .fit_transform_chunks(chunks)
            .context("Failed to embed chunks")?;

        Ok(IndexArtifacts {
            graph,
            embedder,
            embeddings,
        })
    }
}

impl IndexArtifacts {
    pub fn stats(&self) -> IndexStats {
        IndexStats::collect(&self.graph, &self.embedder)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IndexStats {
    pub chunks: usize,
    pub entities: usize,
    pub mentions: usize,
    pub co_occurs: usize,
    pub vocabulary: usize,
}

impl IndexStats {
    pub fn collect(graph: &KnowledgeGraph, embedder: &LexicalEmbedder) -> Self {
        let graph = graph.stats();
        Self {
            chunks: graph.chunk_count,
            entities: graph.entity_count,
            mentions: graph.mention_count,
            co_occurs: graph.relation_count,
            vocabulary: embedder.dimensions(),
        }
    }
}
