use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use extract::{EntitySet, Relation, DEFAULT_MIN_FREQ};
use index::{IndexStats, Indexer, KnowledgeGraph};
use ingest::{Chunk, Chunker, ChunkerConfig, Document};

use crate::llm::GeminiClient;
use crate::retriever::{GraphRetriever, RetrievalResult};

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub chunker: ChunkerConfig,
    pub min_freq: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            min_freq: DEFAULT_MIN_FREQ,
        }
    }
}

/// Build-phase outputs kept for reporting
#[derive(Debug, Clone)]
pub struct PipelineArtifacts {
    pub documents: Vec<Document>,
    pub chunks: Vec<Chunk>,
    pub entities: EntitySet,
    pub relations: Vec<Relation>,
}

/// Corpus in, ranked passages out.
pub struct GraphRagPipeline {
    artifacts: PipelineArtifacts,
    retriever: GraphRetriever,
}

impl GraphRagPipeline {
    pub async fn from_path(path: &Path, config: &PipelineConfig) -> Result<Self> {
        let (documents, chunks) = ingest::ingest_path(path, config.chunker)
            .await
            .context(format!("Failed to ingest {:?}", path))?;
        Self::from_chunks(documents, chunks, config.min_freq)
    }

    pub fn from_documents(documents: Vec<Document>, config: &PipelineConfig) -> Result<Self> {
        let chunks = Chunker::new(config.chunker).chunk_corpus(&documents);
        Self::from_chunks(documents, chunks, config.min_freq)
    }

    pub fn from_chunks(documents: Vec<Document>, chunks: Vec<Chunk>, min_freq: usize) -> Result<Self> {
        // Step 1: Entities and co-occurrence relations
        let entities = extract::extract_entities(&chunks, min_freq);
        let relations = extract::extract_relations(&chunks, &entities);

        // Step 2: Graph + vectors
        let index = Indexer::build(&chunks, &entities, &relations)?;
        let retriever = GraphRetriever::from_artifacts(index, &chunks);

        Ok(Self {
            artifacts: PipelineArtifacts {
                documents,
                chunks,
                entities,
                relations,
            },
            retriever,
        })
    }

    pub fn artifacts(&self) -> &PipelineArtifacts {
        &self.artifacts
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        self.retriever.graph()
    }

    pub fn retriever(&self) -> &GraphRetriever {
        &self.retriever
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats::collect(self.graph(), self.retriever.embedder())
    }

    pub fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        let results = self
            .retriever
            .query(question, top_k)
            .context("Failed to run retrieval")?;
        Ok(results)
    }

    /// Offline answer built from the leading sentences of the best passages
    pub fn query(&self, question: &str, top_k: usize) -> Result<String> {
        let results = self.retrieve(question, top_k)?;
        let answer = synthesise_answer(&results);
        Ok(format_response(question, &answer, &results, top_k))
    }

    pub async fn query_with_llm(&self, question: &str, top_k: usize, llm: &GeminiClient) -> Result<String> {
        let results = self.retrieve(question, top_k)?;
        let answer = llm
            .answer(question, &contexts(&results, top_k))
            .await
            .context("Failed to generate answer")?;
        Ok(format_response(question, &answer, &results, top_k))
    }

    pub fn explain_graph(&self) -> String {
        let mut node_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for node in self.graph().nodes() {
            *node_counts.entry(node.kind().as_str()).or_insert(0) += 1;
        }

        let mut lines = vec!["Graph Summary".to_string(), "------------".to_string()];
        for (kind, count) in node_counts {
            lines.push(format!("{} nodes: {}", capitalize(kind), count));
        }
        lines.push(format!("Edges: {}", self.graph().edge_count()));
        lines.push(format!("Documents: {}", self.artifacts.documents.len()));
        lines.push(format!("Chunks: {}", self.artifacts.chunks.len()));
        lines.join("\n")
    }
}

/// Passage texts of the first `top_k` results
pub fn contexts(results: &[RetrievalResult], top_k: usize) -> Vec<String> {
    results.iter().take(top_k).map(|r| r.text.clone()).collect()
}

pub fn synthesise_answer(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return "No relevant information found.".to_string();
    }

    results
        .iter()
        .take(3)
        .map(|r| {
            let snippet = r.text.trim().split(". ").next().unwrap_or("");
            format!("- {}", snippet)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_response(question: &str, answer: &str, results: &[RetrievalResult], top_k: usize) -> String {
    let context = results
        .iter()
        .take(top_k)
        .enumerate()
        .map(|(idx, r)| {
            format!(
                "[{}] Score={:.2} Trail -> {}\n{}",
                idx + 1,
                r.score,
                r.trail.join(" -> "),
                r.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Question: {}\n\nAnswer:\n{}\n\nContext:\n{}", question, answer, context)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
