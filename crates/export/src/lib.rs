pub mod graph_export;
pub mod subgraph;

pub use graph_export::{export_graphml, to_dot, write_graphml};
pub use subgraph::select_subgraph;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

use index::KnowledgeGraph;
use query::RetrievalResult;

#[derive(Debug, Clone, Copy)]
pub struct SnapshotConfig {
    pub max_nodes: usize,
    /// Hops around each focus node
    pub radius: usize,
    pub with_labels: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_nodes: 200,
            radius: 2,
            with_labels: false,
        }
    }
}

/// Node ids touched by a retrieval: result chunks first, then trail nodes.
pub fn focus_from_results(results: &[RetrievalResult]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut focus = Vec::new();

    let ids = results
        .iter()
        .map(|r| &r.chunk_id)
        .chain(results.iter().flat_map(|r| r.trail.iter()));
    for id in ids {
        if seen.insert(id.as_str()) {
            focus.push(id.clone());
        }
    }
    focus
}

/// Select the neighbourhood of `focus` and render it as DOT
pub fn render_snapshot(graph: &KnowledgeGraph, focus: &[String], config: &SnapshotConfig) -> Result<String> {
    let subgraph = select_subgraph(graph, focus, config.max_nodes, config.radius)?;
    Ok(to_dot(&subgraph, focus, config.with_labels))
}

pub fn write_snapshot(
    graph: &KnowledgeGraph,
    focus: &[String],
    config: &SnapshotConfig,
    output: &Path,
) -> Result<()> {
    let dot = render_snapshot(graph, focus, config)?;
    std::fs::write(output, dot).context(format!("Failed to write snapshot to {:?}", output))?;
    tracing::info!(path = %output.display(), focus = focus.len(), "Wrote graph snapshot");
    Ok(())
}
