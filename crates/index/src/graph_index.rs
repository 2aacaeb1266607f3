use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use extract::{EntitySet, Relation};
use ingest::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Chunk,
    Entity,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Chunk => "chunk",
            NodeKind::Entity => "entity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkNode {
    pub id: String,
    pub doc_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityNode {
    pub id: String,
    pub label: String,
    pub frequency: usize,
}

/// A node carries exactly the attributes of its kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphNode {
    Chunk(ChunkNode),
    Entity(EntityNode),
}

impl GraphNode {
    pub fn id(&self) -> &str {
        match self {
            GraphNode::Chunk(node) => &node.id,
            GraphNode::Entity(node) => &node.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            GraphNode::Chunk(_) => NodeKind::Chunk,
            GraphNode::Entity(_) => NodeKind::Entity,
        }
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Mentions,
    CoOccurs,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Mentions => "mentions",
            EdgeKind::CoOccurs => "co_occurs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEdge {
    /// chunk <-> entity
    Mentions,
    /// entity <-> entity
    CoOccurs { weight: f32, description: String },
}

impl GraphEdge {
    pub fn kind(&self) -> EdgeKind {
        match self {
            GraphEdge::Mentions => EdgeKind::Mentions,
            GraphEdge::CoOccurs { .. } => EdgeKind::CoOccurs,
        }
    }

    pub fn weight(&self) -> f32 {
        match self {
            GraphEdge::Mentions => 1.0,
            GraphEdge::CoOccurs { weight, .. } => *weight,
        }
    }
}

impl fmt::Display for GraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub chunk_count: usize,
    pub entity_count: usize,
    pub mention_count: usize,
    pub relation_count: usize,
}

/// Undirected simple graph of chunks and entities, keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: UnGraph<GraphNode, GraphEdge>,
    node_index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble the graph: chunk nodes, entity nodes, `mentions` edges by
    /// literal (case-sensitive) label containment, then `co_occurs` edges.
    pub fn build(chunks: &[Chunk], entities: &EntitySet, relations: &[Relation]) -> Self {
        let mut graph = Self::new();

        for chunk in chunks {
            graph.add_node(GraphNode::Chunk(ChunkNode {
                id: chunk.chunk_id.clone(),
                doc_id: chunk.doc_id.clone(),
                text: chunk.text.clone(),
            }));
        }

        for entity in entities.iter() {
            graph.add_node(GraphNode::Entity(EntityNode {
                id: entity.entity_id.clone(),
                label: entity.label.clone(),
                frequency: entity.frequency,
            }));
        }

        for chunk in chunks {
            for entity in entities.iter() {
                // Substring match, so "Paris" also hits "Parisian"
                if chunk.text.contains(&entity.label) {
                    graph.add_edge(&chunk.chunk_id, &entity.entity_id, GraphEdge::Mentions);
                }
            }
        }

        let mut dropped = 0;
        for relation in relations {
            let edge = GraphEdge::CoOccurs {
                weight: relation.weight,
                description: relation.description.clone(),
            };
            if !graph.add_edge(&relation.head_id, &relation.tail_id, edge) {
                dropped += 1;
            }
        }

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            dropped_relations = dropped,
            "Built knowledge graph"
        );
        graph
    }

    /// Add a node. Returns false (and keeps the existing node) if the id is taken.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.node_index.contains_key(node.id()) {
            tracing::warn!(id = node.id(), "Duplicate node id, keeping the first node");
            return false;
        }
        let id = node.id().to_string();
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        true
    }

    /// Add or overwrite the edge between two existing nodes.
    /// Returns false when either endpoint is missing.
    pub fn add_edge(&mut self, a: &str, b: &str, edge: GraphEdge) -> bool {
        let (Some(&a_idx), Some(&b_idx)) = (self.node_index.get(a), self.node_index.get(b)) else {
            return false;
        };
        self.graph.update_edge(a_idx, b_idx, edge);
        true
    }

    /// Underlying petgraph storage, for algorithms and renderers
    pub fn as_petgraph(&self) -> &UnGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<&GraphEdge> {
        let a_idx = *self.node_index.get(a)?;
        let b_idx = *self.node_index.get(b)?;
        self.graph
            .find_edge(a_idx, b_idx)
            .map(|edge_idx| &self.graph[edge_idx])
    }

    /// Neighbors of `id` with the connecting edge, in edge insertion order.
    /// Empty when `id` is not in the graph.
    pub fn neighbors(&self, id: &str) -> Vec<(&GraphNode, &GraphEdge)> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self.graph.edges(idx).collect();
        edges.sort_by_key(|e| e.id().index());

        edges
            .into_iter()
            .map(|e| {
                let other = if e.source() == idx { e.target() } else { e.source() };
                (&self.graph[other], e.weight())
            })
            .collect()
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Edges as (endpoint id, endpoint id, edge) in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &GraphEdge)> {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].id(),
                self.graph[e.target()].id(),
                e.weight(),
            )
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats::default();
        for node in self.nodes() {
            match node.kind() {
                NodeKind::Chunk => stats.chunk_count += 1,
                NodeKind::Entity => stats.entity_count += 1,
            }
        }
        for (_, _, edge) in self.edges() {
            match edge.kind() {
                EdgeKind::Mentions => stats.mention_count += 1,
                EdgeKind::CoOccurs => stats.relation_count += 1,
            }
        }
        stats
    }

    /// Independent copy of the subgraph induced by `ids`, preserving node and edge order
    pub fn subgraph(&self, ids: &HashSet<String>) -> KnowledgeGraph {
        let mut sub = KnowledgeGraph::new();
        for node in self.nodes() {
            if ids.contains(node.id()) {
                sub.add_node(node.clone());
            }
        }
        for (a, b, edge) in self.edges() {
            if ids.contains(a) && ids.contains(b) {
                sub.add_edge(a, b, edge.clone());
            }
        }
        sub
    }
}
