use anyhow::Result;
use std::collections::{HashSet, VecDeque};

use index::KnowledgeGraph;

/// Pick the part of `graph` worth drawing.
///
/// With focus nodes: every focus node that exists plus everything within
/// `radius` hops of it. Without: the first `max_nodes` nodes. Either way the
/// result holds at most `max_nodes` nodes, in graph order.
pub fn select_subgraph(
    graph: &KnowledgeGraph,
    focus: &[String],
    max_nodes: usize,
    radius: usize,
) -> Result<KnowledgeGraph> {
    if graph.is_empty() {
        anyhow::bail!("The supplied graph is empty, nothing to export.");
    }

    let selected: HashSet<String> = if focus.is_empty() {
        graph.nodes().take(max_nodes).map(|n| n.id().to_string()).collect()
    } else {
        let mut selected = HashSet::new();
        for node in focus.iter().filter(|id| graph.contains(id)) {
            selected.extend(within_radius(graph, node, radius));
        }
        if selected.is_empty() {
            anyhow::bail!("None of the focus nodes exist in the graph.");
        }
        selected
    };

    let limited: HashSet<String> = graph
        .nodes()
        .map(|n| n.id())
        .filter(|id| selected.contains(*id))
        .take(max_nodes)
        .map(str::to_string)
        .collect();

    let subgraph = graph.subgraph(&limited);
    tracing::debug!(
        nodes = subgraph.node_count(),
        edges = subgraph.edge_count(),
        "Selected subgraph"
    );
    Ok(subgraph)
}

/// Breadth-first walk from `start`, at most `radius` hops
fn within_radius(graph: &KnowledgeGraph, start: &str, radius: usize) -> HashSet<String> {
    let mut seen = HashSet::from([start.to_string()]);
    let mut queue = VecDeque::from([(start.to_string(), 0)]);

    while let Some((id, depth)) = queue.pop_front() {
        if depth == radius {
            continue;
        }
        for (neighbor, _) in graph.neighbors(&id) {
            if seen.insert(neighbor.id().to_string()) {
                queue.push_back((neighbor.id().to_string(), depth + 1));
            }
        }
    }

    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::Chunk;

    fn graph() -> KnowledgeGraph {
        let chunks = vec![
            Chunk::new("doc", 0, "Alice met Bob.".to_string()),
            Chunk::new("doc", 1, "Bob met Carol.".to_string()),
            Chunk::new("doc", 2, "Carol met Dave.".to_string()),
            Chunk::new("doc", 3, "Dave met Alice.".to_string()),
        ];
        let entities = extract::extract_entities(&chunks, 2);
        let relations = extract::extract_relations(&chunks, &entities);
        KnowledgeGraph::build(&chunks, &entities, &relations)
    }

    #[test]
    fn test_empty_graph_is_an_error() {
        assert!(select_subgraph(&KnowledgeGraph::new(), &[], 10, 2).is_err());
    }

    #[test]
    fn test_without_focus_takes_first_nodes() {
        let sub = select_subgraph(&graph(), &[], 3, 2).unwrap();

        let ids: Vec<&str> = sub.nodes().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["doc::chunk-0", "doc::chunk-1", "doc::chunk-2"]);
    }

    #[test]
    fn test_focus_radius() {
        let g = graph();

        let only_focus = select_subgraph(&g, &["doc::chunk-0".to_string()], 100, 0).unwrap();
        assert_eq!(only_focus.node_count(), 1);

        let one_hop = select_subgraph(&g, &["doc::chunk-0".to_string()], 100, 1).unwrap();
        let mut ids: Vec<&str> = one_hop.nodes().map(|n| n.id()).collect();
        ids.sort();
        assert_eq!(ids, vec!["alice", "bob", "doc::chunk-0"]);
        // chunk-0 mentions both, and Alice co-occurs with Bob
        assert_eq!(one_hop.edge_count(), 3);
    }

    #[test]
    fn test_unknown_focus_is_an_error() {
        assert!(select_subgraph(&graph(), &["nope".to_string()], 10, 2).is_err());
    }

    #[test]
    fn test_focus_respects_max_nodes() {
        let sub = select_subgraph(&graph(), &["alice".to_string()], 2, 3).unwrap();
        assert_eq!(sub.node_count(), 2);
    }
}
