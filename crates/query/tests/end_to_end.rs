/// End-to-end: files on disk -> chunks -> entities/relations -> graph + vectors -> query
use index::{EdgeKind, GraphEdge, NodeKind};
use query::{GraphRagPipeline, PipelineConfig, EXPANSION_DECAY};
use std::fs;
use tempfile::tempdir;

async fn two_document_pipeline() -> (tempfile::TempDir, GraphRagPipeline) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "Alice met Bob in Paris.").unwrap();
    fs::write(dir.path().join("b.txt"), "Bob travels to Paris often.").unwrap();

    let pipeline = GraphRagPipeline::from_path(dir.path(), &PipelineConfig::default())
        .await
        .unwrap();
    (dir, pipeline)
}

fn chunk_id(dir: &tempfile::TempDir, file: &str) -> String {
    format!("{}::chunk-0", dir.path().join(file).to_string_lossy())
}

#[tokio::test]
async fn test_entities_and_relations() {
    let (_dir, pipeline) = two_document_pipeline().await;
    let artifacts = pipeline.artifacts();

    let ids: Vec<&str> = artifacts.entities.iter().map(|e| e.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["bob", "paris"], "Alice appears once and is filtered");

    assert_eq!(artifacts.relations.len(), 1);
    let relation = &artifacts.relations[0];
    assert_eq!((relation.head_id.as_str(), relation.tail_id.as_str()), ("bob", "paris"));
    assert_eq!(relation.weight, 2.0);

    match pipeline.graph().edge("bob", "paris") {
        Some(GraphEdge::CoOccurs { weight, .. }) => assert_eq!(*weight, 2.0),
        other => panic!("expected co_occurs edge, got {:?}", other),
    }
}

#[tokio::test]
async fn test_graph_shape() {
    let (_dir, pipeline) = two_document_pipeline().await;
    let graph = pipeline.graph();

    assert_eq!(graph.node_count(), 2 + 2);
    let chunk_nodes = graph.nodes().filter(|n| n.kind() == NodeKind::Chunk).count();
    assert_eq!(chunk_nodes, 2);
    let mentions = graph.edges().filter(|(_, _, e)| e.kind() == EdgeKind::Mentions).count();
    assert_eq!(mentions, 4);
}

#[tokio::test]
async fn test_query_ranks_and_expands() {
    let (dir, pipeline) = two_document_pipeline().await;
    let first = chunk_id(&dir, "a.txt");
    let second = chunk_id(&dir, "b.txt");

    let scored = pipeline
        .retriever()
        .chunk_embeddings()
        .rank(&pipeline.retriever().embedder().transform("Where did Bob go?").unwrap());
    let score_of = |id: &str| scored.iter().find(|(k, _)| *k == id).unwrap().1;
    assert!(score_of(second.as_str()) >= score_of(first.as_str()) - 1e-6);

    let results = pipeline.retrieve("Where did Bob go?", 1).unwrap();
    assert_eq!(results.len(), 2);

    let seed = &results[0];
    assert_eq!(seed.trail.len(), 1);

    let expansion = &results[1];
    assert_eq!(expansion.trail.len(), 3);
    assert_eq!(expansion.trail[0], seed.chunk_id);
    assert!(["bob", "paris"].contains(&expansion.trail[1].as_str()));
    assert_ne!(expansion.chunk_id, seed.chunk_id);
    assert!([first.as_str(), second.as_str()].contains(&expansion.chunk_id.as_str()));
    assert!((expansion.score - seed.score * EXPANSION_DECAY).abs() < 1e-6);
}

#[tokio::test]
async fn test_query_is_deterministic() {
    let (_dir, pipeline) = two_document_pipeline().await;

    let a = pipeline.retrieve("Where did Bob go?", 2).unwrap();
    let b = pipeline.retrieve("Where did Bob go?", 2).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_empty_directory_builds_empty_pipeline() {
    let dir = tempdir().unwrap();
    let pipeline = GraphRagPipeline::from_path(dir.path(), &PipelineConfig::default())
        .await
        .unwrap();

    assert_eq!(pipeline.graph().node_count(), 0);
    assert!(pipeline.retrieve("anything", 3).unwrap().is_empty());
    assert!(pipeline.query("anything", 3).unwrap().contains("No relevant information found."));
}
