use anyhow::{Context, Result};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{EdgeReference, NodeIndex, UnGraph};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use index::{GraphEdge, GraphNode, KnowledgeGraph};

const CHUNK_COLOR: &str = "#4F6BED";
const ENTITY_COLOR: &str = "#E37B40";
const MENTIONS_COLOR: &str = "#94A3B8";
const CO_OCCURS_COLOR: &str = "#F59E0B";

/// GraphML key declarations: (id, domain, attribute name, attribute type)
const GRAPHML_KEYS: &[(&str, &str, &str, &str)] = &[
    ("d0", "node", "type", "string"),
    ("d1", "node", "doc_id", "string"),
    ("d2", "node", "text", "string"),
    ("d3", "node", "label", "string"),
    ("d4", "node", "frequency", "long"),
    ("e0", "edge", "type", "string"),
    ("e1", "edge", "weight", "double"),
    ("e2", "edge", "description", "string"),
];

/// Serialize the whole graph as GraphML
pub fn write_graphml<W: Write>(graph: &KnowledgeGraph, mut out: W) -> Result<()> {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns">"#)?;
    for (id, domain, name, ty) in GRAPHML_KEYS {
        writeln!(
            out,
            r#"  <key id="{}" for="{}" attr.name="{}" attr.type="{}"/>"#,
            id, domain, name, ty
        )?;
    }
    writeln!(out, r#"  <graph edgedefault="undirected">"#)?;

    for node in graph.nodes() {
        writeln!(out, r#"    <node id="{}">"#, escape_xml(node.id()))?;
        writeln!(out, "      {}", data("d0", node.kind().as_str()))?;
        match node {
            GraphNode::Chunk(chunk) => {
                writeln!(out, "      {}", data("d1", &chunk.doc_id))?;
                writeln!(out, "      {}", data("d2", &chunk.text))?;
            }
            GraphNode::Entity(entity) => {
                writeln!(out, "      {}", data("d3", &entity.label))?;
                writeln!(out, "      {}", data("d4", &entity.frequency.to_string()))?;
            }
        }
        writeln!(out, "    </node>")?;
    }

    for (source, target, edge) in graph.edges() {
        writeln!(
            out,
            r#"    <edge source="{}" target="{}">"#,
            escape_xml(source),
            escape_xml(target)
        )?;
        writeln!(out, "      {}", data("e0", edge.kind().as_str()))?;
        writeln!(out, "      {}", data("e1", &edge.weight().to_string()))?;
        if let GraphEdge::CoOccurs { description, .. } = edge {
            writeln!(out, "      {}", data("e2", description))?;
        }
        writeln!(out, "    </edge>")?;
    }

    writeln!(out, "  </graph>")?;
    writeln!(out, "</graphml>")?;
    out.flush()?;
    Ok(())
}

pub fn export_graphml(graph: &KnowledgeGraph, path: &Path) -> Result<()> {
    let file = File::create(path).context(format!("Failed to create {:?}", path))?;
    write_graphml(graph, BufWriter::new(file))?;
    tracing::info!(path = %path.display(), nodes = graph.node_count(), "Exported GraphML");
    Ok(())
}

/// Render the graph as Graphviz DOT.
///
/// Focus nodes always carry a label and a heavier border. `with_labels`
/// adds labels to entity nodes; other chunk nodes stay unlabelled.
pub fn to_dot(graph: &KnowledgeGraph, focus: &[String], with_labels: bool) -> String {
    let focus: HashSet<&str> = focus.iter().map(String::as_str).collect();

    let edge_attrs = |_: &UnGraph<GraphNode, GraphEdge>, edge: EdgeReference<'_, GraphEdge>| match edge.weight() {
        GraphEdge::Mentions => format!("color=\"{}\" ", MENTIONS_COLOR),
        GraphEdge::CoOccurs { weight, .. } => {
            format!("color=\"{}\" penwidth={:.1} ", CO_OCCURS_COLOR, 1.0 + weight.ln_1p())
        }
    };

    let node_attrs = |_: &UnGraph<GraphNode, GraphEdge>, (_, node): (NodeIndex, &GraphNode)| {
        let is_focus = focus.contains(node.id());
        let (color, shape) = match node {
            GraphNode::Chunk(_) => (CHUNK_COLOR, "box"),
            GraphNode::Entity(_) => (ENTITY_COLOR, "ellipse"),
        };
        let labelled = is_focus || (with_labels && matches!(node, GraphNode::Entity(_)));
        let label = if labelled {
            display_label(node)
        } else {
            String::new()
        };
        format!(
            "label=\"{}\" shape={} style=filled fillcolor=\"{}\" penwidth={} ",
            escape_dot(&label),
            shape,
            color,
            if is_focus { "2.6" } else { "1.0" }
        )
    };

    let dot = Dot::with_attr_getters(
        graph.as_petgraph(),
        &[Config::NodeNoLabel, Config::EdgeNoLabel],
        &edge_attrs,
        &node_attrs,
    );
    dot.to_string()
}

/// Entity label, or the file name of a chunk's document
fn display_label(node: &GraphNode) -> String {
    match node {
        GraphNode::Entity(entity) => entity.label.clone(),
        GraphNode::Chunk(chunk) => Path::new(&chunk.doc_id)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| chunk.doc_id.clone()),
    }
}

fn data(key: &str, value: &str) -> String {
    format!(r#"<data key="{}">{}</data>"#, key, escape_xml(value))
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_dot(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::Chunk;

    fn graph() -> KnowledgeGraph {
        let chunks = vec![
            Chunk::new("corpus/a.txt", 0, "Alice met Bob in Paris & <Rome>.".to_string()),
            Chunk::new("corpus/b.txt", 0, "Bob travels to Paris often.".to_string()),
        ];
        let entities = extract::extract_entities(&chunks, 2);
        let relations = extract::extract_relations(&chunks, &entities);
        KnowledgeGraph::build(&chunks, &entities, &relations)
    }

    #[test]
    fn test_graphml_contains_nodes_and_edges() {
        let mut out = Vec::new();
        write_graphml(&graph(), &mut out).unwrap();
        let xml = String::from_utf8(out).unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(r#"<key id="d4" for="node" attr.name="frequency" attr.type="long"/>"#));
        assert!(xml.contains(r#"<node id="corpus/a.txt::chunk-0">"#));
        assert!(xml.contains(r#"<data key="d3">Paris</data>"#));
        assert!(xml.contains(r#"<edge source="bob" target="paris">"#));
        assert!(xml.contains(r#"<data key="e1">2</data>"#));
        assert_eq!(xml.matches("<node ").count(), 4);
        // mentions edges carry their fixed weight too
        assert_eq!(xml.matches(r#"<data key="e1">1</data>"#).count(), 4);
        assert_eq!(xml.matches(r#"<data key="e2">"#).count(), 1);
        assert_eq!(xml.matches("<edge ").count(), 5);
    }

    #[test]
    fn test_graphml_escapes_text() {
        let mut out = Vec::new();
        write_graphml(&graph(), &mut out).unwrap();
        let xml = String::from_utf8(out).unwrap();

        assert!(xml.contains("Paris &amp; &lt;Rome&gt;."));
        assert!(!xml.contains("<Rome>"));
    }

    #[test]
    fn test_dot_colors_and_labels() {
        let dot = to_dot(&graph(), &[], true);

        assert!(dot.starts_with("graph {"));
        assert!(dot.contains(CHUNK_COLOR));
        assert!(dot.contains(ENTITY_COLOR));
        assert!(dot.contains(MENTIONS_COLOR));
        assert!(dot.contains(CO_OCCURS_COLOR));
        assert!(dot.contains("label=\"Paris\""));
        assert!(dot.contains("label=\"Bob\""));
        assert!(!dot.contains("label=\"a.txt\""));
        assert!(!dot.contains("penwidth=2.6"));
    }

    #[test]
    fn test_dot_labels_focus_chunks_only() {
        let focus = vec!["corpus/a.txt::chunk-0".to_string()];
        let dot = to_dot(&graph(), &focus, true);

        assert!(dot.contains("label=\"a.txt\""));
        assert!(!dot.contains("label=\"b.txt\""));
        assert_eq!(dot.matches("penwidth=2.6").count(), 1);
    }

    #[test]
    fn test_dot_focus_nodes_always_labelled() {
        let dot = to_dot(&graph(), &["bob".to_string()], false);

        assert!(dot.contains("label=\"Bob\""));
        assert!(!dot.contains("label=\"Paris\""));
        assert_eq!(dot.matches("penwidth=2.6").count(), 1);
    }

    #[test]
    fn test_export_graphml_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.graphml");
        export_graphml(&graph(), &path).unwrap();

        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.trim_end().ends_with("</graphml>"));
    }
}
