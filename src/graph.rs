use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::model::{FileStructure, Symbol};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum NodeContent {
    File(FileStructure),
    Symbol(Symbol),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub content: Option<NodeContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges.iter().any(|e| e.source == source && e.target == target)
    }
}

/// Append-only graph with id-deduplicated nodes and pair-deduplicated edges.
///
/// Nodes keep their first insertion position. A node first created without
/// content (an edge endpoint, an imported module) is filled in when the same
/// id is added later with content; existing content is never replaced.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    index: HashMap<String, usize>,
    edge_set: HashSet<(String, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: &str, content: Option<NodeContent>) {
        if let Some(&pos) = self.index.get(id) {
            let node = &mut self.nodes[pos];
            if node.content.is_none() {
                node.content = content;
            }
            return;
        }
        self.index.insert(id.to_string(), self.nodes.len());
        self.nodes.push(GraphNode {
            id: id.to_string(),
            content,
        });
    }

    /// Add `source -> target`, creating either endpoint if it does not exist yet.
    pub fn add_edge(&mut self, source: &str, target: &str) {
        self.add_node(source, None);
        self.add_node(target, None);
        if self.edge_set.insert((source.to_string(), target.to_string())) {
            self.edges.push(GraphEdge {
                source: source.to_string(),
                target: target.to_string(),
            });
        }
    }

    /// Add one file: its node, an edge from every non-standard import, and
    /// its symbol tree. Failed files contribute only the file node.
    pub fn add_file(&mut self, structure: &FileStructure) {
        let path = structure.path.as_str();
        self.add_node(path, Some(NodeContent::File(structure.clone())));
        if structure.is_failed() {
            return;
        }

        for record in structure.imports.non_standard() {
            self.add_edge(record.module_id(), path);
        }

        for symbol in structure.symbols.as_slice() {
            let id = format!("{path}:{}", symbol.name);
            self.add_symbol(path, &id, symbol);
        }
    }

    fn add_symbol(&mut self, parent: &str, id: &str, symbol: &Symbol) {
        self.add_node(id, Some(NodeContent::Symbol(symbol.clone())));
        self.add_edge(parent, id);
        for child in &symbol.children {
            let child_id = format!("{id}.{}", child.name);
            self.add_symbol(id, &child_id, child);
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Snapshot of the current graph.
    pub fn graph(&self) -> Graph {
        Graph {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn into_graph(self) -> Graph {
        Graph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}
