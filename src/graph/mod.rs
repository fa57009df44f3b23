//! Typed knowledge graph over symbols, files, and modules.
//!
//! The graph references everything by string id, never by object
//! pointer, so it can be rebuilt from any `ProjectIndex` generation and
//! serialized as plain `{nodes, edges}` JSON.
//!
//! Node id scheme:
//! - `file:<path>` for files
//! - `<type>:<path>:<name>:<line>` for located symbols
//! - `<type>:<name>` for placeholders referenced before definition
//!
//! A placeholder is replaced in place (edges re-pointed) when the
//! authoritative symbol arrives.

mod builder;

pub use builder::GraphBuilder;

use crate::types::SymbolKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Node types mirror symbol kinds plus `file` and `module`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    File,
    Module,
    Function,
    Method,
    Class,
    Interface,
    #[serde(rename = "type")]
    TypeAlias,
    Enum,
    Constant,
    Variable,
    Property,
    Namespace,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::File => "file",
            NodeType::Module => "module",
            NodeType::Function => "function",
            NodeType::Method => "method",
            NodeType::Class => "class",
            NodeType::Interface => "interface",
            NodeType::TypeAlias => "type",
            NodeType::Enum => "enum",
            NodeType::Constant => "constant",
            NodeType::Variable => "variable",
            NodeType::Property => "property",
            NodeType::Namespace => "namespace",
        }
    }

    pub fn from_symbol_kind(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Function => NodeType::Function,
            SymbolKind::Method => NodeType::Method,
            SymbolKind::Class => NodeType::Class,
            SymbolKind::Interface => NodeType::Interface,
            SymbolKind::TypeAlias => NodeType::TypeAlias,
            SymbolKind::Enum => NodeType::Enum,
            SymbolKind::Constant => NodeType::Constant,
            SymbolKind::Variable => NodeType::Variable,
            SymbolKind::Property => NodeType::Property,
            SymbolKind::Module => NodeType::Module,
            SymbolKind::Namespace => NodeType::Namespace,
        }
    }
}

/// Relationship types carried by edges. Multi-edges are allowed: the
/// same node pair may be connected by several types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Defines,
    Contains,
    Extends,
    Implements,
    Calls,
    Imports,
    Exports,
    References,
    Uses,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, node_type: NodeType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            file_path: None,
            line: None,
            exported: None,
            doc: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// True for nodes of the `<type>:<name>` placeholder scheme.
    pub fn is_placeholder(&self) -> bool {
        self.file_path.is_none() && self.id == format!("{}:{}", self.node_type.as_str(), self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

/// Direction of traversal relative to edge orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
    #[default]
    Both,
}

/// Filter for [`KnowledgeGraph::find_nodes`].
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub node_type: Option<NodeType>,
    /// Case-insensitive substring match on the node name.
    pub name: Option<String>,
    /// Regex match on the node name; combined with `name` as AND.
    pub name_regex: Option<String>,
    /// Substring match on the file path.
    pub file_path: Option<String>,
    pub exported: Option<bool>,
}

/// Options for [`KnowledgeGraph::find_related`] / `find_path`.
#[derive(Debug, Clone)]
pub struct TraversalOptions {
    pub max_depth: usize,
    pub edge_types: Option<Vec<EdgeType>>,
    pub direction: Direction,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            edge_types: None,
            direction: Direction::Both,
        }
    }
}

/// Result of a bounded BFS from one node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelatedNodes {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// One path (list of node ids, starting at the origin) per reached
    /// node.
    pub paths: Vec<Vec<String>>,
}

/// Serialized form: plain node and edge lists.
#[derive(Debug, Serialize, Deserialize)]
struct GraphJson {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

/// The typed multigraph.
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    nodes: HashMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
    /// Symbol name -> node ids carrying that name.
    by_name: HashMap<String, Vec<String>>,
    next_edge: u64,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Add a node. When the node is authoritative (has a file path) and
    /// a placeholder with the same name exists, the placeholder is
    /// replaced: its edges are re-pointed at the new node.
    pub fn add_node(&mut self, node: GraphNode) {
        if node.file_path.is_some() {
            let placeholder_ids: Vec<String> = self
                .by_name
                .get(&node.name)
                .map(|ids| {
                    ids.iter()
                        .filter(|id| {
                            self.nodes
                                .get(*id)
                                .map(|n| n.is_placeholder())
                                .unwrap_or(false)
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            for pid in placeholder_ids {
                self.replace_node_id(&pid, &node.id);
            }
        }

        self.by_name
            .entry(node.name.clone())
            .or_default()
            .push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    /// Re-point every edge touching `old` at `new` and drop `old`.
    fn replace_node_id(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        for edge in self.edges.iter_mut() {
            if edge.source == old {
                edge.source = new.to_string();
            }
            if edge.target == old {
                edge.target = new.to_string();
            }
        }
        if let Some(list) = self.outgoing.remove(old) {
            self.outgoing.entry(new.to_string()).or_default().extend(list);
        }
        if let Some(list) = self.incoming.remove(old) {
            self.incoming.entry(new.to_string()).or_default().extend(list);
        }
        if let Some(node) = self.nodes.remove(old) {
            if let Some(ids) = self.by_name.get_mut(&node.name) {
                ids.retain(|id| id != old);
            }
        }
    }

    /// Add an edge. Multi-edges are allowed; missing endpoints become
    /// placeholder nodes only when created through [`GraphBuilder`];
    /// here the edge is stored as-is.
    pub fn add_edge(&mut self, source: &str, target: &str, edge_type: EdgeType, metadata: serde_json::Value) {
        let id = format!("e{}", self.next_edge);
        self.next_edge += 1;
        let idx = self.edges.len();
        self.edges.push(GraphEdge {
            id,
            source: source.to_string(),
            target: target.to_string(),
            edge_type,
            metadata,
        });
        self.outgoing.entry(source.to_string()).or_default().push(idx);
        self.incoming.entry(target.to_string()).or_default().push(idx);
    }

    /// Node ids registered under a symbol name.
    pub fn ids_for_name(&self, name: &str) -> &[String] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Filter nodes by type, name (substring and/or regex), path, and
    /// exported flag.
    pub fn find_nodes(&self, filter: &NodeFilter) -> Vec<&GraphNode> {
        let regex = filter
            .name_regex
            .as_deref()
            .and_then(|pattern| Regex::new(pattern).ok());
        let needle = filter.name.as_deref().map(str::to_lowercase);

        let mut found: Vec<&GraphNode> = self
            .nodes
            .values()
            .filter(|n| {
                filter.node_type.map(|t| n.node_type == t).unwrap_or(true)
                    && needle
                        .as_deref()
                        .map(|q| n.name.to_lowercase().contains(q))
                        .unwrap_or(true)
                    && regex.as_ref().map(|r| r.is_match(&n.name)).unwrap_or(true)
                    && filter
                        .file_path
                        .as_deref()
                        .map(|p| n.file_path.as_deref().map(|f| f.contains(p)).unwrap_or(false))
                        .unwrap_or(true)
                    && filter
                        .exported
                        .map(|e| n.exported == Some(e))
                        .unwrap_or(true)
            })
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    fn edge_indices(&self, id: &str, direction: Direction) -> Vec<usize> {
        let mut out = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            if let Some(list) = self.outgoing.get(id) {
                out.extend(list.iter().copied());
            }
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            if let Some(list) = self.incoming.get(id) {
                out.extend(list.iter().copied());
            }
        }
        out
    }

    /// Bounded BFS from `node_id`, depth measured in edges.
    pub fn find_related(&self, node_id: &str, options: &TraversalOptions) -> RelatedNodes {
        let mut result = RelatedNodes::default();
        if !self.nodes.contains_key(node_id) {
            return result;
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_edges: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<(String, usize, Vec<String>)> = VecDeque::new();

        visited.insert(node_id.to_string());
        queue.push_back((node_id.to_string(), 0, vec![node_id.to_string()]));

        while let Some((current, depth, path)) = queue.pop_front() {
            if depth >= options.max_depth {
                continue;
            }
            for idx in self.edge_indices(&current, options.direction) {
                let edge = &self.edges[idx];
                if let Some(types) = &options.edge_types {
                    if !types.contains(&edge.edge_type) {
                        continue;
                    }
                }
                let next = if edge.source == current {
                    &edge.target
                } else {
                    &edge.source
                };
                if seen_edges.insert(idx) {
                    result.edges.push(edge.clone());
                }
                if visited.insert(next.clone()) {
                    if let Some(node) = self.nodes.get(next) {
                        let mut next_path = path.clone();
                        next_path.push(next.clone());
                        result.nodes.push(node.clone());
                        result.paths.push(next_path.clone());
                        queue.push_back((next.clone(), depth + 1, next_path));
                    }
                }
            }
        }

        // nodes[i] and paths[i] stay aligned; BFS order is already
        // deterministic for a given build.
        result
    }

    /// Shortest path between two nodes via BFS, or `None` when no path
    /// exists within `max_depth` edges.
    pub fn find_path(
        &self,
        source: &str,
        target: &str,
        options: &TraversalOptions,
    ) -> Option<Vec<String>> {
        if !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
            return None;
        }
        if source == target {
            return Some(vec![source.to_string()]);
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, usize, Vec<String>)> = VecDeque::new();
        visited.insert(source.to_string());
        queue.push_back((source.to_string(), 0, vec![source.to_string()]));

        while let Some((current, depth, path)) = queue.pop_front() {
            if depth >= options.max_depth {
                continue;
            }
            for idx in self.edge_indices(&current, options.direction) {
                let edge = &self.edges[idx];
                if let Some(types) = &options.edge_types {
                    if !types.contains(&edge.edge_type) {
                        continue;
                    }
                }
                let next = if edge.source == current {
                    &edge.target
                } else {
                    &edge.source
                };
                if !visited.insert(next.clone()) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(next.clone());
                if next == target {
                    return Some(next_path);
                }
                queue.push_back((next.clone(), depth + 1, next_path));
            }
        }
        None
    }

    /// One-hop callers: sources of incoming `calls` edges.
    pub fn get_callers(&self, node_id: &str) -> Vec<&GraphNode> {
        let mut out: Vec<&GraphNode> = self
            .edge_indices(node_id, Direction::Incoming)
            .into_iter()
            .filter(|&idx| self.edges[idx].edge_type == EdgeType::Calls)
            .filter_map(|idx| self.nodes.get(&self.edges[idx].source))
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out.dedup_by(|a, b| a.id == b.id);
        out
    }

    /// One-hop callees: targets of outgoing `calls` edges.
    pub fn get_callees(&self, node_id: &str) -> Vec<&GraphNode> {
        let mut out: Vec<&GraphNode> = self
            .edge_indices(node_id, Direction::Outgoing)
            .into_iter()
            .filter(|&idx| self.edges[idx].edge_type == EdgeType::Calls)
            .filter_map(|idx| self.nodes.get(&self.edges[idx].target))
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out.dedup_by(|a, b| a.id == b.id);
        out
    }

    /// Walk `extends`/`implements` edges. `up` follows outgoing edges
    /// toward ancestors, `down` incoming edges toward descendants.
    /// Cycles are a source bug: the walk records them and stops.
    pub fn get_inheritance_chain(&self, node_id: &str, up: bool) -> Vec<&GraphNode> {
        let direction = if up {
            Direction::Outgoing
        } else {
            Direction::Incoming
        };
        let mut chain = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(node_id.to_string());
        let mut frontier = vec![node_id.to_string()];

        while let Some(current) = frontier.pop() {
            let mut next_ids: Vec<String> = self
                .edge_indices(&current, direction)
                .into_iter()
                .filter(|&idx| {
                    matches!(
                        self.edges[idx].edge_type,
                        EdgeType::Extends | EdgeType::Implements
                    )
                })
                .map(|idx| {
                    let edge = &self.edges[idx];
                    if up { edge.target.clone() } else { edge.source.clone() }
                })
                .collect();
            next_ids.sort();
            next_ids.dedup();

            for next in next_ids {
                if !visited.insert(next.clone()) {
                    tracing::warn!(node = %next, "inheritance cycle detected; stopping walk");
                    continue;
                }
                if let Some(node) = self.nodes.get(&next) {
                    chain.push(node);
                    frontier.push(next);
                }
            }
        }
        chain
    }

    /// Serialize as `{nodes, edges}`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut nodes: Vec<&GraphNode> = self.nodes.values().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        serde_json::json!({
            "nodes": nodes,
            "edges": self.edges,
        })
    }

    /// Rebuild from the `to_json` shape.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let parsed: GraphJson = serde_json::from_value(value)?;
        let mut graph = Self::new();
        for node in parsed.nodes {
            // Raw insert: replacement already happened before export.
            graph
                .by_name
                .entry(node.name.clone())
                .or_default()
                .push(node.id.clone());
            graph.nodes.insert(node.id.clone(), node);
        }
        for edge in parsed.edges {
            let idx = graph.edges.len();
            graph
                .outgoing
                .entry(edge.source.clone())
                .or_default()
                .push(idx);
            graph
                .incoming
                .entry(edge.target.clone())
                .or_default()
                .push(idx);
            graph.next_edge = graph.next_edge.max(
                edge.id
                    .strip_prefix('e')
                    .and_then(|n| n.parse::<u64>().ok())
                    .map(|n| n + 1)
                    .unwrap_or(0),
            );
            graph.edges.push(edge);
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol_node(id: &str, node_type: NodeType, name: &str, path: &str, line: u32) -> GraphNode {
        let mut node = GraphNode::new(id, node_type, name);
        node.file_path = Some(path.to_string());
        node.line = Some(line);
        node
    }

    fn inheritance_fixture() -> (KnowledgeGraph, String, String, String) {
        let mut graph = KnowledgeGraph::new();
        let animal = "class:src/zoo.ts:Animal:1".to_string();
        let mammal = "class:src/zoo.ts:Mammal:5".to_string();
        let dog = "class:src/zoo.ts:Dog:9".to_string();
        graph.add_node(symbol_node(&animal, NodeType::Class, "Animal", "src/zoo.ts", 1));
        graph.add_node(symbol_node(&mammal, NodeType::Class, "Mammal", "src/zoo.ts", 5));
        graph.add_node(symbol_node(&dog, NodeType::Class, "Dog", "src/zoo.ts", 9));
        graph.add_edge(&mammal, &animal, EdgeType::Extends, serde_json::Value::Null);
        graph.add_edge(&dog, &mammal, EdgeType::Extends, serde_json::Value::Null);
        (graph, dog, mammal, animal)
    }

    #[test]
    fn inheritance_chain_walks_up_in_order() {
        let (graph, dog, mammal, animal) = inheritance_fixture();
        let chain = graph.get_inheritance_chain(&dog, true);
        let ids: Vec<&str> = chain.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec![mammal.as_str(), animal.as_str()]);
    }

    #[test]
    fn find_path_respects_max_depth() {
        let (graph, dog, mammal, animal) = inheritance_fixture();

        let shallow = graph.find_path(&dog, &animal, &TraversalOptions {
            max_depth: 1,
            ..Default::default()
        });
        assert_eq!(shallow, None);

        let deep = graph.find_path(&dog, &animal, &TraversalOptions {
            max_depth: 2,
            ..Default::default()
        });
        assert_eq!(deep, Some(vec![dog, mammal, animal]));
    }

    #[test]
    fn find_related_is_depth_bounded() {
        let (graph, dog, _, animal) = inheritance_fixture();
        let related = graph.find_related(&dog, &TraversalOptions {
            max_depth: 1,
            ..Default::default()
        });
        assert_eq!(related.nodes.len(), 1);
        assert!(related.nodes.iter().all(|n| n.id != animal));
    }

    #[test]
    fn callers_and_callees_filter_by_edge_type() {
        let mut graph = KnowledgeGraph::new();
        let a = symbol_node("function:a.ts:alpha:1", NodeType::Function, "alpha", "a.ts", 1);
        let b = symbol_node("function:a.ts:beta:5", NodeType::Function, "beta", "a.ts", 5);
        graph.add_node(a.clone());
        graph.add_node(b.clone());
        graph.add_edge(&a.id, &b.id, EdgeType::Calls, serde_json::Value::Null);
        graph.add_edge(&a.id, &b.id, EdgeType::Uses, serde_json::Value::Null);

        let callers = graph.get_callers(&b.id);
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].name, "alpha");
        assert_eq!(graph.get_callees(&a.id).len(), 1);
        assert!(graph.get_callers(&a.id).is_empty());
    }

    #[test]
    fn placeholder_replaced_preserves_reachability() {
        let mut graph = KnowledgeGraph::new();
        let file = GraphNode::new("file:src/a.ts", NodeType::File, "src/a.ts");
        graph.add_node(file);
        // A call to a not-yet-defined symbol creates a placeholder.
        graph.add_node(GraphNode::new("function:login", NodeType::Function, "login"));
        graph.add_edge("file:src/a.ts", "function:login", EdgeType::Calls, serde_json::Value::Null);

        let before = graph.find_path("file:src/a.ts", "function:login", &TraversalOptions::default());
        assert!(before.is_some());

        // The authoritative definition arrives.
        let authoritative = symbol_node(
            "function:src/auth.ts:login:3",
            NodeType::Function,
            "login",
            "src/auth.ts",
            3,
        );
        graph.add_node(authoritative);

        assert!(graph.node("function:login").is_none(), "placeholder must be gone");
        let after = graph.find_path(
            "file:src/a.ts",
            "function:src/auth.ts:login:3",
            &TraversalOptions::default(),
        );
        assert!(after.is_some(), "reachability must survive replacement");
    }

    #[test]
    fn multi_edges_are_allowed() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(GraphNode::new("a", NodeType::Function, "a"));
        graph.add_node(GraphNode::new("b", NodeType::Function, "b"));
        graph.add_edge("a", "b", EdgeType::Calls, serde_json::Value::Null);
        graph.add_edge("a", "b", EdgeType::Calls, serde_json::Value::Null);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn find_nodes_by_filters() {
        let (graph, _, _, _) = inheritance_fixture();
        let by_name = graph.find_nodes(&NodeFilter {
            name: Some("mam".to_string()),
            ..Default::default()
        });
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "Mammal");

        let by_regex = graph.find_nodes(&NodeFilter {
            name_regex: Some("^(Dog|Animal)$".to_string()),
            ..Default::default()
        });
        assert_eq!(by_regex.len(), 2);

        let by_type = graph.find_nodes(&NodeFilter {
            node_type: Some(NodeType::Class),
            ..Default::default()
        });
        assert_eq!(by_type.len(), 3);
    }

    #[test]
    fn json_roundtrip_preserves_traversal() {
        let (graph, dog, _, animal) = inheritance_fixture();
        let restored = KnowledgeGraph::from_json(graph.to_json()).unwrap();
        assert_eq!(restored.node_count(), graph.node_count());
        assert_eq!(restored.edge_count(), graph.edge_count());
        let path = restored.find_path(&dog, &animal, &TraversalOptions {
            max_depth: 3,
            ..Default::default()
        });
        assert!(path.is_some());
    }

    #[test]
    fn inheritance_cycle_is_recorded_not_looped() {
        let mut graph = KnowledgeGraph::new();
        let a = symbol_node("class:x.ts:A:1", NodeType::Class, "A", "x.ts", 1);
        let b = symbol_node("class:x.ts:B:2", NodeType::Class, "B", "x.ts", 2);
        graph.add_node(a.clone());
        graph.add_node(b.clone());
        graph.add_edge(&a.id, &b.id, EdgeType::Extends, serde_json::Value::Null);
        graph.add_edge(&b.id, &a.id, EdgeType::Extends, serde_json::Value::Null);

        // Must terminate; the chain contains each node at most once.
        let chain = graph.get_inheritance_chain(&a.id, true);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].name, "B");
    }
}
