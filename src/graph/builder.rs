//! Builds the knowledge graph from a `ProjectIndex` snapshot.
//!
//! Files are processed in the snapshot's lexicographic order, so the
//! build is deterministic for a given generation. Cross-file references
//! resolve to authoritative nodes when the target is already known and
//! to placeholder nodes otherwise; placeholders are replaced in place
//! when the authoritative symbol arrives.

use super::{EdgeType, GraphNode, KnowledgeGraph, NodeType};
use crate::types::{FileIndex, ProjectIndex, Symbol};
use serde_json::json;
use std::collections::HashMap;

pub struct GraphBuilder;

impl GraphBuilder {
    /// Build a fresh graph for the given snapshot.
    pub fn build(index: &ProjectIndex) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();

        for (path, file) in &index.files {
            Self::add_file(&mut graph, path, file);
        }
        graph
    }

    fn add_file(graph: &mut KnowledgeGraph, path: &str, file: &FileIndex) {
        let file_id = format!("file:{path}");
        let mut node = GraphNode::new(&file_id, NodeType::File, path);
        node.file_path = Some(path.to_string());
        node.doc = file.description.clone();
        graph.add_node(node);

        // Symbol nodes with defines/contains edges.
        let mut local: HashMap<&str, String> = HashMap::new();
        for sym in &file.symbols {
            let id = symbol_node_id(path, sym);
            let mut node = GraphNode::new(
                &id,
                NodeType::from_symbol_kind(sym.kind),
                &sym.name,
            );
            node.file_path = Some(path.to_string());
            node.line = Some(sym.start_line);
            node.exported = Some(sym.exported);
            node.doc = sym.docstring.clone();
            graph.add_node(node);
            local.entry(sym.name.as_str()).or_insert(id.clone());

            graph.add_edge(&file_id, &id, EdgeType::Defines, serde_json::Value::Null);
        }

        for sym in &file.symbols {
            let id = symbol_node_id(path, sym);
            if let Some(parent) = &sym.parent {
                if let Some(parent_id) = local.get(parent.as_str()) {
                    graph.add_edge(parent_id, &id, EdgeType::Contains, serde_json::Value::Null);
                }
            }
            for base in &sym.extends {
                let target = resolve_or_placeholder(
                    graph,
                    &local,
                    base,
                    NodeType::from_symbol_kind(sym.kind),
                );
                graph.add_edge(&id, &target, EdgeType::Extends, serde_json::Value::Null);
            }
            for iface in &sym.implements {
                let target = resolve_or_placeholder(graph, &local, iface, NodeType::Interface);
                graph.add_edge(&id, &target, EdgeType::Implements, serde_json::Value::Null);
            }
        }

        // Module nodes and imports edges; first seen source wins.
        for import in &file.imports {
            let module_id = format!("module:{}", import.source);
            if graph.node(&module_id).is_none() {
                graph.add_node(GraphNode::new(&module_id, NodeType::Module, &import.source));
            }
            graph.add_edge(
                &file_id,
                &module_id,
                EdgeType::Imports,
                json!({ "line": import.line }),
            );
        }

        // Exports edges for symbols referenced by export records.
        for export in &file.exports {
            for bound in &export.names {
                if let Some(target) = local.get(bound.name.as_str()) {
                    graph.add_edge(
                        &file_id,
                        target,
                        EdgeType::Exports,
                        json!({ "line": export.line }),
                    );
                }
            }
        }

        // Calls edges: caller symbol (or the file) -> callee.
        for call in &file.calls {
            let source = call
                .caller
                .as_deref()
                .and_then(|caller| local.get(caller).cloned())
                .unwrap_or_else(|| file_id.clone());
            let target = resolve_or_placeholder(graph, &local, &call.callee, NodeType::Function);
            graph.add_edge(&source, &target, EdgeType::Calls, json!({ "line": call.line }));
        }
    }
}

fn symbol_node_id(path: &str, sym: &Symbol) -> String {
    format!(
        "{}:{}:{}:{}",
        NodeType::from_symbol_kind(sym.kind).as_str(),
        path,
        sym.name,
        sym.start_line
    )
}

/// Find an authoritative node carrying `name`, preferring same-file
/// symbols; otherwise create (or reuse) a placeholder.
fn resolve_or_placeholder(
    graph: &mut KnowledgeGraph,
    local: &HashMap<&str, String>,
    name: &str,
    placeholder_type: NodeType,
) -> String {
    if let Some(id) = local.get(name) {
        return id.clone();
    }
    if let Some(id) = graph
        .ids_for_name(name)
        .iter()
        .find(|id| graph.node(id).map(|n| !n.is_placeholder()).unwrap_or(false))
    {
        return id.clone();
    }
    let placeholder_id = format!("{}:{name}", placeholder_type.as_str());
    if graph.node(&placeholder_id).is_none() {
        graph.add_node(GraphNode::new(&placeholder_id, placeholder_type, name));
    }
    placeholder_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeFilter, TraversalOptions};
    use crate::types::{
        BoundName, CallReference, Export, Import, ImportKind, SymbolKind,
    };
    use std::path::PathBuf;

    fn file_with(
        path: &str,
        symbols: Vec<Symbol>,
        imports: Vec<Import>,
        exports: Vec<Export>,
        calls: Vec<CallReference>,
    ) -> FileIndex {
        let mut file = FileIndex::empty(path, "hash", "typescript");
        file.symbols = symbols;
        file.imports = imports;
        file.exports = exports;
        file.calls = calls;
        file
    }

    fn project(files: Vec<FileIndex>) -> ProjectIndex {
        let mut index = ProjectIndex::empty("demo", PathBuf::from("."));
        for file in files {
            index.files.insert(file.path.clone(), file);
        }
        index
    }

    fn named_symbol(name: &str, kind: SymbolKind, line: u32) -> Symbol {
        Symbol::new(name, kind).with_span(line, 0, line + 2, 0, 0, 0)
    }

    #[test]
    fn defines_and_contains_edges() {
        let class = named_symbol("AuthService", SymbolKind::Class, 1).with_exported(true);
        let method = named_symbol("login", SymbolKind::Method, 2).with_parent("AuthService");
        let index = project(vec![file_with(
            "src/auth.ts",
            vec![class, method],
            vec![],
            vec![],
            vec![],
        )]);

        let graph = GraphBuilder::build(&index);
        let class_id = "class:src/auth.ts:AuthService:1";
        let method_id = "method:src/auth.ts:login:2";

        let related = graph.find_related(
            "file:src/auth.ts",
            &TraversalOptions {
                max_depth: 1,
                edge_types: Some(vec![EdgeType::Defines]),
                ..Default::default()
            },
        );
        assert_eq!(related.nodes.len(), 2);

        let path = graph.find_path(class_id, method_id, &TraversalOptions::default());
        assert!(path.is_some(), "contains edge must link class to method");
    }

    #[test]
    fn calls_edge_from_caller_symbol() {
        let caller = named_symbol("handler", SymbolKind::Function, 1);
        let callee = named_symbol("validate", SymbolKind::Function, 10);
        let call = CallReference {
            callee: "validate".to_string(),
            caller: Some("handler".to_string()),
            line: 3,
            column: 4,
            is_method_call: false,
            receiver: None,
            arg_count: 1,
        };
        let index = project(vec![file_with(
            "src/h.ts",
            vec![caller, callee],
            vec![],
            vec![],
            vec![call],
        )]);

        let graph = GraphBuilder::build(&index);
        let callers = graph.get_callers("function:src/h.ts:validate:10");
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].name, "handler");
    }

    #[test]
    fn unresolved_callee_gets_placeholder_then_replacement() {
        // File a.ts calls `login` before auth.ts defines it; processing
        // order is lexicographic so a.ts comes first.
        let call = CallReference {
            callee: "login".to_string(),
            caller: None,
            line: 1,
            column: 0,
            is_method_call: false,
            receiver: None,
            arg_count: 0,
        };
        let a = file_with("src/a.ts", vec![], vec![], vec![], vec![call]);
        let auth = file_with(
            "src/auth.ts",
            vec![named_symbol("login", SymbolKind::Function, 3)],
            vec![],
            vec![],
            vec![],
        );
        let index = project(vec![a, auth]);

        let graph = GraphBuilder::build(&index);
        assert!(graph.node("function:login").is_none(), "placeholder replaced");
        let callees = graph.get_callees("file:src/a.ts");
        assert_eq!(callees.len(), 1);
        assert_eq!(callees[0].id, "function:src/auth.ts:login:3");
    }

    #[test]
    fn imports_create_module_nodes_once() {
        let imp = |line| Import {
            source: "./auth".to_string(),
            kind: ImportKind::Named,
            names: vec![BoundName::plain("login")],
            line,
            type_only: false,
        };
        let a = file_with("src/a.ts", vec![], vec![imp(1)], vec![], vec![]);
        let b = file_with("src/b.ts", vec![], vec![imp(2)], vec![], vec![]);
        let graph = GraphBuilder::build(&project(vec![a, b]));

        let modules = graph.find_nodes(&NodeFilter {
            node_type: Some(NodeType::Module),
            ..Default::default()
        });
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "./auth");
    }

    #[test]
    fn exports_edge_for_export_records() {
        let sym = named_symbol("login", SymbolKind::Function, 1).with_exported(true);
        let export = Export {
            source: None,
            kind: ImportKind::Named,
            names: vec![BoundName::plain("login")],
            line: 1,
            type_only: false,
        };
        let index = project(vec![file_with(
            "src/auth.ts",
            vec![sym],
            vec![],
            vec![export],
            vec![],
        )]);
        let graph = GraphBuilder::build(&index);

        let related = graph.find_related(
            "file:src/auth.ts",
            &TraversalOptions {
                max_depth: 1,
                edge_types: Some(vec![EdgeType::Exports]),
                ..Default::default()
            },
        );
        assert_eq!(related.nodes.len(), 1);
        assert_eq!(related.nodes[0].name, "login");
    }

    #[test]
    fn extends_across_files_resolves_to_authoritative_node() {
        let animal = file_with(
            "src/animal.ts",
            vec![named_symbol("Animal", SymbolKind::Class, 1)],
            vec![],
            vec![],
            vec![],
        );
        let mut dog_sym = named_symbol("Dog", SymbolKind::Class, 1);
        dog_sym.extends = vec!["Animal".to_string()];
        let dog = file_with("src/dog.ts", vec![dog_sym], vec![], vec![], vec![]);

        let graph = GraphBuilder::build(&project(vec![animal, dog]));
        let chain = graph.get_inheritance_chain("class:src/dog.ts:Dog:1", true);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].id, "class:src/animal.ts:Animal:1");
    }
}
