//! Symbol, import, and call extraction for Go trees.
//!
//! Go's export rule is lexical: a name is public iff its first rune is
//! uppercase. Methods hang off their receiver's base type.

use super::{depth_ok, node_span, node_text};
use crate::parsing::parser::Extraction;
use crate::types::{
    BoundName, CallReference, Import, ImportKind, Symbol, SymbolKind, Visibility,
};
use tree_sitter::Node;

pub(super) fn extract(root: Node, src: &str) -> Extraction {
    let mut walker = Walker {
        src,
        out: Extraction::default(),
        caller_stack: Vec::new(),
    };
    walker.visit(root, 0);
    walker.out
}

struct Walker<'a> {
    src: &'a str,
    out: Extraction,
    caller_stack: Vec<String>,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, node: Node, depth: usize) {
        if !depth_ok(depth, node) {
            return;
        }

        match node.kind() {
            "import_declaration" => self.handle_imports(node),
            "function_declaration" => self.handle_function(node, depth),
            "method_declaration" => self.handle_method(node, depth),
            "type_declaration" => self.handle_types(node, depth),
            "const_declaration" => self.handle_values(node, SymbolKind::Constant),
            "var_declaration" => self.handle_values(node, SymbolKind::Variable),
            "call_expression" => {
                self.handle_call(node);
                self.visit_children(node, depth);
            }
            _ => self.visit_children(node, depth),
        }
    }

    fn visit_children(&mut self, node: Node, depth: usize) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, depth + 1);
        }
    }

    fn handle_imports(&mut self, node: Node) {
        let mut specs = Vec::new();
        collect_specs(node, &mut specs);

        for spec in specs {
            let Some(path) = spec.child_by_field_name("path") else {
                continue;
            };
            let source = node_text(path, self.src)
                .trim_matches('"')
                .to_string();
            let line = spec.start_position().row as u32 + 1;
            let alias = spec
                .child_by_field_name("name")
                .map(|n| node_text(n, self.src).to_string());

            let (kind, names) = match alias.as_deref() {
                Some("_") => (ImportKind::SideEffect, Vec::new()),
                Some(".") => (ImportKind::Namespace, Vec::new()),
                Some(name) => (
                    ImportKind::Namespace,
                    vec![BoundName {
                        name: source.clone(),
                        alias: Some(name.to_string()),
                    }],
                ),
                None => (ImportKind::Namespace, Vec::new()),
            };
            self.out.imports.push(Import {
                source,
                kind,
                names,
                line,
                type_only: false,
            });
        }
    }

    fn handle_function(&mut self, node: Node, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (sl, sc, el, ec) = node_span(node);

        let mut sym = Symbol::new(&name, SymbolKind::Function)
            .with_span(sl, sc, el, ec, node.start_byte(), node.end_byte())
            .with_exported(is_go_public(&name));
        if !sym.exported {
            sym.visibility = Visibility::Private;
        }
        sym.parameters = self.parameters(node);
        sym.return_type = node
            .child_by_field_name("result")
            .map(|r| node_text(r, self.src).to_string());
        self.out.symbols.push(sym);

        self.descend(node, name, depth);
    }

    fn handle_method(&mut self, node: Node, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (sl, sc, el, ec) = node_span(node);

        let mut sym = Symbol::new(&name, SymbolKind::Method)
            .with_span(sl, sc, el, ec, node.start_byte(), node.end_byte())
            .with_exported(is_go_public(&name));
        if !sym.exported {
            sym.visibility = Visibility::Private;
        }
        sym.parameters = self.parameters(node);
        sym.return_type = node
            .child_by_field_name("result")
            .map(|r| node_text(r, self.src).to_string());
        if let Some(receiver) = self.receiver_type(node) {
            sym.parent = Some(receiver);
        }
        self.out.symbols.push(sym);

        self.descend(node, name, depth);
    }

    fn handle_types(&mut self, node: Node, depth: usize) {
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let Some(name_node) = spec.child_by_field_name("name") else {
                continue;
            };
            let name = node_text(name_node, self.src).to_string();
            let type_node = spec.child_by_field_name("type");
            let kind = match type_node.map(|t| t.kind()) {
                Some("struct_type") => SymbolKind::Class,
                Some("interface_type") => SymbolKind::Interface,
                _ => SymbolKind::TypeAlias,
            };

            let (sl, sc, el, ec) = node_span(node);
            let mut sym = Symbol::new(&name, kind)
                .with_span(sl, sc, el, ec, node.start_byte(), node.end_byte())
                .with_exported(is_go_public(&name));
            if !sym.exported {
                sym.visibility = Visibility::Private;
            }
            self.out.symbols.push(sym);

            match type_node.map(|t| t.kind()) {
                Some("struct_type") => {
                    if let Some(t) = type_node {
                        self.struct_fields(t, &name);
                    }
                }
                Some("interface_type") => {
                    if let Some(t) = type_node {
                        self.interface_methods(t, &name);
                    }
                }
                _ => {}
            }
        }
        self.visit_children(node, depth);
    }

    fn struct_fields(&mut self, struct_type: Node, parent: &str) {
        let Some(list) = first_of_kind(struct_type, "field_declaration_list") else {
            return;
        };
        let mut cursor = list.walk();
        for field in list.named_children(&mut cursor) {
            if field.kind() != "field_declaration" {
                continue;
            }
            let mut inner = field.walk();
            for name_node in field.named_children(&mut inner) {
                if name_node.kind() != "field_identifier" {
                    continue;
                }
                let name = node_text(name_node, self.src).to_string();
                let (sl, sc, el, ec) = node_span(field);
                let mut sym = Symbol::new(&name, SymbolKind::Property)
                    .with_span(sl, sc, el, ec, field.start_byte(), field.end_byte())
                    .with_exported(is_go_public(&name))
                    .with_parent(parent);
                if !sym.exported {
                    sym.visibility = Visibility::Private;
                }
                self.out.symbols.push(sym);
            }
        }
    }

    fn interface_methods(&mut self, interface_type: Node, parent: &str) {
        let mut cursor = interface_type.walk();
        for member in interface_type.named_children(&mut cursor) {
            if member.kind() != "method_elem" {
                continue;
            }
            let Some(name_node) = member.child_by_field_name("name") else {
                continue;
            };
            let name = node_text(name_node, self.src).to_string();
            let (sl, sc, el, ec) = node_span(member);
            let sym = Symbol::new(&name, SymbolKind::Method)
                .with_span(sl, sc, el, ec, member.start_byte(), member.end_byte())
                .with_exported(is_go_public(&name))
                .with_parent(parent);
            self.out.symbols.push(sym);
        }
    }

    fn handle_values(&mut self, node: Node, kind: SymbolKind) {
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if !matches!(spec.kind(), "const_spec" | "var_spec") {
                continue;
            }
            // Only the `name` field: the spec's value expressions can
            // also be bare identifiers.
            let mut inner = spec.walk();
            let names: Vec<String> = spec
                .children_by_field_name("name", &mut inner)
                .map(|n| node_text(n, self.src).to_string())
                .collect();
            for name in names {
                let (sl, sc, el, ec) = node_span(node);
                let mut sym = Symbol::new(&name, kind)
                    .with_span(sl, sc, el, ec, node.start_byte(), node.end_byte())
                    .with_exported(is_go_public(&name));
                if !sym.exported {
                    sym.visibility = Visibility::Private;
                }
                self.out.symbols.push(sym);
            }
        }
    }

    fn handle_call(&mut self, node: Node) {
        let Some(func) = node.child_by_field_name("function") else {
            return;
        };
        let arg_count = node
            .child_by_field_name("arguments")
            .map(|a| a.named_child_count() as u32)
            .unwrap_or(0);
        let (line, column, _, _) = node_span(node);

        let (callee, receiver, is_method_call) = match func.kind() {
            "identifier" => (node_text(func, self.src).to_string(), None, false),
            "selector_expression" => {
                let Some(field) = func.child_by_field_name("field") else {
                    return;
                };
                let receiver = func
                    .child_by_field_name("operand")
                    .map(|o| node_text(o, self.src).to_string());
                (node_text(field, self.src).to_string(), receiver, true)
            }
            _ => return,
        };

        self.out.calls.push(CallReference {
            callee,
            caller: self.caller_stack.last().cloned(),
            line,
            column,
            is_method_call,
            receiver,
            arg_count,
        });
    }

    fn descend(&mut self, node: Node, name: String, depth: usize) {
        if let Some(body) = node.child_by_field_name("body") {
            self.caller_stack.push(name);
            self.visit_children(body, depth + 1);
            self.caller_stack.pop();
        }
    }

    fn parameters(&self, node: Node) -> Vec<String> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut cursor = params.walk();
        params
            .named_children(&mut cursor)
            .map(|p| node_text(p, self.src).to_string())
            .collect()
    }

    /// Base type name of a method receiver, pointers stripped.
    fn receiver_type(&self, node: Node) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let param = first_of_kind(receiver, "parameter_declaration")?;
        let ty = param.child_by_field_name("type")?;
        let text = match ty.kind() {
            "pointer_type" => ty
                .named_child(0)
                .map(|inner| node_text(inner, self.src))
                .unwrap_or(""),
            _ => node_text(ty, self.src),
        };
        let base = text.trim_start_matches('*').split('[').next().unwrap_or(text);
        if base.is_empty() {
            None
        } else {
            Some(base.to_string())
        }
    }
}

fn collect_specs<'n>(node: Node<'n>, out: &mut Vec<Node<'n>>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "import_spec" {
            out.push(child);
        } else if child.kind() == "import_spec_list" {
            collect_specs(child, out);
        }
    }
}

fn first_of_kind<'n>(node: Node<'n>, kind: &str) -> Option<Node<'n>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

fn is_go_public(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}
