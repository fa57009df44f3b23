//! Symbol, import, and call extraction for Python trees.
//!
//! Python has no export keyword; module-level names without a leading
//! underscore are treated as public, underscore-prefixed names as
//! private. Docstrings come from the first string statement of a body.

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
    walker.visit(root, &Ctx::default(), 0);
    walker.out
}

#[derive(Debug, Default, Clone)]
struct Ctx {
    parent: Option<String>,
    in_function: bool,
    /// Decorators collected from an enclosing `decorated_definition`.
    decorators: Vec<String>,
    /// Span override so a decorated symbol covers its decorators.
    span_from: Option<(u32, u32, usize)>,
}

struct Walker<'a> {
    src: &'a str,
    out: Extraction,
    caller_stack: Vec<String>,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        if !depth_ok(depth, node) {
            return;
        }

        match node.kind() {
            "import_statement" => self.handle_import(node),
            "import_from_statement" => self.handle_import_from(node),
            "decorated_definition" => self.handle_decorated(node, ctx, depth),
            "class_definition" => self.handle_class(node, ctx, depth),
            "function_definition" => self.handle_function(node, ctx, depth),
            "expression_statement" => {
                self.handle_assignment(node, ctx, depth);
                self.visit_children(node, ctx, depth);
            }
            "call" => {
                self.handle_call(node);
                self.visit_children(node, ctx, depth);
            }
            _ => self.visit_children(node, ctx, depth),
        }
    }

    fn visit_children(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, ctx, depth + 1);
        }
    }

    fn handle_import(&mut self, node: Node) {
        let line = node.start_position().row as u32 + 1;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    let source = node_text(child, self.src).to_string();
                    self.out.imports.push(Import {
                        source,
                        kind: ImportKind::Namespace,
                        names: Vec::new(),
                        line,
                        type_only: false,
                    });
                }
                "aliased_import" => {
                    let source = child
                        .child_by_field_name("name")
                        .map(|n| node_text(n, self.src).to_string())
                        .unwrap_or_default();
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|n| node_text(n, self.src).to_string());
                    self.out.imports.push(Import {
                        source: source.clone(),
                        kind: ImportKind::Namespace,
                        names: vec![BoundName {
                            name: source,
                            alias,
                        }],
                        line,
                        type_only: false,
                    });
                }
                _ => {}
            }
        }
    }

    fn handle_import_from(&mut self, node: Node) {
        let line = node.start_position().row as u32 + 1;
        let source = node
            .child_by_field_name("module_name")
            .map(|n| node_text(n, self.src).to_string())
            .unwrap_or_default();

        let mut names = Vec::new();
        let mut wildcard = false;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            // The module_name field also matches dotted_name; skip it.
            if Some(child) == node.child_by_field_name("module_name") {
                continue;
            }
            match child.kind() {
                "dotted_name" | "identifier" => {
                    names.push(BoundName::plain(node_text(child, self.src)));
                }
                "aliased_import" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| node_text(n, self.src).to_string())
                        .unwrap_or_default();
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|n| node_text(n, self.src).to_string());
                    names.push(BoundName { name, alias });
                }
                "wildcard_import" => wildcard = true,
                _ => {}
            }
        }

        self.out.imports.push(Import {
            source,
            kind: if wildcard {
                ImportKind::Namespace
            } else {
                ImportKind::Named
            },
            names,
            line,
            type_only: false,
        });
    }

    fn handle_decorated(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let mut decorators = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "decorator" {
                decorators.push(node_text(child, self.src).to_string());
            }
        }
        let Some(definition) = node.child_by_field_name("definition") else {
            return;
        };
        let (sl, sc, _, _) = node_span(node);
        let inner = Ctx {
            decorators,
            span_from: Some((sl, sc, node.start_byte())),
            ..ctx.clone()
        };
        self.visit(definition, &inner, depth + 1);
    }

    fn handle_class(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (mut sl, mut sc, el, ec) = node_span(node);
        let mut start_byte = node.start_byte();
        if let Some((dsl, dsc, dsb)) = ctx.span_from {
            sl = dsl;
            sc = dsc;
            start_byte = dsb;
        }

        let mut sym = Symbol::new(&name, SymbolKind::Class).with_span(
            sl,
            sc,
            el,
            ec,
            start_byte,
            node.end_byte(),
        );
        sym.decorators = ctx.decorators.clone();
        if let Some(supers) = node.child_by_field_name("superclasses") {
            let mut cursor = supers.walk();
            sym.extends = supers
                .named_children(&mut cursor)
                .filter(|c| matches!(c.kind(), "identifier" | "attribute"))
                .map(|c| node_text(c, self.src).to_string())
                .collect();
        }
        self.apply_python_visibility(&mut sym, ctx);
        if let Some(p) = &ctx.parent {
            sym.parent = Some(p.clone());
        }
        if let Some(body) = node.child_by_field_name("body") {
            sym.docstring = self.body_docstring(body);
        }
        self.out.symbols.push(sym);

        if let Some(body) = node.child_by_field_name("body") {
            let inner = Ctx {
                parent: Some(name),
                in_function: ctx.in_function,
                decorators: Vec::new(),
                span_from: None,
            };
            self.visit_children(body, &inner, depth + 1);
        }
    }

    fn handle_function(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (mut sl, mut sc, el, ec) = node_span(node);
        let mut start_byte = node.start_byte();
        if let Some((dsl, dsc, dsb)) = ctx.span_from {
            sl = dsl;
            sc = dsc;
            start_byte = dsb;
        }

        let kind = if ctx.parent.is_some() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        let mut sym = Symbol::new(&name, kind).with_span(
            sl,
            sc,
            el,
            ec,
            start_byte,
            node.end_byte(),
        );
        sym.is_async = node
            .child(0)
            .map(|c| c.kind() == "async")
            .unwrap_or(false);
        sym.decorators = ctx.decorators.clone();
        sym.is_static = ctx
            .decorators
            .iter()
            .any(|d| d.contains("staticmethod") || d.contains("classmethod"));
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            sym.parameters = params
                .named_children(&mut cursor)
                .map(|p| node_text(p, self.src).to_string())
                .collect();
        }
        sym.return_type = node
            .child_by_field_name("return_type")
            .map(|rt| node_text(rt, self.src).to_string());
        if let Some(body) = node.child_by_field_name("body") {
            sym.docstring = self.body_docstring(body);
        }
        self.apply_python_visibility(&mut sym, ctx);
        if let Some(p) = &ctx.parent {
            sym.parent = Some(p.clone());
        }
        self.out.symbols.push(sym);

        if let Some(body) = node.child_by_field_name("body") {
            self.caller_stack.push(name);
            let inner = Ctx {
                parent: None,
                in_function: true,
                decorators: Vec::new(),
                span_from: None,
            };
            self.visit_children(body, &inner, depth + 1);
            self.caller_stack.pop();
        }
    }

    /// Module-level `NAME = value` assignments become constants or
    /// variables. Locals inside functions are skipped.
    fn handle_assignment(&mut self, stmt: Node, ctx: &Ctx, _depth: usize) {
        if ctx.in_function || ctx.parent.is_some() {
            return;
        }
        let Some(assignment) = stmt.named_child(0).filter(|c| c.kind() == "assignment") else {
            return;
        };
        let Some(left) = assignment.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" {
            return;
        }
        let name = node_text(left, self.src).to_string();
        let kind = if name.chars().all(|c| !c.is_lowercase()) {
            SymbolKind::Constant
        } else {
            SymbolKind::Variable
        };
        let (sl, sc, el, ec) = node_span(stmt);
        let mut sym = Symbol::new(&name, kind).with_span(
            sl,
            sc,
            el,
            ec,
            stmt.start_byte(),
            stmt.end_byte(),
        );
        self.apply_python_visibility(&mut sym, ctx);
        self.out.symbols.push(sym);
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
            "attribute" => {
                let Some(attr) = func.child_by_field_name("attribute") else {
                    return;
                };
                let receiver = func
                    .child_by_field_name("object")
                    .map(|o| node_text(o, self.src).to_string());
                (node_text(attr, self.src).to_string(), receiver, true)
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

    /// First statement of a body, if it is a bare string literal.
    fn body_docstring(&self, body: Node) -> Option<String> {
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string = first.named_child(0)?;
        if string.kind() != "string" {
            return None;
        }
        let raw = node_text(string, self.src);
        let cleaned = raw
            .trim_start_matches(['r', 'b', 'f', 'u', 'R', 'B', 'F', 'U'])
            .trim_matches(|c| c == '"' || c == '\'')
            .trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned.to_string())
        }
    }

    fn apply_python_visibility(&self, sym: &mut Symbol, ctx: &Ctx) {
        if sym.name.starts_with('_') {
            sym.visibility = Visibility::Private;
            sym.exported = false;
        } else {
            sym.visibility = Visibility::Public;
            // Only module-level names are importable.
            sym.exported = ctx.parent.is_none() && !ctx.in_function;
        }
    }
}
