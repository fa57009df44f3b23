//! Symbol, import, and call extraction for Rust trees.
//!
//! `pub` is the export marker; `pub(crate)`/`pub(super)` map to internal
//! visibility. Methods from `impl` blocks hang off the implemented type,
//! and `impl Trait for Type` contributes to the type's implements list.

use super::{depth_ok, node_span, node_text};
use crate::parsing::parser::Extraction;
use crate::types::{
    BoundName, CallReference, Import, ImportKind, Symbol, SymbolKind, Visibility,
};
use std::collections::HashMap;
use tree_sitter::Node;

pub(super) fn extract(root: Node, src: &str) -> Extraction {
    let mut walker = Walker {
        src,
        out: Extraction::default(),
        caller_stack: Vec::new(),
        trait_impls: HashMap::new(),
    };
    walker.visit(root, &Ctx::default(), 0);

    // Attach `impl Trait for Type` facts to the type's symbol when it is
    // declared in this file.
    for sym in walker.out.symbols.iter_mut() {
        if let Some(traits) = walker.trait_impls.get(sym.name.as_str()) {
            if matches!(sym.kind, SymbolKind::Class | SymbolKind::Enum) {
                sym.implements = traits.clone();
            }
        }
    }
    walker.out
}

#[derive(Debug, Default, Clone)]
struct Ctx {
    parent: Option<String>,
    in_function: bool,
}

struct Walker<'a> {
    src: &'a str,
    out: Extraction,
    caller_stack: Vec<String>,
    trait_impls: HashMap<String, Vec<String>>,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        if !depth_ok(depth, node) {
            return;
        }

        match node.kind() {
            "use_declaration" => self.handle_use(node),
            "function_item" | "function_signature_item" => self.handle_function(node, ctx, depth),
            "struct_item" => self.handle_named(node, ctx, SymbolKind::Class),
            "enum_item" => self.handle_named(node, ctx, SymbolKind::Enum),
            "trait_item" => self.handle_trait(node, ctx, depth),
            "type_item" => self.handle_named(node, ctx, SymbolKind::TypeAlias),
            "const_item" => self.handle_named(node, ctx, SymbolKind::Constant),
            "static_item" => self.handle_named(node, ctx, SymbolKind::Variable),
            "mod_item" => self.handle_module(node, ctx, depth),
            "impl_item" => self.handle_impl(node, ctx, depth),
            "call_expression" => {
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

    fn handle_use(&mut self, node: Node) {
        let Some(arg) = node.child_by_field_name("argument") else {
            return;
        };
        let line = node.start_position().row as u32 + 1;
        let full = node_text(arg, self.src).to_string();

        let mut names = Vec::new();
        self.use_leaf_names(arg, &mut names);
        self.out.imports.push(Import {
            source: full,
            kind: ImportKind::Named,
            names,
            line,
            type_only: false,
        });
    }

    /// Leaf bindings of a use tree (`a::b::{c, d as e}` -> c, d as e).
    fn use_leaf_names(&self, node: Node, out: &mut Vec<BoundName>) {
        match node.kind() {
            "identifier" => out.push(BoundName::plain(node_text(node, self.src))),
            "scoped_identifier" => {
                if let Some(name) = node.child_by_field_name("name") {
                    out.push(BoundName::plain(node_text(name, self.src)));
                }
            }
            "use_as_clause" => {
                let name = node
                    .child_by_field_name("path")
                    .map(|p| {
                        let text = node_text(p, self.src);
                        text.rsplit("::").next().unwrap_or(text).to_string()
                    })
                    .unwrap_or_default();
                let alias = node
                    .child_by_field_name("alias")
                    .map(|a| node_text(a, self.src).to_string());
                out.push(BoundName { name, alias });
            }
            "use_wildcard" => out.push(BoundName::plain("*")),
            "scoped_use_list" => {
                // Skip the path prefix; only the list carries bindings.
                if let Some(list) = node.child_by_field_name("list") {
                    self.use_leaf_names(list, out);
                }
            }
            "use_list" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.use_leaf_names(child, out);
                }
            }
            _ => {}
        }
    }

    fn handle_function(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (sl, sc, el, ec) = node_span(node);

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
            node.start_byte(),
            node.end_byte(),
        );
        self.apply_visibility(node, &mut sym);
        sym.is_async = self.has_modifier(node, "async");
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
        sym.generics = node
            .child_by_field_name("type_parameters")
            .map(|tp| node_text(tp, self.src).to_string());
        if let Some(p) = &ctx.parent {
            sym.parent = Some(p.clone());
        }
        self.out.symbols.push(sym);

        if let Some(body) = node.child_by_field_name("body") {
            self.caller_stack.push(name);
            let inner = Ctx {
                parent: None,
                in_function: true,
            };
            self.visit_children(body, &inner, depth + 1);
            self.caller_stack.pop();
        }
    }

    fn handle_named(&mut self, node: Node, ctx: &Ctx, kind: SymbolKind) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (sl, sc, el, ec) = node_span(node);
        let mut sym = Symbol::new(&name, kind).with_span(
            sl,
            sc,
            el,
            ec,
            node.start_byte(),
            node.end_byte(),
        );
        self.apply_visibility(node, &mut sym);
        sym.generics = node
            .child_by_field_name("type_parameters")
            .map(|tp| node_text(tp, self.src).to_string());
        if let Some(p) = &ctx.parent {
            sym.parent = Some(p.clone());
        }
        if node.kind() == "static_item" {
            sym.is_static = true;
        }
        self.out.symbols.push(sym);
    }

    fn handle_trait(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (sl, sc, el, ec) = node_span(node);
        let mut sym = Symbol::new(&name, SymbolKind::Interface).with_span(
            sl,
            sc,
            el,
            ec,
            node.start_byte(),
            node.end_byte(),
        );
        self.apply_visibility(node, &mut sym);
        if let Some(p) = &ctx.parent {
            sym.parent = Some(p.clone());
        }
        self.out.symbols.push(sym);

        if let Some(body) = node.child_by_field_name("body") {
            let inner = Ctx {
                parent: Some(name),
                in_function: ctx.in_function,
            };
            self.visit_children(body, &inner, depth + 1);
        }
    }

    fn handle_module(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (sl, sc, el, ec) = node_span(node);
        let mut sym = Symbol::new(&name, SymbolKind::Module).with_span(
            sl,
            sc,
            el,
            ec,
            node.start_byte(),
            node.end_byte(),
        );
        self.apply_visibility(node, &mut sym);
        self.out.symbols.push(sym);

        if let Some(body) = node.child_by_field_name("body") {
            let inner = Ctx {
                parent: Some(name),
                in_function: ctx.in_function,
            };
            self.visit_children(body, &inner, depth + 1);
        }
    }

    fn handle_impl(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let type_text = node_text(type_node, self.src);
        let type_name = type_text.split('<').next().unwrap_or(type_text).to_string();

        if let Some(trait_node) = node.child_by_field_name("trait") {
            let trait_text = node_text(trait_node, self.src);
            let trait_name = trait_text.split('<').next().unwrap_or(trait_text).to_string();
            self.trait_impls
                .entry(type_name.clone())
                .or_default()
                .push(trait_name);
        }

        if let Some(body) = node.child_by_field_name("body") {
            let inner = Ctx {
                parent: Some(type_name),
                in_function: ctx.in_function,
            };
            self.visit_children(body, &inner, depth + 1);
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
            "field_expression" => {
                let Some(field) = func.child_by_field_name("field") else {
                    return;
                };
                let receiver = func
                    .child_by_field_name("value")
                    .map(|v| node_text(v, self.src).to_string());
                (node_text(field, self.src).to_string(), receiver, true)
            }
            "scoped_identifier" => {
                let Some(name) = func.child_by_field_name("name") else {
                    return;
                };
                let receiver = func
                    .child_by_field_name("path")
                    .map(|p| node_text(p, self.src).to_string());
                (node_text(name, self.src).to_string(), receiver, false)
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

    fn apply_visibility(&self, node: Node, sym: &mut Symbol) {
        let mut cursor = node.walk();
        let vis = node
            .children(&mut cursor)
            .find(|c| c.kind() == "visibility_modifier")
            .map(|v| node_text(v, self.src).to_string());
        match vis.as_deref() {
            Some("pub") => {
                sym.exported = true;
                sym.visibility = Visibility::Public;
            }
            Some(_) => {
                // pub(crate), pub(super), pub(in ...)
                sym.exported = false;
                sym.visibility = Visibility::Internal;
            }
            None => {
                sym.exported = false;
                sym.visibility = Visibility::Private;
            }
        }
    }

    fn has_modifier(&self, node: Node, modifier: &str) -> bool {
        let mut cursor = node.walk();
        node.children(&mut cursor).any(|c| {
            c.kind() == modifier
                || (c.kind() == "function_modifiers" && node_text(c, self.src).contains(modifier))
        })
    }
}
