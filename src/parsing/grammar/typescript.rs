//! Symbol, import/export, and call extraction for TypeScript and
//! JavaScript trees. JavaScript is the same walk with the type-system
//! node kinds simply never appearing.

use super::{depth_ok, node_span, node_text};
use crate::parsing::parser::Extraction;
use crate::types::{
    BoundName, CallReference, Export, Import, ImportKind, Symbol, SymbolKind, Visibility,
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

/// Inherited context while walking down the tree.
#[derive(Debug, Default, Clone)]
struct Ctx {
    /// Enclosing class/interface/namespace name.
    parent: Option<String>,
    /// Set when walking the declaration under an `export` statement.
    exported: bool,
    /// True inside any function body; suppresses local variables.
    in_function: bool,
}

struct Walker<'a> {
    src: &'a str,
    out: Extraction,
    /// Names of enclosing functions/methods, for call attribution.
    caller_stack: Vec<String>,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        if !depth_ok(depth, node) {
            return;
        }

        match node.kind() {
            "import_statement" => self.handle_import(node),
            "export_statement" => self.handle_export(node, ctx, depth),
            "class_declaration" | "abstract_class_declaration" => {
                self.handle_class(node, ctx, depth)
            }
            "interface_declaration" => self.handle_interface(node, ctx),
            "enum_declaration" => self.handle_simple_named(node, ctx, SymbolKind::Enum),
            "type_alias_declaration" => self.handle_simple_named(node, ctx, SymbolKind::TypeAlias),
            "internal_module" => self.handle_namespace(node, ctx, depth),
            "function_declaration" | "generator_function_declaration" => {
                self.handle_function(node, ctx, depth)
            }
            "method_definition" => self.handle_method(node, ctx, depth),
            "public_field_definition" => self.handle_field(node, ctx, depth),
            "lexical_declaration" | "variable_declaration" => {
                self.handle_variables(node, ctx, depth)
            }
            "call_expression" => {
                self.handle_call(node);
                self.visit_children(node, ctx, depth);
            }
            "new_expression" => {
                self.handle_new(node);
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

    // -- imports / exports ------------------------------------------------

    fn handle_import(&mut self, node: Node) {
        let Some(source) = node.child_by_field_name("source") else {
            return;
        };
        let source = unquote(node_text(source, self.src)).to_string();
        let line = node.start_position().row as u32 + 1;
        let type_only = self.has_token(node, "type");

        let mut names = Vec::new();
        let mut kind = ImportKind::SideEffect;

        if let Some(clause) = self.child_of_kind(node, "import_clause") {
            let mut cursor = clause.walk();
            for part in clause.named_children(&mut cursor) {
                match part.kind() {
                    "identifier" => {
                        kind = ImportKind::Default;
                        names.push(BoundName::plain(node_text(part, self.src)));
                    }
                    "namespace_import" => {
                        kind = ImportKind::Namespace;
                        if let Some(id) = self.child_of_kind(part, "identifier") {
                            names.push(BoundName::plain(node_text(id, self.src)));
                        }
                    }
                    "named_imports" => {
                        if kind == ImportKind::SideEffect {
                            kind = ImportKind::Named;
                        }
                        let mut inner = part.walk();
                        for spec in part.named_children(&mut inner) {
                            if spec.kind() == "import_specifier" {
                                names.push(self.specifier_name(spec));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        let kind = if type_only { ImportKind::Type } else { kind };
        self.out.imports.push(Import {
            source,
            kind,
            names,
            line,
            type_only,
        });
    }

    fn handle_export(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let line = node.start_position().row as u32 + 1;
        let type_only = self.has_token(node, "type");
        let source = node
            .child_by_field_name("source")
            .map(|s| unquote(node_text(s, self.src)).to_string());
        let is_default = self.has_token(node, "default");

        if let Some(decl) = node.child_by_field_name("declaration") {
            let before = self.out.symbols.len();
            let exported_ctx = Ctx {
                exported: true,
                ..ctx.clone()
            };
            self.visit(decl, &exported_ctx, depth + 1);

            // The newly-added top-level symbols are the exported names.
            let names: Vec<BoundName> = self.out.symbols[before..]
                .iter()
                .filter(|s| s.parent.is_none())
                .map(|s| BoundName::plain(s.name.clone()))
                .collect();
            self.out.exports.push(Export {
                source: None,
                kind: if is_default {
                    ImportKind::Default
                } else {
                    ImportKind::Named
                },
                names,
                line,
                type_only,
            });
            return;
        }

        if let Some(clause) = self.child_of_kind(node, "export_clause") {
            let mut names = Vec::new();
            let mut cursor = clause.walk();
            for spec in clause.named_children(&mut cursor) {
                if spec.kind() == "export_specifier" {
                    names.push(self.specifier_name(spec));
                }
            }
            self.out.exports.push(Export {
                kind: if source.is_some() {
                    ImportKind::ReExport
                } else {
                    ImportKind::Named
                },
                source,
                names,
                line,
                type_only,
            });
            return;
        }

        if self.has_token(node, "*") {
            self.out.exports.push(Export {
                source,
                kind: ImportKind::ReExport,
                names: vec![BoundName::plain("*")],
                line,
                type_only,
            });
            return;
        }

        if is_default {
            // `export default <expression>;`
            self.out.exports.push(Export {
                source: None,
                kind: ImportKind::Default,
                names: vec![BoundName::plain("default")],
                line,
                type_only,
            });
            self.visit_children(node, ctx, depth);
        }
    }

    fn specifier_name(&self, spec: Node) -> BoundName {
        let name = spec
            .child_by_field_name("name")
            .map(|n| node_text(n, self.src).to_string())
            .unwrap_or_default();
        let alias = spec
            .child_by_field_name("alias")
            .map(|n| node_text(n, self.src).to_string());
        BoundName { name, alias }
    }

    // -- declarations -----------------------------------------------------

    fn handle_class(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (sl, sc, el, ec) = node_span(node);

        let mut extends = Vec::new();
        let mut implements = Vec::new();
        if let Some(heritage) = self.child_of_kind(node, "class_heritage") {
            if let Some(clause) = self.child_of_kind(heritage, "extends_clause") {
                extends.extend(self.heritage_types(clause));
            }
            if let Some(clause) = self.child_of_kind(heritage, "implements_clause") {
                implements.extend(self.heritage_types(clause));
            }
            // JavaScript's class_heritage is bare `extends <expr>`.
            if extends.is_empty() && implements.is_empty() {
                extends.extend(self.heritage_types(heritage));
            }
        }

        let mut sym = Symbol::new(&name, SymbolKind::Class)
            .with_span(sl, sc, el, ec, node.start_byte(), node.end_byte())
            .with_exported(ctx.exported);
        sym.is_abstract = node.kind() == "abstract_class_declaration";
        sym.extends = extends;
        sym.implements = implements;
        sym.generics = node
            .child_by_field_name("type_parameters")
            .map(|n| node_text(n, self.src).to_string());
        sym.decorators = self.decorators(node);
        if let Some(p) = &ctx.parent {
            sym.parent = Some(p.clone());
        }
        self.out.symbols.push(sym);

        if let Some(body) = node.child_by_field_name("body") {
            let inner = Ctx {
                parent: Some(name),
                exported: false,
                in_function: ctx.in_function,
            };
            self.visit_children(body, &inner, depth + 1);
        }
    }

    fn handle_interface(&mut self, node: Node, ctx: &Ctx) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (sl, sc, el, ec) = node_span(node);

        let mut sym = Symbol::new(&name, SymbolKind::Interface)
            .with_span(sl, sc, el, ec, node.start_byte(), node.end_byte())
            .with_exported(ctx.exported);
        if let Some(clause) = self.child_of_kind(node, "extends_type_clause") {
            sym.extends = self.heritage_types(clause);
        }
        sym.generics = node
            .child_by_field_name("type_parameters")
            .map(|n| node_text(n, self.src).to_string());
        self.out.symbols.push(sym);

        // Interface members become properties/methods parented to it.
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                let kind = match member.kind() {
                    "property_signature" => SymbolKind::Property,
                    "method_signature" => SymbolKind::Method,
                    _ => continue,
                };
                let Some(member_name) = member.child_by_field_name("name") else {
                    continue;
                };
                let (msl, msc, mel, mec) = node_span(member);
                let member_sym =
                    Symbol::new(node_text(member_name, self.src), kind)
                        .with_span(msl, msc, mel, mec, member.start_byte(), member.end_byte())
                        .with_parent(&name);
                self.out.symbols.push(member_sym);
            }
        }
    }

    fn handle_namespace(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (sl, sc, el, ec) = node_span(node);
        let sym = Symbol::new(&name, SymbolKind::Namespace)
            .with_span(sl, sc, el, ec, node.start_byte(), node.end_byte())
            .with_exported(ctx.exported);
        self.out.symbols.push(sym);

        if let Some(body) = node.child_by_field_name("body") {
            let inner = Ctx {
                parent: Some(name),
                exported: false,
                in_function: ctx.in_function,
            };
            self.visit_children(body, &inner, depth + 1);
        }
    }

    fn handle_simple_named(&mut self, node: Node, ctx: &Ctx, kind: SymbolKind) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let (sl, sc, el, ec) = node_span(node);
        let mut sym = Symbol::new(node_text(name_node, self.src), kind)
            .with_span(sl, sc, el, ec, node.start_byte(), node.end_byte())
            .with_exported(ctx.exported);
        if let Some(p) = &ctx.parent {
            sym.parent = Some(p.clone());
        }
        self.out.symbols.push(sym);
    }

    fn handle_function(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (sl, sc, el, ec) = node_span(node);

        let mut sym = Symbol::new(&name, SymbolKind::Function)
            .with_span(sl, sc, el, ec, node.start_byte(), node.end_byte())
            .with_exported(ctx.exported);
        sym.is_async = self.has_token(node, "async");
        sym.parameters = self.parameters(node);
        sym.return_type = self.return_type(node);
        sym.generics = node
            .child_by_field_name("type_parameters")
            .map(|n| node_text(n, self.src).to_string());
        if let Some(p) = &ctx.parent {
            sym.parent = Some(p.clone());
        }
        self.out.symbols.push(sym);

        self.descend_into_body(node, name, ctx, depth);
    }

    fn handle_method(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let (sl, sc, el, ec) = node_span(node);

        let mut sym = Symbol::new(&name, SymbolKind::Method).with_span(
            sl,
            sc,
            el,
            ec,
            node.start_byte(),
            node.end_byte(),
        );
        sym.is_async = self.has_token(node, "async");
        sym.is_static = self.has_token(node, "static");
        sym.visibility = self.accessibility(node);
        sym.exported = false;
        sym.parameters = self.parameters(node);
        sym.return_type = self.return_type(node);
        sym.decorators = self.decorators(node);
        if let Some(p) = &ctx.parent {
            sym.parent = Some(p.clone());
        }
        self.out.symbols.push(sym);

        self.descend_into_body(node, name, ctx, depth);
    }

    fn handle_field(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let value = node.child_by_field_name("value");
        let is_function_value = value
            .map(|v| matches!(v.kind(), "arrow_function" | "function_expression" | "function"))
            .unwrap_or(false);
        let (sl, sc, el, ec) = node_span(node);

        let kind = if is_function_value {
            SymbolKind::Method
        } else {
            SymbolKind::Property
        };
        let mut sym = Symbol::new(&name, kind).with_span(
            sl,
            sc,
            el,
            ec,
            node.start_byte(),
            node.end_byte(),
        );
        sym.is_static = self.has_token(node, "static");
        sym.visibility = self.accessibility(node);
        if let Some(v) = value {
            sym.is_async = self.has_token(v, "async");
        }
        if let Some(p) = &ctx.parent {
            sym.parent = Some(p.clone());
        }
        self.out.symbols.push(sym);

        if is_function_value {
            self.descend_into_body(node, name, ctx, depth);
        } else if let Some(v) = value {
            self.visit(v, ctx, depth + 1);
        }
    }

    fn handle_variables(&mut self, node: Node, ctx: &Ctx, depth: usize) {
        let is_const = node
            .child(0)
            .map(|c| c.kind() == "const")
            .unwrap_or(false);

        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            if name_node.kind() != "identifier" {
                // Destructuring patterns carry no single symbol name.
                if let Some(value) = declarator.child_by_field_name("value") {
                    self.visit(value, ctx, depth + 1);
                }
                continue;
            }
            let name = node_text(name_node, self.src).to_string();
            let value = declarator.child_by_field_name("value");
            let is_function_value = value
                .map(|v| matches!(v.kind(), "arrow_function" | "function_expression" | "function"))
                .unwrap_or(false);

            if ctx.in_function && !is_function_value {
                // Locals are noise; still look for calls in initializers.
                if let Some(v) = value {
                    self.visit(v, ctx, depth + 1);
                }
                continue;
            }

            let kind = if is_function_value {
                SymbolKind::Function
            } else if is_const {
                SymbolKind::Constant
            } else {
                SymbolKind::Variable
            };
            let (sl, sc, el, ec) = node_span(node);
            let mut sym = Symbol::new(&name, kind)
                .with_span(sl, sc, el, ec, node.start_byte(), node.end_byte())
                .with_exported(ctx.exported);
            if let Some(v) = value {
                sym.is_async = self.has_token(v, "async");
            }
            if let Some(p) = &ctx.parent {
                sym.parent = Some(p.clone());
            }
            self.out.symbols.push(sym);

            if is_function_value {
                self.descend_into_body(declarator, name, ctx, depth);
            } else if let Some(v) = value {
                self.visit(v, ctx, depth + 1);
            }
        }
    }

    // -- calls ------------------------------------------------------------

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
            "member_expression" => {
                let Some(prop) = func.child_by_field_name("property") else {
                    return;
                };
                let receiver = func
                    .child_by_field_name("object")
                    .map(|o| node_text(o, self.src).to_string());
                (node_text(prop, self.src).to_string(), receiver, true)
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

    fn handle_new(&mut self, node: Node) {
        let Some(ctor) = node.child_by_field_name("constructor") else {
            return;
        };
        if ctor.kind() != "identifier" {
            return;
        }
        let arg_count = node
            .child_by_field_name("arguments")
            .map(|a| a.named_child_count() as u32)
            .unwrap_or(0);
        let (line, column, _, _) = node_span(node);
        self.out.calls.push(CallReference {
            callee: node_text(ctor, self.src).to_string(),
            caller: self.caller_stack.last().cloned(),
            line,
            column,
            is_method_call: false,
            receiver: None,
            arg_count,
        });
    }

    // -- helpers ----------------------------------------------------------

    fn descend_into_body(&mut self, node: Node, name: String, ctx: &Ctx, depth: usize) {
        self.caller_stack.push(name);
        let inner = Ctx {
            in_function: true,
            ..ctx.clone()
        };
        self.visit_children(node, &inner, depth + 1);
        self.caller_stack.pop();
    }

    fn child_of_kind<'n>(&self, node: Node<'n>, kind: &str) -> Option<Node<'n>> {
        let mut cursor = node.walk();
        node.children(&mut cursor).find(|c| c.kind() == kind)
    }

    fn has_token(&self, node: Node, token: &str) -> bool {
        let mut cursor = node.walk();
        node.children(&mut cursor).any(|c| c.kind() == token)
    }

    /// Base type names referenced by an extends/implements clause, with
    /// type arguments stripped.
    fn heritage_types(&self, clause: Node) -> Vec<String> {
        let mut types = Vec::new();
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            let text = node_text(child, self.src);
            let base = text.split('<').next().unwrap_or(text).trim();
            if !base.is_empty() {
                types.push(base.to_string());
            }
        }
        types
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

    fn return_type(&self, node: Node) -> Option<String> {
        node.child_by_field_name("return_type").map(|rt| {
            node_text(rt, self.src)
                .trim_start_matches(':')
                .trim()
                .to_string()
        })
    }

    fn accessibility(&self, node: Node) -> Visibility {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "accessibility_modifier" {
                return match node_text(child, self.src) {
                    "public" => Visibility::Public,
                    "private" => Visibility::Private,
                    "protected" => Visibility::Protected,
                    _ => Visibility::Default,
                };
            }
        }
        Visibility::Default
    }

    fn decorators(&self, node: Node) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "decorator" {
                out.push(node_text(child, self.src).to_string());
            }
        }
        // Decorators may also precede the declaration as siblings.
        let mut prev = node.prev_sibling();
        while let Some(p) = prev {
            if p.kind() == "decorator" {
                out.insert(0, node_text(p, self.src).to_string());
                prev = p.prev_sibling();
            } else {
                break;
            }
        }
        out
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`')
}
