//! Partial resolution of identifiers to the nodes that declare them.
//!
//! Two passes over the AST with an explicit scope stack: the type pass
//! binds identifiers in pure-type positions, the expression pass binds
//! type-or-expression and expression names, trying types before fields.
//! Only locally-declared symbols bind; whatever stays unbound is a
//! candidate external reference.

use std::collections::HashMap;
use tree_sitter::Node;

use crate::names::{dotted_ids, expr_chain, type_chain};
use crate::scopes::{is_container, node_text, ScopeTables, SymbolTable};

/// Identifier node id → declaration node.
pub type Bindings<'a> = HashMap<usize, Node<'a>>;

/// Maps identifiers in the AST to the nodes that declare them.
pub fn resolve<'a>(root: Node<'a>, source: &str, tables: &ScopeTables<'a>) -> Bindings<'a> {
    let mut bindings = Bindings::new();
    TypePass {
        source,
        tables,
        stack: Vec::new(),
        bindings: &mut bindings,
    }
    .visit(root);
    ExprPass {
        source,
        tables,
        stack: Vec::new(),
        bindings: &mut bindings,
    }
    .visit(root);
    bindings
}

/// A lexical scope on the resolution stack: either a container's shared
/// table, or a fresh table for block-local declarations.
enum Scope<'t, 'a> {
    Shared(&'t SymbolTable<'a>),
    Local(SymbolTable<'a>),
}

impl<'t, 'a> Scope<'t, 'a> {
    fn table(&self) -> &SymbolTable<'a> {
        match self {
            Scope::Shared(table) => table,
            Scope::Local(table) => table,
        }
    }
}

/// A type named `name` in the closest lexical scope.
fn type_in_scope<'a>(stack: &[Scope<'_, 'a>], name: &str) -> Option<Node<'a>> {
    stack
        .iter()
        .rev()
        .find_map(|scope| scope.table().types.get(name).copied())
}

/// A field (variable declarator or static import) named `name` in the
/// closest lexical scope.
fn field_in_scope<'a>(stack: &[Scope<'_, 'a>], name: &str) -> Option<Node<'a>> {
    stack.iter().rev().find_map(|scope| {
        scope.table().members.get(name).and_then(|members| {
            members
                .iter()
                .find(|m| matches!(m.kind(), "variable_declarator" | "import_declaration"))
                .copied()
        })
    })
}

/// Resolves a chain of nested types, e.g. `Foo.Bar.Baz` starting from the
/// declaration of `Foo`. Returns how many identifiers resolved and the
/// declaration the chain stopped at.
fn resolve_type_chain<'a>(
    tables: &ScopeTables<'a>,
    type_declaration: Node<'a>,
    identifiers: &[Node<'a>],
    source: &str,
    bindings: &mut Bindings<'a>,
) -> (usize, Node<'a>) {
    let mut current = type_declaration;
    for (i, id) in identifiers.iter().enumerate() {
        let Some(table) = tables.get(current) else {
            return (i, current);
        };
        match table.types.get(node_text(*id, source)) {
            Some(decl) => {
                bindings.insert(id.id(), *decl);
                current = *decl;
            }
            None => return (i, current),
        }
    }
    (identifiers.len(), current)
}

/// Resolves a chain of fields, e.g. the `a.b` of `Foo.a.b`, following the
/// declared type of each field.
fn resolve_identifier_chain<'a>(
    tables: &ScopeTables<'a>,
    declaration: Node<'a>,
    identifiers: &[Node<'a>],
    source: &str,
    bindings: &mut Bindings<'a>,
) {
    let mut current = declaration;
    for id in identifiers {
        let Some(type_decl) = type_binding(current, bindings) else {
            return;
        };
        let Some(table) = tables.get(type_decl) else {
            return;
        };
        let Some(members) = table.members.get(node_text(*id, source)) else {
            return;
        };
        let Some(field) = members
            .iter()
            .find(|m| m.kind() == "variable_declarator")
            .copied()
        else {
            return;
        };
        bindings.insert(id.id(), field);
        current = field;
    }
}

/// The node declaring the type that `node` is of: a type declaration maps
/// to itself, a variable declarator to the declaration of its declared
/// type (when that resolved).
fn type_binding<'a>(node: Node<'a>, bindings: &Bindings<'a>) -> Option<Node<'a>> {
    match node.kind() {
        "class_declaration"
        | "enum_declaration"
        | "interface_declaration"
        | "annotation_type_declaration"
        | "record_declaration" => Some(node),
        "variable_declarator" => {
            let declaration = node.parent()?;
            let type_node = declaration.child_by_field_name("type")?;
            declared_type_binding(type_node, bindings)
        }
        _ => None,
    }
}

/// Follows a declared-type node to the binding of its most specific
/// identifier.
fn declared_type_binding<'a>(type_node: Node<'a>, bindings: &Bindings<'a>) -> Option<Node<'a>> {
    match type_node.kind() {
        "type_identifier" | "scoped_type_identifier" => {
            let ids = type_chain(type_node)?;
            bindings.get(&ids.last()?.id()).copied()
        }
        "generic_type" => {
            let mut cursor = type_node.walk();
            let base = type_node
                .named_children(&mut cursor)
                .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))?;
            declared_type_binding(base, bindings)
        }
        _ => None,
    }
}

/// The type-resolution pass: binds identifiers in pure-type positions.
struct TypePass<'b, 't, 'a> {
    source: &'b str,
    tables: &'t ScopeTables<'a>,
    stack: Vec<Scope<'t, 'a>>,
    bindings: &'b mut Bindings<'a>,
}

impl<'b, 't, 'a> TypePass<'b, 't, 'a> {
    fn visit(&mut self, node: Node<'a>) {
        let mut pushed = 0;
        if is_container(node.kind()) {
            if let Some(table) = self.tables.get(node) {
                self.stack.push(Scope::Shared(table));
                pushed += 1;
            }
        }

        if let Some(ids) = type_chain(node) {
            self.bind(&ids);
        } else if matches!(node.kind(), "annotation" | "marker_annotation") {
            if let Some(name) = node.child_by_field_name("name") {
                let ids = dotted_ids(name);
                if !ids.is_empty() {
                    self.bind(&ids);
                }
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
        for _ in 0..pushed {
            self.stack.pop();
        }
    }

    fn bind(&mut self, ids: &[Node<'a>]) {
        let first = node_text(ids[0], self.source);
        if let Some(decl) = type_in_scope(&self.stack, first) {
            self.bindings.insert(ids[0].id(), decl);
            resolve_type_chain(self.tables, decl, &ids[1..], self.source, self.bindings);
        }
    }
}

/// The expression pass: binds type-or-expression and expression names,
/// first as a type, then as a field.
struct ExprPass<'b, 't, 'a> {
    source: &'b str,
    tables: &'t ScopeTables<'a>,
    stack: Vec<Scope<'t, 'a>>,
    bindings: &'b mut Bindings<'a>,
}

impl<'b, 't, 'a> ExprPass<'b, 't, 'a> {
    fn visit(&mut self, node: Node<'a>) {
        let mut pushed = 0;
        if is_container(node.kind()) {
            if let Some(table) = self.tables.get(node) {
                self.stack.push(Scope::Shared(table));
                pushed += 1;
            }
        }

        match node.kind() {
            // Fresh scope for locals declared inside.
            "block" | "constructor_body" | "switch_block" | "for_statement"
            | "enhanced_for_statement" => {
                self.stack.push(Scope::Local(SymbolTable::default()));
                pushed += 1;
            }

            "local_variable_declaration" => {
                let mut cursor = node.walk();
                let declarators: Vec<Node<'a>> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "variable_declarator")
                    .collect();
                if let Some(Scope::Local(table)) = self.stack.last_mut() {
                    for declarator in declarators {
                        let name = declarator
                            .child_by_field_name("name")
                            .map(|n| node_text(n, self.source))
                            .unwrap_or("");
                        table.add_member(name, declarator);
                    }
                }
            }

            _ => {
                if let Some(ids) = expr_chain(node) {
                    self.bind(&ids);
                }
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
        for _ in 0..pushed {
            self.stack.pop();
        }
    }

    fn bind(&mut self, ids: &[Node<'a>]) {
        let first = node_text(ids[0], self.source);
        if let Some(type_decl) = type_in_scope(&self.stack, first) {
            self.bindings.insert(ids[0].id(), type_decl);
            let (consumed, last_type) = resolve_type_chain(
                self.tables,
                type_decl,
                &ids[1..],
                self.source,
                self.bindings,
            );
            resolve_identifier_chain(
                self.tables,
                last_type,
                &ids[1 + consumed..],
                self.source,
                self.bindings,
            );
        } else if let Some(field) = field_in_scope(&self.stack, first) {
            self.bindings.insert(ids[0].id(), field);
            resolve_identifier_chain(self.tables, field, &ids[1..], self.source, self.bindings);
        }
    }
}
