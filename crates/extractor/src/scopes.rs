//! Symbol tables for Java files.
//!
//! Every container construct (file root, class, enum, interface,
//! annotation type, method, constructor, enum constant, anonymous class)
//! gets a table of the types and members declared directly inside it. The
//! resolver walks these tables with a scope stack to bind identifiers.

use std::collections::HashMap;
use tree_sitter::Node;

use crate::names::dotted_ids;

/// What's declared in one container node.
#[derive(Default)]
pub struct SymbolTable<'a> {
    /// Inner types: classes, enums, interfaces, annotation types, type
    /// parameters, and non-static imports.
    pub types: HashMap<String, Node<'a>>,
    /// Methods, fields, enum constants, and static imports. Overloads keep
    /// every declaration.
    pub members: HashMap<String, Vec<Node<'a>>>,
}

impl<'a> SymbolTable<'a> {
    fn add_type(&mut self, name: &str, node: Node<'a>) {
        if !name.is_empty() {
            self.types.insert(name.to_string(), node);
        }
    }

    pub(crate) fn add_member(&mut self, name: &str, node: Node<'a>) {
        if !name.is_empty() {
            self.members.entry(name.to_string()).or_default().push(node);
        }
    }
}

/// Symbol tables for every container in one parsed file, keyed by the
/// container node's id.
pub struct ScopeTables<'a> {
    tables: HashMap<usize, SymbolTable<'a>>,
}

impl<'a> ScopeTables<'a> {
    pub fn get(&self, container: Node<'a>) -> Option<&SymbolTable<'a>> {
        self.tables.get(&container.id())
    }
}

/// Returns true for node kinds that can own a symbol table.
pub fn is_container(kind: &str) -> bool {
    matches!(
        kind,
        "program"
            | "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "annotation_type_declaration"
            | "record_declaration"
            | "method_declaration"
            | "constructor_declaration"
            | "enum_constant"
            | "object_creation_expression"
    )
}

/// Builds the symbol tables of a parsed file.
pub fn build_symbol_tables<'a>(root: Node<'a>, source: &str) -> ScopeTables<'a> {
    let mut tables: HashMap<usize, SymbolTable<'a>> = HashMap::new();
    let mut stack = vec![root];
    // Declarations attach to the nearest enclosing container; bodies and
    // blocks in between are skipped.
    while let Some(node) = stack.pop() {
        collect_declaration(node, source, &mut tables);
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    ScopeTables { tables }
}

fn collect_declaration<'a>(
    node: Node<'a>,
    source: &str,
    tables: &mut HashMap<usize, SymbolTable<'a>>,
) {
    match node.kind() {
        "method_declaration" | "constructor_declaration" | "enum_constant" => {
            let name = field_text(node, "name", source);
            table_of_container(node, tables).add_member(name, node);
        }

        "field_declaration" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "variable_declarator" {
                    let name = field_text(child, "name", source);
                    table_of_container(node, tables).add_member(name, child);
                }
            }
        }

        "class_declaration"
        | "enum_declaration"
        | "interface_declaration"
        | "annotation_type_declaration"
        | "record_declaration"
        | "type_parameter" => {
            let name = declared_type_name(node, source);
            table_of_container(node, tables).add_type(name, node);
        }

        "import_declaration" => {
            // On-demand imports name packages, not types; they add nothing.
            if has_child_of_kind(node, "asterisk") {
                return;
            }
            let Some(name_node) = import_name_node(node) else {
                return;
            };
            let ids = dotted_ids(name_node);
            let Some(last) = ids.last() else { return };
            let name = node_text(*last, source);
            let table = table_of_container(node, tables);
            if has_child_of_kind(node, "static") {
                table.add_member(name, node);
            } else {
                table.add_type(name, node);
            }
        }

        _ => {}
    }
}

fn table_of_container<'a, 't>(
    node: Node<'a>,
    tables: &'t mut HashMap<usize, SymbolTable<'a>>,
) -> &'t mut SymbolTable<'a> {
    let container = enclosing_container(node);
    tables.entry(container.id()).or_default()
}

/// The nearest strict ancestor of `node` that can own a symbol table, or
/// `node`'s root.
fn enclosing_container<'a>(node: Node<'a>) -> Node<'a> {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if is_container(parent.kind()) {
            return parent;
        }
        current = parent;
    }
    current
}

/// The declared name node of a type declaration. Type parameters have no
/// `name` field; their name is the identifier child.
fn declared_type_name<'a, 's>(node: Node<'a>, source: &'s str) -> &'s str {
    if let Some(name) = node.child_by_field_name("name") {
        return node_text(name, source);
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if matches!(child.kind(), "identifier" | "type_identifier") {
            return node_text(child, source);
        }
    }
    ""
}

/// The dotted name of an import declaration.
pub fn import_name_node<'a>(node: Node<'a>) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let result = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"));
    result
}

pub fn has_child_of_kind(node: Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).any(|c| c.kind() == kind);
    result
}

pub fn field_text<'s>(node: Node, field: &str, source: &'s str) -> &'s str {
    node.child_by_field_name(field)
        .map(|n| node_text(n, source))
        .unwrap_or("")
}

pub fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}
