//! Dotted-name chains and class-name conventions.
//!
//! Java references appear in three shapes the extractor cares about: pure
//! type names (`new com.google.Foo()`, `extends Bar`), type-or-expression
//! chains (`ImmutableList.of()`, `Config.DEFAULT.size`), and import names.
//! This module locates the root of each chain in the tree-sitter AST and
//! flattens it to its identifier nodes, and implements the naming
//! convention that splits a dotted name into package and class parts.

use tree_sitter::Node;

/// Collects the identifier leaves of a dotted name node (`identifier` or
/// `scoped_identifier`), in source order. Used for package declarations,
/// import names, and annotation names.
pub fn dotted_ids<'a>(node: Node<'a>) -> Vec<Node<'a>> {
    match node.kind() {
        "identifier" => vec![node],
        "scoped_identifier" => {
            let mut ids = match node.child_by_field_name("scope") {
                Some(scope) => dotted_ids(scope),
                None => Vec::new(),
            };
            if let Some(name) = node.child_by_field_name("name") {
                ids.push(name);
            }
            ids
        }
        _ => Vec::new(),
    }
}

/// Returns the identifier chain of a pure-type name if `node` is the root
/// of one. Type names are `type_identifier` leaves and left-nested
/// `scoped_type_identifier` chains; a chain based on a generic type (e.g.
/// the `.Entry` of `Map<K, V>.Entry`) has no extractable root and yields
/// `None`, while its components are visited on their own.
pub fn type_chain<'a>(node: Node<'a>) -> Option<Vec<Node<'a>>> {
    match node.kind() {
        "type_identifier" | "scoped_type_identifier" => {
            if node
                .parent()
                .is_some_and(|p| p.kind() == "scoped_type_identifier")
            {
                return None; // Part of a larger chain; the root handles it.
            }
            collect_type_chain(node)
        }
        _ => None,
    }
}

fn collect_type_chain<'a>(node: Node<'a>) -> Option<Vec<Node<'a>>> {
    match node.kind() {
        "type_identifier" => Some(vec![node]),
        "scoped_type_identifier" => {
            // Children: <base> '.' annotation* <type_identifier>.
            let mut cursor = node.walk();
            let named: Vec<Node> = node.named_children(&mut cursor).collect();
            let base = named.first()?;
            let name = named.iter().rev().find(|c| c.kind() == "type_identifier")?;
            let mut ids = collect_type_chain(*base)?;
            ids.push(*name);
            Some(ids)
        }
        _ => None,
    }
}

/// Returns the identifier chain of an expression name if `node` is the
/// root of one: a plain identifier or a `field_access` chain of plain
/// identifiers, used in a reference position (not a declaration name, a
/// method name, a label, or part of a larger chain).
pub fn expr_chain<'a>(node: Node<'a>) -> Option<Vec<Node<'a>>> {
    if !matches!(node.kind(), "identifier" | "field_access") {
        return None;
    }
    let parent = node.parent()?;
    match parent.kind() {
        // Never a root: either absorbed into the parent chain, or the
        // field position which only the chain root reports.
        "field_access" => return None,
        // Only the receiver is a name chain; the method name is not.
        "method_invocation" => {
            if parent.child_by_field_name("object") != Some(node) {
                return None;
            }
        }
        // `Foo::bar`: only the left-hand side refers to a type or value.
        "method_reference" => {
            if parent.named_child(0) != Some(node) {
                return None;
            }
        }
        // Declaration names and other non-reference identifiers.
        "variable_declarator"
        | "formal_parameter"
        | "catch_formal_parameter"
        | "enhanced_for_statement"
        | "class_declaration"
        | "interface_declaration"
        | "enum_declaration"
        | "annotation_type_declaration"
        | "record_declaration"
        | "method_declaration"
        | "constructor_declaration"
        | "type_parameter"
        | "enum_constant"
        | "resource" => {
            if parent.child_by_field_name("name") == Some(node) {
                return None;
            }
        }
        "annotation_type_element_declaration" => return None,
        "labeled_statement" | "break_statement" | "continue_statement" => return None,
        // Handled by the import / package / annotation paths.
        "scoped_identifier" | "package_declaration" | "import_declaration" => return None,
        "annotation" | "marker_annotation" => return None,
        // `@Foo(key = value)`: the key is not a reference.
        "element_value_pair" => {
            if parent.child_by_field_name("key") == Some(node) {
                return None;
            }
        }
        // Lambda parameters declare, not reference.
        "lambda_expression" => {
            if parent.child_by_field_name("parameters") == Some(node) {
                return None;
            }
        }
        "inferred_parameters" => return None,
        _ => {}
    }
    pure_chain(node)
}

/// Flattens `node` if it is a chain of plain identifiers joined by field
/// accesses; any other shape (calls, casts, `this`) breaks the chain.
fn pure_chain<'a>(node: Node<'a>) -> Option<Vec<Node<'a>>> {
    match node.kind() {
        "identifier" => Some(vec![node]),
        "field_access" => {
            let object = node.child_by_field_name("object")?;
            let field = node.child_by_field_name("field")?;
            if field.kind() != "identifier" {
                return None;
            }
            let mut ids = pure_chain(object)?;
            ids.push(field);
            Some(ids)
        }
        _ => None,
    }
}

/// Returns a top-level class name from dotted-name parts, with the index
/// of the top-level part.
///
/// A conventional name is a potentially empty all-lower-case package
/// prefix followed by a capitalised simple class name: walking the parts
/// left to right, a part matching `^[A-Z][A-Za-z0-9]*$` ends the walk
/// (everything up to and including it is the class name), an all-lower-case
/// part continues it, and anything else fails.
pub fn extract_top_level_class_name(parts: &[&str]) -> Option<(String, usize)> {
    let mut result: Vec<&str> = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        result.push(part);
        if looks_like_simple_class_name(part) {
            return Some((result.join("."), i));
        }
        if is_lower_case(part) {
            continue;
        }
        return None;
    }
    None
}

/// Returns true if `s` has no upper-case characters.
fn is_lower_case(s: &str) -> bool {
    !s.chars().any(char::is_uppercase)
}

/// Returns true if `s` has the form `^[A-Z][a-zA-Z0-9]*$` (unicode-aware).
fn looks_like_simple_class_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric())
}
