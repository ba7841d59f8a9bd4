//! Extraction of externally-referenced class names from Java sources.
//!
//! The extractor parses each file, builds symbol tables over the AST,
//! partially resolves identifiers against them, and reports the dotted
//! names whose first segment did not bind locally: the classes the file
//! needs dependencies for.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::warn;
use tree_sitter::Node;

use jadep_core::{ClassName, Error, Result};

mod names;
mod resolve;
mod scopes;

pub use names::extract_top_level_class_name;

use names::{dotted_ids, expr_chain, type_chain};
use resolve::Bindings;
use scopes::{build_symbol_tables, has_child_of_kind, import_name_node, node_text};

const PARSE_CONCURRENCY: usize = 8;

/// Returns the set of class names that the given Java files reference:
/// imports, simple names that look like class names (assumed to be in the
/// file's package), and fully-qualified names. Files are parsed
/// concurrently; unparseable files are logged and skipped.
///
/// `implicit_imports` is a sorted list of simple names that need no import
/// (the `java.lang` classes, e.g. `String` and `Integer`).
pub async fn referenced_classes(
    java_file_names: &[PathBuf],
    implicit_imports: &[String],
) -> Vec<ClassName> {
    let per_file: Vec<Vec<String>> = stream::iter(java_file_names.iter())
        .map(|file_name| async move {
            let source = match tokio::fs::read_to_string(file_name).await {
                Ok(source) => source,
                Err(e) => {
                    warn!("Error reading {:?}: {e}", file_name);
                    return Vec::new();
                }
            };
            match referenced_classes_in_source(&file_name.to_string_lossy(), &source, implicit_imports)
            {
                Ok(classes) => classes,
                Err(e) => {
                    warn!("Error parsing {:?}: {e}", file_name);
                    Vec::new()
                }
            }
        })
        .buffer_unordered(PARSE_CONCURRENCY)
        .collect()
        .await;

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for classes in per_file {
        for class in classes {
            if seen.insert(class.clone()) {
                result.push(ClassName::new(class));
            }
        }
    }
    result
}

/// Returns the class names a single Java source references. The `path`
/// parameter is only used to tag errors.
pub fn referenced_classes_in_source(
    path: &str,
    source: &str,
    implicit_imports: &[String],
) -> Result<Vec<String>> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| Error::parse(path, format!("cannot load Java grammar: {e}")))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::parse(path, "parser returned no tree"))?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(Error::parse(path, "syntax error"));
    }

    let package = package_name(root, source);
    let tables = build_symbol_tables(root, source);
    let bindings = resolve::resolve(root, source, &tables);

    let mut emit = Emit {
        source,
        package: &package,
        implicit_imports,
        bindings: &bindings,
        seen: HashSet::new(),
        result: Vec::new(),
    };
    // Classes defined in this file are never reported in qualified form.
    if !package.is_empty() {
        if let Some(root_table) = tables.get(root) {
            for class_name in root_table.types.keys() {
                emit.seen.insert(format!("{package}.{class_name}"));
            }
        }
    }
    emit.visit(root);
    Ok(emit.result)
}

/// The package name of a parsed file, e.g. `com.google.common.collect`,
/// or the empty string.
fn package_name(root: Node, source: &str) -> String {
    let mut cursor = root.walk();
    let Some(package_decl) = root
        .named_children(&mut cursor)
        .find(|c| c.kind() == "package_declaration")
    else {
        return String::new();
    };
    let Some(name_node) = import_name_node(package_decl) else {
        return String::new();
    };
    join_ids(&dotted_ids(name_node), source)
}

fn join_ids(ids: &[Node], source: &str) -> String {
    ids.iter()
        .map(|id| node_text(*id, source))
        .collect::<Vec<_>>()
        .join(".")
}

/// The emission walk: reports unbound type names, unbound expression
/// names that follow the class-name convention, and imports.
struct Emit<'b, 'a> {
    source: &'b str,
    package: &'b str,
    implicit_imports: &'b [String],
    bindings: &'b Bindings<'a>,
    seen: HashSet<String>,
    result: Vec<String>,
}

impl<'b, 'a> Emit<'b, 'a> {
    fn visit(&mut self, node: Node<'a>) {
        match node.kind() {
            "import_declaration" => self.visit_import(node),
            "annotation" | "marker_annotation" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let ids = dotted_ids(name);
                    if !ids.is_empty() {
                        self.visit_type_name(&ids);
                    }
                }
            }
            "package_declaration" => return,
            _ => {
                if let Some(ids) = type_chain(node) {
                    self.visit_type_name(&ids);
                } else if let Some(ids) = expr_chain(node) {
                    self.visit_expr_name(&ids);
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    /// A pure-type position: the grammar guarantees this is a class name,
    /// so an unconventional name is reported verbatim.
    fn visit_type_name(&mut self, ids: &[Node<'a>]) {
        if self.bindings.contains_key(&ids[0].id()) {
            return;
        }
        let parts: Vec<&str> = ids.iter().map(|id| node_text(*id, self.source)).collect();
        match extract_top_level_class_name(&parts) {
            None => {
                let class_name = parts.join(".");
                self.insert(class_name);
            }
            Some((class_name, index)) => self.emit_extracted(class_name, index),
        }
    }

    /// A type-or-expression or expression position: only names that follow
    /// the class-name convention are worth reporting.
    fn visit_expr_name(&mut self, ids: &[Node<'a>]) {
        if self.bindings.contains_key(&ids[0].id()) {
            return;
        }
        let parts: Vec<&str> = ids.iter().map(|id| node_text(*id, self.source)).collect();
        if let Some((class_name, index)) = extract_top_level_class_name(&parts) {
            self.emit_extracted(class_name, index);
        }
    }

    fn emit_extracted(&mut self, class_name: String, index: usize) {
        if index == 0 {
            if self.is_implicit(&class_name) {
                return;
            }
            if self.package.is_empty() {
                self.insert(class_name);
            } else {
                self.insert(format!("{}.{class_name}", self.package));
            }
        } else {
            self.insert(class_name);
        }
    }

    fn visit_import(&mut self, node: Node<'a>) {
        let Some(name_node) = import_name_node(node) else {
            return;
        };
        let ids = dotted_ids(name_node);
        if ids.is_empty() {
            return;
        }
        let on_demand = has_child_of_kind(node, "asterisk");
        let is_static = has_child_of_kind(node, "static");
        let parts: Vec<&str> = ids.iter().map(|id| node_text(*id, self.source)).collect();
        match extract_top_level_class_name(&parts) {
            Some((class_name, _)) => self.insert(class_name),
            None => {
                // A non-static on-demand import names a package; nothing to
                // report. Everything else is a class name we can't chop, so
                // report it whole.
                if on_demand && !is_static {
                    return;
                }
                self.insert(parts.join("."));
            }
        }
    }

    fn is_implicit(&self, simple_name: &str) -> bool {
        self.implicit_imports
            .binary_search_by(|probe| probe.as_str().cmp(simple_name))
            .is_ok()
    }

    fn insert(&mut self, class_name: String) {
        if self.seen.insert(class_name.clone()) {
            self.result.push(class_name);
        }
    }
}
