//! Bazel rule and package model.
//!
//! Rules carry an untyped attribute map as returned by the package server;
//! the typed accessors downcast at the boundary and treat type mismatches
//! as absent attributes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::label::Label;

/// A rule attribute value.
///
/// `Unknown` stands for an attribute that is present but whose value can't
/// be represented, e.g. `deps = select(...)` with no default branch.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    String(String),
    Int(i32),
    Bool(bool),
    ListOfStrings(Vec<String>),
    Unknown,
}

/// A Bazel rule: kind, containing package, and attributes.
///
/// The `name` attribute is always populated.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// The kind of the rule, e.g. `java_library`.
    pub kind: String,
    /// Name of the containing package, e.g. `java/com/foo`.
    pub pkg_name: String,
    /// Attribute name → value, e.g. `srcs` → list of file names.
    pub attrs: HashMap<String, AttrValue>,
}

impl Rule {
    /// Creates a new rule, populating the `name` attribute.
    pub fn new(
        kind: impl Into<String>,
        pkg_name: impl Into<String>,
        rule_name: impl Into<String>,
        attributes: HashMap<String, AttrValue>,
    ) -> Rule {
        let mut attrs = attributes;
        attrs.insert("name".to_string(), AttrValue::String(rule_name.into()));
        Rule {
            kind: kind.into(),
            pkg_name: pkg_name.into(),
            attrs,
        }
    }

    /// The name of the rule (e.g. `collect`).
    pub fn name(&self) -> &str {
        match self.attrs.get("name") {
            Some(AttrValue::String(s)) => s,
            _ => "",
        }
    }

    /// The label of the rule (e.g. `//java:collect`).
    pub fn label(&self) -> Label {
        Label::from_parts(&self.pkg_name, self.name())
    }

    /// Returns a list-of-strings attribute, or an empty list if the
    /// attribute is missing or not a strict list (e.g., a selector).
    pub fn string_list(&self, attr_name: &str) -> &[String] {
        match self.attrs.get(attr_name) {
            Some(AttrValue::ListOfStrings(v)) => v,
            _ => &[],
        }
    }

    /// Returns a list attribute parsed as labels relative to the rule's
    /// package. Ill-formed entries are silently discarded.
    pub fn label_list(&self, attr_name: &str) -> Vec<Label> {
        self.string_list(attr_name)
            .iter()
            .filter_map(|s| Label::parse_relative(&self.pkg_name, s).ok())
            .collect()
    }

    /// Returns a boolean attribute, or `default` on absence or type mismatch.
    pub fn bool_attr(&self, attr_name: &str, default: bool) -> bool {
        match self.attrs.get(attr_name) {
            Some(AttrValue::Bool(b)) => *b,
            _ => default,
        }
    }

    /// Returns an integer attribute, or `default` on absence or type mismatch.
    pub fn int_attr(&self, attr_name: &str, default: i32) -> i32 {
        match self.attrs.get(attr_name) {
            Some(AttrValue::Int(i)) => *i,
            _ => default,
        }
    }

    /// Returns a string attribute, or `default` on absence or type mismatch.
    pub fn str_attr<'a>(&'a self, attr_name: &str, default: &'a str) -> &'a str {
        match self.attrs.get(attr_name) {
            Some(AttrValue::String(s)) => s,
            _ => default,
        }
    }

    /// Returns a string attribute parsed as a label relative to the rule's
    /// package. Unlike [`Rule::label_list`], failures are reported.
    pub fn label_attr(&self, attr_name: &str) -> Result<Label> {
        let val = match self.attrs.get(attr_name) {
            Some(AttrValue::String(s)) => s,
            _ => {
                return Err(Error::attribute(format!(
                    "{}'s {attr_name} is not a string, can't parse to label",
                    self.label()
                )))
            }
        };
        Label::parse_relative(&self.pkg_name, val).map_err(|e| {
            Error::attribute(format!(
                "can't read {}'s {attr_name} as label: {e}",
                self.label()
            ))
        })
    }
}

/// A Bazel package, as interpreted by the package server.
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Source path of the package directory.
    pub path: String,
    /// The package's `default_visibility`.
    pub default_visibility: Vec<Label>,
    /// Base file name → owning rule name; the empty string for source files.
    pub files: HashMap<String, String>,
    /// Rule name → rule.
    pub rules: HashMap<String, Arc<Rule>>,
    /// Package group name → group.
    pub package_groups: HashMap<String, PackageGroup>,
}

/// A `package_group()` call in a BUILD file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageGroup {
    /// Package specs: `foo/bar`, `foo/...` or `//...` for `"//foo/bar"`,
    /// `"//foo/..."` and `"//..."` respectively. (`//foo:bar` is illegal.)
    pub specs: Vec<String>,
    /// Labels of included package groups.
    pub includes: Vec<Label>,
}
