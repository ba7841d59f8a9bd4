//! In-memory fakes for loader-dependent tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jadep_core::{AttrValue, Package, PackageGroup, Result, Rule};

use crate::Loader;

/// Creates a rule with list attributes, as if returned by a package server.
pub fn rule_with(
    kind: &str,
    pkg_name: &str,
    name: &str,
    list_attrs: &[(&str, &[&str])],
) -> Arc<Rule> {
    let attrs = list_attrs
        .iter()
        .map(|(attr, values)| {
            (
                attr.to_string(),
                AttrValue::ListOfStrings(values.iter().map(|s| s.to_string()).collect()),
            )
        })
        .collect();
    Arc::new(Rule::new(kind, pkg_name, name, attrs))
}

/// Creates a `java_library` rule.
pub fn java_library(
    pkg_name: &str,
    name: &str,
    srcs: &[&str],
    deps: &[&str],
    exports: &[&str],
) -> Arc<Rule> {
    rule_with(
        "java_library",
        pkg_name,
        name,
        &[("srcs", srcs), ("deps", deps), ("exports", exports)],
    )
}

/// Creates a Bazel package from a list of rules, as if returned by a
/// package server: files are derived from the rules' `srcs`.
pub fn pkg(rules: Vec<Arc<Rule>>) -> Package {
    let mut files = HashMap::from([("BUILD".to_string(), String::new())]);
    let mut pkg_rules = HashMap::new();
    let mut path = String::new();
    for rule in rules {
        for src in rule.string_list("srcs") {
            files.insert(src.clone(), String::new());
        }
        path = rule.pkg_name.clone();
        pkg_rules.insert(rule.name().to_string(), rule);
    }
    Package {
        path,
        default_visibility: vec![],
        files,
        rules: pkg_rules,
        package_groups: HashMap::new(),
    }
}

/// A loader backed by an in-memory package map. Records every `load` call
/// so tests can assert on batching and load counts.
#[derive(Default)]
pub struct FakeLoader {
    pkgs: HashMap<String, Arc<Package>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeLoader {
    pub fn new() -> FakeLoader {
        FakeLoader::default()
    }

    pub fn add_package(&mut self, name: &str, package: Package) {
        self.pkgs.insert(name.to_string(), Arc::new(package));
    }

    pub fn add_package_group(&mut self, pkg_name: &str, group_name: &str, group: PackageGroup) {
        let entry = self
            .pkgs
            .entry(pkg_name.to_string())
            .or_insert_with(|| Arc::new(Package::default()));
        let mut package = (**entry).clone();
        package.package_groups.insert(group_name.to_string(), group);
        *entry = Arc::new(package);
    }

    /// The batches `load` was called with, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Total number of `load` calls.
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// Whether any recorded batch requested `pkg_name`.
    pub fn loaded(&self, pkg_name: &str) -> bool {
        self.calls()
            .iter()
            .any(|batch| batch.iter().any(|p| p == pkg_name))
    }
}

#[async_trait]
impl Loader for FakeLoader {
    async fn load(&self, packages: &[String]) -> Result<HashMap<String, Arc<Package>>> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(packages.to_vec());
        Ok(packages
            .iter()
            .filter_map(|p| self.pkgs.get(p).map(|pkg| (p.clone(), Arc::clone(pkg))))
            .collect())
    }
}

/// A loader that always fails. Used to exercise error paths.
pub struct FailingLoader;

#[async_trait]
impl Loader for FailingLoader {
    async fn load(&self, _packages: &[String]) -> Result<HashMap<String, Arc<Package>>> {
        Err(jadep_core::Error::load("injected failure"))
    }
}
