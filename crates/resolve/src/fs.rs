//! Filesystem resolver: class names to rules via content roots.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use jadep_core::{ClassName, Result, Rule};
use jadep_filter::java_kinds;
use jadep_loader::{siblings, Loader};

use crate::{ConsumingRules, Resolver};

/// Resolves class names by looking at the local file system: class
/// `a.b.c.D` maps to `<content root>/a/b/c/D.java`, whose containing
/// package is searched for rules that consume the file.
pub struct FsResolver {
    /// Workspace-relative directories where Java files live.
    content_roots: Vec<String>,
    /// Path to the root of the Bazel workspace.
    workspace_dir: PathBuf,
    loader: Arc<dyn Loader>,
}

impl FsResolver {
    pub fn new(
        content_roots: Vec<String>,
        workspace_dir: impl Into<PathBuf>,
        loader: Arc<dyn Loader>,
    ) -> FsResolver {
        FsResolver {
            content_roots,
            workspace_dir: workspace_dir.into(),
            loader,
        }
    }
}

#[async_trait]
impl Resolver for FsResolver {
    fn name(&self) -> &str {
        "file system"
    }

    async fn resolve(
        &self,
        class_names: &[ClassName],
        _consuming_rules: &ConsumingRules,
    ) -> Result<HashMap<ClassName, Vec<Arc<Rule>>>> {
        let mut class_to_files: HashMap<&ClassName, Vec<String>> = HashMap::new();
        let mut file_names = Vec::new();
        for class in class_names {
            let candidates = class_to_file_names(&self.content_roots, class);
            file_names.extend(candidates.iter().cloned());
            class_to_files.insert(class, candidates);
        }

        let (packages, file_to_pkg_name) =
            siblings(&*self.loader, &self.workspace_dir, &file_names).await?;

        let mut result: HashMap<ClassName, Vec<Arc<Rule>>> = HashMap::new();
        for class in class_names {
            for file_name in &class_to_files[class] {
                let Some(pkg_name) = file_to_pkg_name.get(file_name) else {
                    continue;
                };
                let Some(pkg) = packages.get(pkg_name) else {
                    debug!("Package {pkg_name} for file {file_name} was not returned from loader");
                    continue;
                };
                let Ok(relative) = Path::new(file_name).strip_prefix(pkg_name) else {
                    continue;
                };
                let relative_file_name = relative.to_string_lossy().into_owned();

                // Edges: file → rule that srcs it, filegroup name → rule
                // that srcs the filegroup (one level), exported name →
                // exporting rule.
                let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
                for (rule_name, rule) in &pkg.rules {
                    for exported in rule.string_list("exports") {
                        graph.entry(exported).or_default().push(rule_name);
                    }
                    for src in rule.string_list("srcs") {
                        if *src == relative_file_name {
                            graph
                                .entry(relative_file_name.as_str())
                                .or_default()
                                .push(rule_name);
                        }
                        if let Some(src_rule) = pkg.rules.get(src) {
                            if src_rule.kind == "filegroup" {
                                graph.entry(src).or_default().push(rule_name);
                            }
                        }
                    }
                }

                dfs(&graph, &relative_file_name, |node| {
                    if let Some(rule) = pkg.rules.get(node) {
                        if java_kinds().is_dependency_kind(&rule.kind) {
                            result.entry(class.clone()).or_default().push(Arc::clone(rule));
                        }
                    }
                });
            }
        }
        Ok(result)
    }
}

/// Converts a class name into candidate file names, one per content root:
/// content root `java` and class `com.Foo` give `java/com/Foo.java`.
fn class_to_file_names(content_roots: &[String], class_name: &ClassName) -> Vec<String> {
    content_roots
        .iter()
        .map(|root| {
            let mut path = PathBuf::from(root);
            for segment in class_name.as_str().split('.') {
                path.push(segment);
            }
            format!("{}.java", path.to_string_lossy())
        })
        .collect()
}

/// Depth-first search over `graph` from `start`, calling `visit` on every
/// reachable node.
fn dfs<'g>(graph: &HashMap<&'g str, Vec<&'g str>>, start: &'g str, mut visit: impl FnMut(&str)) {
    let mut stack = vec![start];
    let mut seen: HashSet<&str> = HashSet::new();
    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        visit(node);
        if let Some(next) = graph.get(node) {
            stack.extend(next.iter().copied());
        }
    }
}
