//! Third-party graph resolver.
//!
//! Resolves class names to precompiled jars set up bazel-deps style: at
//! construction it loads every package under a third-party directory and
//! follows `java_library` → `exports`, `bind` → `actual` and `java_import`
//! → `jars` edges to a fixed point, indexing jar contents. At query time
//! it maps a class to its terminal rule, then walks parent pointers back
//! to the root rule user code should depend on.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use jadep_core::{ClassName, Error, Label, Package, Result, Rule};
use jadep_loader::{load_rules, Loader};

use crate::jar::list_classes;
use crate::{ConsumingRules, Resolver};

/// Resolves class names according to a bazel-deps style third-party
/// directory structure.
pub struct ThirdPartyResolver {
    /// Parent pointers of the rule graph; first visit wins, so the chains
    /// form a forest.
    parent: HashMap<Label, Label>,
    rules_by_label: HashMap<Label, Arc<Rule>>,
    class_to_rule: HashMap<ClassName, Arc<Rule>>,
    /// Jars listed by `java_import` rules that could not be opened.
    missing_jars: AtomicU64,
}

impl ThirdPartyResolver {
    /// Builds the resolver by BFS over the rule graph rooted at the
    /// packages under `third_party_dir` (a path relative to
    /// `workspace_dir`, e.g. `thirdparty/jvm`).
    pub async fn new(
        workspace_dir: &Path,
        third_party_dir: &str,
        loader: Arc<dyn Loader>,
    ) -> Result<ThirdPartyResolver> {
        if Path::new(third_party_dir).is_absolute() {
            return Err(Error::invalid_input(format!(
                "third-party dir {third_party_dir} must be a relative path"
            )));
        }
        let stopwatch = Instant::now();

        // bazel-deps always references 'external'; warm the cache early.
        let prefetch = Arc::clone(&loader);
        tokio::spawn(async move {
            let _ = prefetch.load(&["external".to_string()]).await;
        });

        let dirs = all_packages(workspace_dir, third_party_dir);
        let mut pkgs = loader.load(&dirs).await?;

        let mut resolver = ThirdPartyResolver {
            parent: HashMap::new(),
            rules_by_label: HashMap::new(),
            class_to_rule: HashMap::new(),
            missing_jars: AtomicU64::new(0),
        };

        let mut layer: Vec<Arc<Rule>> = pkgs
            .values()
            .flat_map(|pkg| pkg.rules.values().cloned())
            .collect();
        // First visit wins, and the initial layer counts as visited: this
        // keeps the parent pointers acyclic even when rules export each
        // other.
        let mut seen_labels: HashSet<Label> = layer.iter().map(|r| r.label()).collect();

        while !layer.is_empty() {
            let mut parent_labels: HashMap<Label, Arc<Rule>> = HashMap::new();
            for rule in &layer {
                resolver.rules_by_label.insert(rule.label(), Arc::clone(rule));
                let mut candidates: Vec<Label> = Vec::new();
                match rule.kind.as_str() {
                    "java_library" => candidates.extend(rule.label_list("exports")),
                    "bind" => {
                        if let Ok(actual) = rule.label_attr("actual") {
                            candidates.push(actual);
                        }
                    }
                    "java_import" => resolver.list_jars(workspace_dir, rule, &pkgs),
                    _ => {}
                }
                for candidate in candidates {
                    if seen_labels.insert(candidate.clone()) {
                        parent_labels.insert(candidate, Arc::clone(rule));
                    }
                }
            }

            // Load the rules of the next layer in one batch.
            let to_load: Vec<Label> = parent_labels.keys().cloned().collect();
            let (rules, new_pkgs) = load_rules(&*loader, &to_load).await?;
            pkgs.extend(new_pkgs);

            let mut next_layer = Vec::new();
            for (child_label, parent_rule) in parent_labels {
                if let Some(child) = rules.get(&child_label) {
                    resolver
                        .parent
                        .insert(child_label, parent_rule.label());
                    next_layer.push(Arc::clone(child));
                }
            }
            layer = next_layer;
        }
        info!(
            "Created third-party resolver ({}ms)",
            stopwatch.elapsed().as_millis()
        );

        Ok(resolver)
    }

    /// Indexes the classes of every jar a `java_import` rule lists.
    fn list_jars(
        &mut self,
        workspace_dir: &Path,
        rule: &Arc<Rule>,
        pkgs: &HashMap<String, Arc<Package>>,
    ) {
        let Some(pkg) = pkgs.get(&rule.pkg_name) else {
            warn!(
                "can't find package object for rule {} - this is a bug in the third-party resolver",
                rule.label()
            );
            return;
        };
        for jar in rule.string_list("jars") {
            let file_name = jar_path(workspace_dir, &pkg.path, jar);
            match list_classes(&file_name) {
                Ok(classes) => {
                    for class in classes {
                        self.class_to_rule.insert(class, Arc::clone(rule));
                    }
                }
                Err(_) => {
                    self.missing_jars.fetch_add(1, Ordering::Relaxed);
                    warn!("unable to list classes in jar {}", file_name.display());
                }
            }
        }
    }

    /// How many jars could not be listed during construction.
    pub fn missing_jars(&self) -> u64 {
        self.missing_jars.load(Ordering::Relaxed)
    }

    /// The root of `rule`'s parent chain.
    fn root_of(&self, rule: &Arc<Rule>) -> Arc<Rule> {
        let mut current = rule.label();
        let mut hops = 0;
        while let Some(parent) = self.parent.get(&current) {
            current = parent.clone();
            hops += 1;
            if hops > self.parent.len() {
                // The chain left the forest; don't spin.
                break;
            }
        }
        self.rules_by_label
            .get(&current)
            .cloned()
            .unwrap_or_else(|| Arc::clone(rule))
    }
}

#[async_trait]
impl Resolver for ThirdPartyResolver {
    fn name(&self) -> &str {
        "third-party graph"
    }

    async fn resolve(
        &self,
        class_names: &[ClassName],
        _consuming_rules: &ConsumingRules,
    ) -> Result<HashMap<ClassName, Vec<Arc<Rule>>>> {
        let mut result = HashMap::new();
        for class in class_names {
            if let Some(rule) = self.class_to_rule.get(class) {
                result.insert(class.clone(), vec![self.root_of(rule)]);
            }
        }
        Ok(result)
    }
}

/// All directories rooted at `workspace_dir/dir`, as workspace-relative
/// package names.
fn all_packages(workspace_dir: &Path, dir: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut stack = vec![workspace_dir.join(dir)];
    while let Some(current) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        if let Ok(relative) = current.strip_prefix(workspace_dir) {
            result.push(relative.to_string_lossy().into_owned());
        }
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            }
        }
    }
    result.sort();
    result
}

/// The on-disk path of a jar referenced by a rule in `pkg_path`.
fn jar_path(workspace_dir: &Path, pkg_path: &str, jar: &str) -> PathBuf {
    let pkg = Path::new(pkg_path);
    if pkg.is_absolute() {
        pkg.join(jar)
    } else {
        workspace_dir.join(pkg).join(jar)
    }
}
