//! The visibility engine.
//!
//! Decides, for (candidate rule, consuming package) pairs, whether the
//! edge is allowed. A lock-free local phase answers most queries from the
//! rule's `visibility` attribute alone; the rest walk package-group
//! inclusion graphs in batched BFS layers, so each layer costs one load
//! and each package group is loaded at most once across all queries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use jadep_core::{Label, Result, Rule};
use jadep_loader::{load_package_groups, Loader};

const PKG_VISIBILITY_NAME: &str = "__pkg__";
const SUBPACKAGES_VISIBILITY_NAME: &str = "__subpackages__";

/// The question "is `rule` visible to the package `pkg`?".
#[derive(Debug, Clone)]
pub struct VisQuery {
    pub rule: Arc<Rule>,
    pub pkg: String,
}

impl VisQuery {
    /// The key identifying this query in the result set.
    pub fn key(&self) -> (Label, String) {
        (self.rule.label(), self.pkg.clone())
    }
}

/// The project-local convention that `javatests/foo` sees `java/foo`.
#[derive(Debug, Clone, Copy)]
pub struct TestMirror {
    enabled: bool,
}

impl TestMirror {
    pub fn enabled() -> TestMirror {
        TestMirror { enabled: true }
    }

    pub fn disabled() -> TestMirror {
        TestMirror { enabled: false }
    }

    fn mirrors(&self, cons_pkg: &str, dep_pkg: &str) -> bool {
        self.enabled
            && cons_pkg.strip_prefix("javatests/").unwrap_or(cons_pkg)
                == dep_pkg.strip_prefix("java/").unwrap_or(dep_pkg)
    }
}

impl Default for TestMirror {
    fn default() -> TestMirror {
        TestMirror::enabled()
    }
}

/// Tri-state answer of a single visibility probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tri {
    No,
    Yes,
    Unknown,
}

/// Answers multiple visibility queries with the minimal number of package
/// loads. Returns the keys of the queries that are visible; everything
/// else is not. The loader should be a caching loader so repeated groups
/// are loaded once.
pub async fn check_visibility(
    loader: &dyn Loader,
    mirror: TestMirror,
    queries: &[VisQuery],
) -> Result<HashSet<(Label, String)>> {
    let mut visible = HashSet::new();
    let mut undecided = Vec::new();

    for query in queries {
        match local_visible_to(mirror, &query.rule, &query.pkg) {
            Tri::Yes => {
                visible.insert(query.key());
            }
            Tri::Unknown => undecided.push(query),
            Tri::No => {}
        }
    }

    // Per-query visited sets; the frontier holds, per query, the package
    // groups to evaluate in the next layer.
    let mut visited: HashMap<usize, HashSet<Label>> = HashMap::new();
    let mut frontier: HashMap<usize, Vec<Label>> = HashMap::new();
    for (idx, query) in undecided.iter().enumerate() {
        let seen = visited.entry(idx).or_default();
        for group_label in query.rule.label_list("visibility") {
            let (_, name) = group_label.split();
            if name == PKG_VISIBILITY_NAME || name == SUBPACKAGES_VISIBILITY_NAME {
                continue;
            }
            if seen.insert(group_label.clone()) {
                frontier.entry(idx).or_default().push(group_label);
            }
        }
    }

    // BFS over package groups. Each layer is handled together to batch
    // loads; a query that becomes decided drops its whole frontier.
    while !frontier.is_empty() {
        let layer_labels: Vec<Label> = {
            let mut labels: Vec<Label> = frontier.values().flatten().cloned().collect();
            labels.sort();
            labels.dedup();
            labels
        };
        debug!("Visibility BFS layer: loading {} group(s)", layer_labels.len());
        let groups = load_package_groups(loader, &layer_labels).await?;

        let mut next: HashMap<usize, Vec<Label>> = HashMap::new();
        for (idx, group_labels) in &frontier {
            let query = undecided[*idx];
            for group_label in group_labels {
                // Missing groups neither grant nor deny.
                let Some(group) = groups.get(group_label) else {
                    continue;
                };
                match spec_visible_to(&group.specs, &query.pkg) {
                    Tri::Yes => {
                        visible.insert(query.key());
                    }
                    Tri::No => {}
                    Tri::Unknown => {
                        let seen = visited.entry(*idx).or_default();
                        for include in &group.includes {
                            if seen.insert(include.clone()) {
                                next.entry(*idx).or_default().push(include.clone());
                            }
                        }
                    }
                }
            }
        }
        next.retain(|idx, _| !visible.contains(&undecided[*idx].key()));
        frontier = next;
    }

    Ok(visible)
}

/// Checks whether `dep` is visible to `cons_pkg_name` without loading
/// packages, considering only individual entries of its `visibility`.
fn local_visible_to(mirror: TestMirror, dep: &Rule, cons_pkg_name: &str) -> Tri {
    if cons_pkg_name == dep.pkg_name || mirror.mirrors(cons_pkg_name, &dep.pkg_name) {
        return Tri::Yes;
    }

    let vis = dep.label_list("visibility");
    if vis.is_empty() {
        return Tri::No;
    }
    for v in &vis {
        if v.as_str() == "//visibility:public" || v.as_str() == "//visibility:legacy_public" {
            return Tri::Yes;
        }
        if v.as_str() == "//visibility:private" {
            return Tri::No;
        }
        let (vis_pkg, vis_name) = v.split();
        if vis_name == PKG_VISIBILITY_NAME && vis_pkg == cons_pkg_name {
            return Tri::Yes;
        }
        if vis_name == SUBPACKAGES_VISIBILITY_NAME && sub_package_of(cons_pkg_name, vis_pkg) {
            return Tri::Yes;
        }
    }

    Tri::Unknown
}

/// Returns `Yes` if any package-group spec grants visibility to
/// `cons_pkg_name`, e.g. specs `["x/..."]` grant to `x/subx`.
fn spec_visible_to(specs: &[String], cons_pkg_name: &str) -> Tri {
    for spec in specs {
        if spec == "//..." || spec == cons_pkg_name {
            return Tri::Yes;
        }
        if let Some(prefix) = spec.strip_suffix("/...") {
            if sub_package_of(cons_pkg_name, prefix) {
                return Tri::Yes;
            }
        }
    }
    Tri::Unknown
}

/// Returns true if `subpackage` is a sub-package of `pkg`:
/// `sub_package_of("a/b", "a")` and `sub_package_of("a", "a")` hold,
/// `sub_package_of("a", "a/b")` does not.
fn sub_package_of(subpackage: &str, pkg: &str) -> bool {
    if subpackage == pkg || pkg.is_empty() {
        return true;
    }
    subpackage
        .strip_prefix(pkg)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jadep_core::{AttrValue, PackageGroup};
    use jadep_loader::testing::FakeLoader;

    fn rule_with_visibility(pkg_name: &str, name: &str, visibility: &[&str]) -> Arc<Rule> {
        let attrs = HashMap::from([(
            "visibility".to_string(),
            AttrValue::ListOfStrings(visibility.iter().map(|s| s.to_string()).collect()),
        )]);
        Arc::new(Rule::new("java_library", pkg_name, name, attrs))
    }

    fn group(specs: &[&str], includes: &[&str]) -> PackageGroup {
        PackageGroup {
            specs: specs.iter().map(|s| s.to_string()).collect(),
            includes: includes
                .iter()
                .map(|s| Label::parse_absolute(s).unwrap())
                .collect(),
        }
    }

    fn query(rule: &Arc<Rule>, pkg: &str) -> VisQuery {
        VisQuery {
            rule: Arc::clone(rule),
            pkg: pkg.to_string(),
        }
    }

    #[tokio::test]
    async fn test_local_phase_decisions() {
        let mirror = TestMirror::enabled();
        let cases: Vec<(Arc<Rule>, &str, Tri)> = vec![
            // Same package.
            (rule_with_visibility("y", "d", &[]), "y", Tri::Yes),
            // javatests mirror.
            (
                rule_with_visibility("java/com/g", "d", &[]),
                "javatests/com/g",
                Tri::Yes,
            ),
            // Empty visibility is private.
            (rule_with_visibility("y", "d", &[]), "x", Tri::No),
            (
                rule_with_visibility("y", "d", &["//visibility:public"]),
                "x",
                Tri::Yes,
            ),
            (
                rule_with_visibility("y", "d", &["//visibility:legacy_public"]),
                "x",
                Tri::Yes,
            ),
            (
                rule_with_visibility("y", "d", &["//visibility:private"]),
                "x",
                Tri::No,
            ),
            // E2: __pkg__ grants exactly x, not x/subx.
            (
                rule_with_visibility("y", "d", &["//x:__pkg__"]),
                "x",
                Tri::Yes,
            ),
            (
                rule_with_visibility("y", "d", &["//x:__pkg__"]),
                "x/subx",
                Tri::Unknown,
            ),
            (
                rule_with_visibility("y", "d", &["//x:__subpackages__"]),
                "x/subx",
                Tri::Yes,
            ),
            (
                rule_with_visibility("y", "d", &["//x:some_group"]),
                "x",
                Tri::Unknown,
            ),
        ];
        for (rule, pkg, want) in cases {
            assert_eq!(
                local_visible_to(mirror, &rule, pkg),
                want,
                "rule {:?} pkg {pkg}",
                rule.label()
            );
        }
    }

    #[tokio::test]
    async fn test_mirror_can_be_disabled() {
        let rule = rule_with_visibility("java/com/g", "d", &[]);
        assert_eq!(
            local_visible_to(TestMirror::disabled(), &rule, "javatests/com/g"),
            Tri::No
        );
    }

    #[tokio::test]
    async fn test_local_decisions_load_nothing() {
        let loader = Arc::new(FakeLoader::new());
        let rule = rule_with_visibility("y", "d", &["//visibility:public"]);
        let visible = check_visibility(&loader, TestMirror::enabled(), &[query(&rule, "x")])
            .await
            .unwrap();
        assert!(visible.contains(&(rule.label(), "x".to_string())));
        assert_eq!(loader.call_count(), 0);
    }

    // E3: an exact spec grants to the exact package, a /... spec to
    // subpackages.
    #[tokio::test]
    async fn test_package_group_specs() {
        let mut fake = FakeLoader::new();
        fake.add_package_group("y", "exact", group(&["x"], &[]));
        fake.add_package_group("y", "subtree", group(&["x/..."], &[]));
        let loader = Arc::new(fake);

        let exact_rule = rule_with_visibility("y", "d1", &["//y:exact"]);
        let subtree_rule = rule_with_visibility("y", "d2", &["//y:subtree"]);
        let visible = check_visibility(
            &loader,
            TestMirror::enabled(),
            &[
                query(&exact_rule, "x"),
                query(&exact_rule, "x/subx"),
                query(&subtree_rule, "x/subx"),
            ],
        )
        .await
        .unwrap();
        assert!(visible.contains(&(exact_rule.label(), "x".to_string())));
        assert!(!visible.contains(&(exact_rule.label(), "x/subx".to_string())));
        assert!(visible.contains(&(subtree_rule.label(), "x/subx".to_string())));
    }

    // E4: one batched load decides the query; the included group in w is
    // never loaded because y's group already granted.
    #[tokio::test]
    async fn test_bfs_stops_once_decided() {
        let mut fake = FakeLoader::new();
        fake.add_package_group("y", "group", group(&["x"], &[]));
        fake.add_package_group("z", "group", group(&[], &["//w:group"]));
        let loader = Arc::new(fake);
        let rule = rule_with_visibility("y", "D2", &["//y:group", "//z:group"]);

        let visible = check_visibility(&loader, TestMirror::enabled(), &[query(&rule, "x")])
            .await
            .unwrap();
        assert!(visible.contains(&(rule.label(), "x".to_string())));
        assert_eq!(loader.call_count(), 1);
        assert!(loader.loaded("y"));
        assert!(loader.loaded("z"));
        assert!(!loader.loaded("w"));
    }

    #[tokio::test]
    async fn test_includes_walked_when_needed() {
        let mut fake = FakeLoader::new();
        fake.add_package_group("y", "group", group(&[], &["//w:group"]));
        fake.add_package_group("w", "group", group(&["x/..."], &[]));
        let loader = Arc::new(fake);
        let rule = rule_with_visibility("y", "d", &["//y:group"]);

        let visible = check_visibility(&loader, TestMirror::enabled(), &[query(&rule, "x/subx")])
            .await
            .unwrap();
        assert!(visible.contains(&(rule.label(), "x/subx".to_string())));
        // Two layers: {y}, then {w}.
        assert_eq!(loader.call_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_groups_are_tolerated() {
        let loader = Arc::new(FakeLoader::new());
        let rule = rule_with_visibility("y", "d", &["//nowhere:group"]);
        let visible = check_visibility(&loader, TestMirror::enabled(), &[query(&rule, "x")])
            .await
            .unwrap();
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn test_include_cycles_terminate() {
        let mut fake = FakeLoader::new();
        fake.add_package_group("a", "g", group(&[], &["//b:g"]));
        fake.add_package_group("b", "g", group(&[], &["//a:g"]));
        let loader = Arc::new(fake);
        let rule = rule_with_visibility("a", "d", &["//a:g"]);
        let visible = check_visibility(&loader, TestMirror::enabled(), &[query(&rule, "x")])
            .await
            .unwrap();
        assert!(visible.is_empty());
    }
}
