//! The orchestrator: finds the BUILD labels that provide the class names a
//! Java file references, filters and ranks them, and prepares the edits.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;

use jadep_core::{ClassName, FutureValue};
use jadep_filter::TestMirror;
use jadep_loader::Loader;
use jadep_resolve::{Dict, Resolver};

mod interact;
mod missing_deps;
mod ranker;
mod rules;

pub use interact::select_deps_to_add;
pub use missing_deps::{missing_deps, unfiltered_missing_deps, MissingDeps};
pub use ranker::{DepsRanker, SortingRanker};
pub use rules::{
    create_rule, java_naming_rules, kind_for_new_rule, rules_consuming_file, NamingRule,
    DEFAULT_NEW_RULE_KIND,
};

/// Everything the orchestrator needs for one invocation.
pub struct Config {
    /// Path to the root of the Bazel workspace.
    pub workspace_dir: PathBuf,

    /// Loads BUILD files. Should be a caching loader: the engine issues
    /// overlapping load batches and relies on deduplication.
    pub loader: Arc<dyn Loader>,

    /// The resolvers to run, in order.
    pub resolvers: Vec<Arc<dyn Resolver>>,

    /// Ranks candidate dependencies before they are shown to the user.
    pub ranker: Arc<dyn DepsRanker>,

    /// Whether `javatests/...` packages implicitly see `java/...`.
    pub test_mirror: TestMirror,
}

/// The set of simple names Java programs use without importing: the
/// single-segment `java.lang` classes of the built-in dictionary, sorted.
pub fn implicit_imports(dict: &FutureValue<Dict>) -> FutureValue<Vec<String>> {
    let dict = dict.clone();
    FutureValue::spawn(async move {
        let mut result = Vec::new();
        if let Ok(dict) = dict.get().await {
            for class in dict.keys() {
                if let Some(simple) = class.as_str().strip_prefix("java.lang.") {
                    if !simple.is_empty() && !simple.contains('.') {
                        result.push(simple.to_string());
                    }
                }
            }
        }
        result.sort();
        result
    })
}

/// Drops class names matching any of the blacklist regexes.
pub fn exclude_class_names(blacklist: &[Regex], class_names: Vec<ClassName>) -> Vec<ClassName> {
    class_names
        .into_iter()
        .filter(|class| !blacklist.iter().any(|re| re.is_match(class.as_str())))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jadep_core::Label;

    #[tokio::test]
    async fn test_implicit_imports() {
        let dict = Dict::from([
            (ClassName::from("java.lang.String"), Vec::<Label>::new()),
            (ClassName::from("java.lang.Integer"), Vec::new()),
            (ClassName::from("java.lang.reflect.Method"), Vec::new()),
            (ClassName::from("com.google.Foo"), Vec::new()),
        ]);
        let implicit = implicit_imports(&FutureValue::ready(dict));
        assert_eq!(*implicit.get().await.unwrap(), vec!["Integer", "String"]);
    }

    #[test]
    fn test_exclude_class_names() {
        let blacklist = vec![Regex::new(r"^com\.google\.internal\.").unwrap()];
        let classes = vec![
            ClassName::from("com.google.internal.Secret"),
            ClassName::from("com.google.Foo"),
        ];
        assert_eq!(
            exclude_class_names(&blacklist, classes),
            vec![ClassName::from("com.google.Foo")]
        );
    }

    #[test]
    fn test_exclude_with_empty_blacklist_is_identity() {
        let classes = vec![ClassName::from("com.Foo")];
        assert_eq!(exclude_class_names(&[], classes.clone()), classes);
    }
}
