//! Package loading: the [`Loader`] trait, helpers built on top of it, and
//! the three concrete layers (RPC client, blacklist filter, single-flight
//! cache) that jadep stacks to talk to a package server.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jadep_core::{Label, Package, Result, Rule};

mod cache;
mod filter;
pub mod rpc;
pub mod testing;

pub use cache::CachingLoader;
pub use filter::FilteringLoader;
pub use rpc::{connect, BindLocation, RpcLoader};

/// Loads BUILD packages.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Loads the named packages and returns a mapping from names to loaded
    /// packages. Requested packages that do not exist are omitted from the
    /// result; they are not errors.
    async fn load(&self, packages: &[String]) -> Result<HashMap<String, Arc<Package>>>;
}

#[async_trait]
impl<L: Loader + ?Sized> Loader for Arc<L> {
    async fn load(&self, packages: &[String]) -> Result<HashMap<String, Arc<Package>>> {
        (**self).load(packages).await
    }
}

/// Loads the packages containing `labels` and returns the rules they name.
pub async fn load_rules(
    loader: &dyn Loader,
    labels: &[Label],
) -> Result<(HashMap<Label, Arc<Rule>>, HashMap<String, Arc<Package>>)> {
    if labels.is_empty() {
        return Ok((HashMap::new(), HashMap::new()));
    }
    let pkgs = loader.load(&distinct_pkgs(labels)).await?;

    let mut result = HashMap::new();
    for label in labels {
        let (pkg_name, rule_name) = label.split();
        if let Some(pkg) = pkgs.get(pkg_name) {
            if let Some(rule) = pkg.rules.get(rule_name) {
                result.insert(label.clone(), Arc::clone(rule));
            }
        }
    }
    Ok((result, pkgs))
}

/// Loads the packages containing `labels` and returns the package groups
/// they name. Labels that don't resolve to a group are omitted.
pub async fn load_package_groups(
    loader: &dyn Loader,
    labels: &[Label],
) -> Result<HashMap<Label, jadep_core::PackageGroup>> {
    if labels.is_empty() {
        return Ok(HashMap::new());
    }
    let pkgs = loader.load(&distinct_pkgs(labels)).await?;

    let mut result = HashMap::new();
    for label in labels {
        let (pkg_name, group_name) = label.split();
        if let Some(pkg) = pkgs.get(pkg_name) {
            if let Some(group) = pkg.package_groups.get(group_name) {
                result.insert(label.clone(), group.clone());
            }
        }
    }
    Ok(result)
}

/// The set of unique packages mentioned in a set of labels.
fn distinct_pkgs(labels: &[Label]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for label in labels {
        let (pkg_name, _) = label.split();
        if seen.insert(pkg_name.to_string()) {
            result.push(pkg_name.to_string());
        }
    }
    result
}

/// Loads all the packages that define the files in `file_names`.
///
/// For example, if `file_names` is `{"foo/bar/Bar.java"}` and there's a
/// BUILD file in `foo/bar/`, the package defined by that BUILD file is
/// loaded. Returns the loaded packages and a file → package-name mapping.
pub async fn siblings(
    loader: &dyn Loader,
    workspace_dir: &Path,
    file_names: &[String],
) -> Result<(HashMap<String, Arc<Package>>, HashMap<String, String>)> {
    let found: Vec<(String, String)> = stream::iter(file_names.iter().cloned())
        .map(|f| async move {
            find_package_name(workspace_dir, &f)
                .await
                .map(|pkg| (f, pkg))
        })
        .buffer_unordered(16)
        .filter_map(|x| async move { x })
        .collect()
        .await;

    let mut file_to_pkg_name = HashMap::new();
    let mut pkgs = Vec::new();
    let mut pkgs_seen = std::collections::HashSet::new();
    for (file, pkg) in found {
        if pkgs_seen.insert(pkg.clone()) {
            pkgs.push(pkg.clone());
        }
        file_to_pkg_name.insert(file, pkg);
    }

    let packages = loader.load(&pkgs).await?;
    Ok((packages, file_to_pkg_name))
}

/// Finds the name of the package that `file_name` is in: the nearest
/// ancestor directory that contains a BUILD file.
async fn find_package_name(workspace_dir: &Path, file_name: &str) -> Option<String> {
    let mut dir = Path::new(file_name).parent()?;
    while !dir.as_os_str().is_empty() {
        let build_file: PathBuf = workspace_dir.join(dir).join("BUILD");
        if tokio::fs::metadata(&build_file).await.is_ok() {
            return Some(dir.to_string_lossy().into_owned());
        }
        dir = dir.parent()?;
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::testing::{java_library, pkg, FakeLoader};
    use super::*;

    #[tokio::test]
    async fn test_load_rules() {
        let mut fake = FakeLoader::new();
        fake.add_package(
            "x",
            pkg(vec![java_library("x", "Foo", &["Foo.java"], &[], &[])]),
        );
        let loader = Arc::new(fake);

        let label = Label::parse_absolute("//x:Foo").unwrap();
        let missing = Label::parse_absolute("//x:Nope").unwrap();
        let (rules, pkgs) = load_rules(&loader, &[label.clone(), missing.clone()])
            .await
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[&label].name(), "Foo");
        assert!(!rules.contains_key(&missing));
        assert!(pkgs.contains_key("x"));
    }

    #[tokio::test]
    async fn test_siblings_finds_nearest_build_file() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = tmp.path();
        std::fs::create_dir_all(ws.join("x/sub")).unwrap();
        std::fs::write(ws.join("x/BUILD"), "").unwrap();

        let mut fake = FakeLoader::new();
        fake.add_package(
            "x",
            pkg(vec![java_library("x", "Foo", &["sub/Foo.java"], &[], &[])]),
        );
        let loader = Arc::new(fake);

        let (pkgs, file_to_pkg) = siblings(
            &loader,
            ws,
            &["x/sub/Foo.java".to_string(), "unowned/Bar.java".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(file_to_pkg.get("x/sub/Foo.java").map(String::as_str), Some("x"));
        assert!(!file_to_pkg.contains_key("unowned/Bar.java"));
        assert!(pkgs.contains_key("x"));
    }

    #[test]
    fn test_distinct_pkgs_preserves_order() {
        let labels: Vec<Label> = ["//a:1", "//b:2", "//a:3"]
            .iter()
            .map(|s| Label::parse_absolute(s).unwrap())
            .collect();
        assert_eq!(distinct_pkgs(&labels), vec!["a", "b"]);
    }
}
