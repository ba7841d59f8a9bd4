//! Integration tests for the third-party graph resolver: a bazel-deps
//! style directory with a library → bind → import chain and a real jar.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use jadep_core::{AttrValue, ClassName, Package, Rule};
use jadep_loader::testing::{rule_with, FakeLoader};
use jadep_loader::Loader;
use jadep_resolve::{ConsumingRules, Resolver, ThirdPartyResolver};
use zip::write::FileOptions;

fn write_jar(path: &Path, entries: &[&str]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for entry in entries {
        writer.start_file(*entry, FileOptions::default()).unwrap();
        writer.write_all(b"\xca\xfe\xba\xbe").unwrap();
    }
    writer.finish().unwrap();
}

fn package_with(path: &str, rules: Vec<Arc<Rule>>) -> Package {
    let mut pkg_rules = HashMap::new();
    for rule in rules {
        pkg_rules.insert(rule.name().to_string(), rule);
    }
    Package {
        path: path.to_string(),
        rules: pkg_rules,
        ..Package::default()
    }
}

/// A workspace with thirdparty/jvm/com/google/guava on disk, and a loader
/// that serves library → bind → import, the import listing a real jar.
fn guava_fixture(jar_entries: &[&str]) -> (tempfile::TempDir, FakeLoader) {
    let tmp = tempfile::tempdir().unwrap();
    let ws = tmp.path();
    std::fs::create_dir_all(ws.join("thirdparty/jvm/com/google/guava")).unwrap();
    std::fs::create_dir_all(ws.join("jars")).unwrap();
    write_jar(&ws.join("jars/guava.jar"), jar_entries);

    let mut fake = FakeLoader::new();
    fake.add_package(
        "thirdparty/jvm/com/google/guava",
        package_with(
            "thirdparty/jvm/com/google/guava",
            vec![rule_with(
                "java_library",
                "thirdparty/jvm/com/google/guava",
                "guava",
                &[("exports", &["//external:com_google_guava"])],
            )],
        ),
    );
    let bind = Arc::new(Rule::new(
        "bind",
        "external",
        "com_google_guava",
        HashMap::from([(
            "actual".to_string(),
            AttrValue::String("@com_google_guava//jar:jar".to_string()),
        )]),
    ));
    fake.add_package("external", package_with("external", vec![bind]));
    fake.add_package(
        "@com_google_guava//jar",
        package_with(
            "jars",
            vec![rule_with(
                "java_import",
                "@com_google_guava//jar",
                "jar",
                &[("jars", &["guava.jar"])],
            )],
        ),
    );
    (tmp, fake)
}

#[tokio::test]
async fn test_resolves_class_to_root_library() {
    let (tmp, fake) = guava_fixture(&[
        "com/google/common/collect/ImmutableList.class",
        "com/google/common/collect/ImmutableList$Builder.class",
    ]);
    let resolver = ThirdPartyResolver::new(
        tmp.path(),
        "thirdparty/jvm",
        Arc::new(fake) as Arc<dyn Loader>,
    )
    .await
    .unwrap();

    let class = ClassName::from("com.google.common.collect.ImmutableList");
    let result = resolver
        .resolve(
            &[class.clone(), ClassName::from("com.Unknown")],
            &ConsumingRules::new(),
        )
        .await
        .unwrap();

    // The class is provided by the java_import, but the answer is the
    // root java_library of its parent chain.
    let labels: Vec<String> = result[&class].iter().map(|r| r.label().to_string()).collect();
    assert_eq!(labels, vec!["//thirdparty/jvm/com/google/guava:guava"]);
    assert!(!result.contains_key(&ClassName::from("com.Unknown")));
    assert_eq!(resolver.missing_jars(), 0);
}

#[tokio::test]
async fn test_missing_jars_are_counted_not_fatal() {
    let (tmp, fake) = guava_fixture(&["com/google/X.class"]);
    std::fs::remove_file(tmp.path().join("jars/guava.jar")).unwrap();

    let resolver = ThirdPartyResolver::new(
        tmp.path(),
        "thirdparty/jvm",
        Arc::new(fake) as Arc<dyn Loader>,
    )
    .await
    .unwrap();
    assert_eq!(resolver.missing_jars(), 1);

    let result = resolver
        .resolve(&[ClassName::from("com.google.X")], &ConsumingRules::new())
        .await
        .unwrap();
    assert!(result.is_empty());
}

// Mutual exports must flatten to an acyclic parent forest: every class
// still resolves to a unique root without spinning.
#[tokio::test]
async fn test_export_cycles_terminate() {
    let tmp = tempfile::tempdir().unwrap();
    let ws = tmp.path();
    std::fs::create_dir_all(ws.join("thirdparty/jvm/a")).unwrap();
    std::fs::create_dir_all(ws.join("thirdparty/jvm/b")).unwrap();
    std::fs::create_dir_all(ws.join("jars")).unwrap();
    write_jar(&ws.join("jars/b.jar"), &["com/b/B.class"]);

    let mut fake = FakeLoader::new();
    fake.add_package(
        "thirdparty/jvm/a",
        package_with(
            "thirdparty/jvm/a",
            vec![rule_with(
                "java_library",
                "thirdparty/jvm/a",
                "a",
                &[("exports", &["//thirdparty/jvm/b:b"])],
            )],
        ),
    );
    fake.add_package(
        "thirdparty/jvm/b",
        package_with(
            "thirdparty/jvm/b",
            vec![
                rule_with(
                    "java_library",
                    "thirdparty/jvm/b",
                    "b",
                    &[("exports", &["//thirdparty/jvm/a:a", ":b_jar"])],
                ),
                rule_with("java_import", "thirdparty/jvm/b", "b_jar", &[("jars", &["../../../jars/b.jar"])]),
            ],
        ),
    );
    let resolver = ThirdPartyResolver::new(
        tmp.path(),
        "thirdparty/jvm",
        Arc::new(fake) as Arc<dyn Loader>,
    )
    .await
    .unwrap();

    let class = ClassName::from("com.b.B");
    let result = resolver
        .resolve(&[class.clone()], &ConsumingRules::new())
        .await
        .unwrap();
    // The import was discovered in the initial layer (it sits in a loaded
    // package), so it is its own root.
    assert_eq!(result[&class].len(), 1);
}

#[tokio::test]
async fn test_absolute_thirdparty_dir_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let result = ThirdPartyResolver::new(
        tmp.path(),
        "/absolute/path",
        Arc::new(FakeLoader::new()) as Arc<dyn Loader>,
    )
    .await;
    assert!(result.is_err());
}
