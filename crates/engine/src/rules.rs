//! Finding the rules to fix, and synthesising one when none exists.

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use jadep_core::{AttrValue, Result, Rule};
use jadep_filter::java_kinds;
use jadep_loader::siblings;

use crate::Config;

/// Returns the Java rules whose `srcs` attribute contains `file_name`,
/// sorted by label. `file_name` must be relative to the workspace root.
/// Only editable kinds are returned.
pub async fn rules_consuming_file(config: &Config, file_name: &str) -> Result<Vec<Arc<Rule>>> {
    let (pkgs, _) = siblings(
        &*config.loader,
        &config.workspace_dir,
        &[file_name.to_string()],
    )
    .await?;

    let mut result = Vec::new();
    for (pkg_name, pkg) in &pkgs {
        let Ok(relative) = Path::new(file_name).strip_prefix(pkg_name) else {
            continue;
        };
        let relative_file_name = relative.to_string_lossy();
        for rule in pkg.rules.values() {
            if java_kinds().is_editable_kind(&rule.kind) && srcs_file(rule, &relative_file_name) {
                result.push(Arc::clone(rule));
            }
        }
    }
    result.sort_by_key(|r| r.label());
    Ok(result)
}

/// Whether `rule` has `relative_file_name` in its `srcs`. Only rules that
/// source the file the user asked about should be edited.
fn srcs_file(rule: &Rule, relative_file_name: &str) -> bool {
    rule.string_list("srcs")
        .iter()
        .any(|src| src == relative_file_name)
}

/// Decides the kind of newly created rules from the file names they srcs.
pub struct NamingRule {
    /// Matches workspace-relative file names this rule applies to.
    pub file_name_matcher: Regex,
    /// The kind of rule to create, e.g. `java_test`.
    pub rule_kind: &'static str,
}

/// How to pick kinds for new rules, tried in order.
pub fn java_naming_rules() -> Vec<NamingRule> {
    [
        (
            r"^javatests/com/google/android/(.*/)?.*Test\.java$",
            "android_test",
        ),
        (
            r"^java(tests)?/com/google/android/(.*/)?.+\.java$",
            "android_library",
        ),
        (r"^javatests/(.*/)?.*Test\.java$", "java_test"),
    ]
    .iter()
    .filter_map(|(pattern, kind)| {
        Regex::new(pattern).ok().map(|file_name_matcher| NamingRule {
            file_name_matcher,
            rule_kind: kind,
        })
    })
    .collect()
}

/// The kind used when no naming rule matches.
pub const DEFAULT_NEW_RULE_KIND: &str = "java_library";

/// Decides between a library and a test rule for a new file based on its
/// name and whether it references the JUnit test annotation.
pub fn kind_for_new_rule(file_name: &str, class_names: &[jadep_core::ClassName]) -> &'static str {
    if !file_name.ends_with("Test.java") {
        return "java_library";
    }
    if class_names.iter().any(|c| c.as_str() == "org.junit.Test") {
        return "java_test";
    }
    "java_library"
}

/// Creates a new rule with `srcs = [file_name]`. The kind comes from the
/// first matching naming rule, or `default_rule_kind`; the name is the
/// file name without extension. `file_name` is relative to the workspace
/// root (e.g. `java/com/Foo.java`, not `Foo.java`).
pub fn create_rule(
    file_name: &str,
    naming_rules: &[NamingRule],
    default_rule_kind: &str,
) -> Rule {
    let kind = naming_rules
        .iter()
        .find(|r| r.file_name_matcher.is_match(file_name))
        .map(|r| r.rule_kind)
        .unwrap_or(default_rule_kind);

    let path = Path::new(file_name);
    let pkg_name = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let src = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Rule::new(
        kind,
        pkg_name,
        name,
        HashMap::from([("srcs".to_string(), AttrValue::ListOfStrings(vec![src]))]),
    )
}
