//! Rule-kind tables.
//!
//! All kind sets live in one immutable configuration value so there is a
//! single place that defines how jadep classifies rules.

use std::collections::HashSet;
use std::sync::OnceLock;

/// The rule-kind classification jadep operates with.
pub struct KindConfig {
    /// Kinds that can be a dependency of a Java rule. These typically don't
    /// include binary rules.
    pub dependency_kinds: HashSet<&'static str>,

    /// Kinds of rules that jadep is willing to edit.
    pub editable_kinds: HashSet<&'static str>,

    /// Kinds requested from the package server. This lists every kind
    /// jadep interacts with in any way.
    pub kinds_to_load: HashSet<&'static str>,
}

impl KindConfig {
    pub fn is_dependency_kind(&self, kind: &str) -> bool {
        self.dependency_kinds.contains(kind)
    }

    pub fn is_editable_kind(&self, kind: &str) -> bool {
        self.editable_kinds.contains(kind)
    }

    /// The kinds to request from the server, sorted for stable requests.
    pub fn kinds_to_load_sorted(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.kinds_to_load.iter().map(|s| s.to_string()).collect();
        kinds.sort();
        kinds
    }
}

/// The kind tables for Java.
pub fn java_kinds() -> &'static KindConfig {
    static KINDS: OnceLock<KindConfig> = OnceLock::new();
    KINDS.get_or_init(|| KindConfig {
        dependency_kinds: HashSet::from([
            "android_library",
            "java_import",
            "java_library",
            "java_lite_proto_library",
            "java_mutable_proto_library",
            "java_plugin",
            "java_proto_library",
            "java_wrap_cc",
            "proto_library",
        ]),
        editable_kinds: HashSet::from([
            "android_binary",
            "android_library",
            "android_local_test",
            "android_robolectric_test",
            "android_test",
            "java_binary",
            "java_library",
            "java_plugin",
            "java_test",
        ]),
        kinds_to_load: HashSet::from([
            "android_binary",
            "android_library",
            "android_local_test",
            "android_robolectric_test",
            "android_test",
            "bind",
            "filegroup",
            "java_binary",
            "java_import",
            "java_library",
            "java_lite_proto_library",
            "java_mutable_proto_library",
            "java_plugin",
            "java_proto_library",
            "java_test",
            "java_wrap_cc",
            "proto_library",
        ]),
    })
}
