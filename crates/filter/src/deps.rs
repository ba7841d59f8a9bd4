//! Structural checks on candidate dependencies.

use jadep_core::Rule;

use crate::kinds::KindConfig;

/// Returns false if `dep` should not be offered as a dependency. Only
/// relies on information inside the rule itself (kind, tags, deprecation);
/// for visibility see [`crate::check_visibility`].
pub fn is_valid_dependency(kinds: &KindConfig, dep: &Rule) -> bool {
    if !kinds.is_dependency_kind(&dep.kind) {
        return false;
    }
    if dep.string_list("tags").iter().any(|t| t == "avoid_dep") {
        return false;
    }
    if dep.attrs.contains_key("deprecation") {
        return false;
    }
    true
}
