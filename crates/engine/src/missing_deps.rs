//! Computing the missing dependencies of the rules being fixed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use jadep_core::{ClassName, Label, Result, Rule};
use jadep_filter::{check_visibility, is_valid_dependency, java_kinds, VisQuery};
use jadep_resolve::{resolve_all, ConsumingRules};

use crate::Config;

/// The result of a missing-deps computation: for each rule being fixed,
/// which class names can be satisfied by which labels, plus the class
/// names nothing could resolve.
pub struct MissingDeps {
    /// Rule label → class name → ranked candidate labels.
    pub deps: HashMap<Label, HashMap<ClassName, Vec<Label>>>,
    /// Sorted class names no resolver could satisfy.
    pub unresolved: Vec<ClassName>,
}

/// Returns labels that can be used to satisfy missing dependencies of
/// `rules_to_fix`. For each rule Fi that consumes the file being
/// processed, the result details which class names can be satisfied by
/// which dependencies. Candidates are filtered by rule kind, tags,
/// self-edges, existing deps and visibility, then ranked.
pub async fn missing_deps(
    config: &Config,
    rules_to_fix: &[Arc<Rule>],
    class_names: &[ClassName],
) -> Result<MissingDeps> {
    let mut deps_of_rule: ConsumingRules = ConsumingRules::new();
    for rule in rules_to_fix {
        deps_of_rule.insert(rule.label(), deps(rule));
    }

    let (resolved, unresolved, _errors) =
        resolve_all(&config.resolvers, class_names, &deps_of_rule).await;

    // First filter candidates by what the rules themselves tell us; no
    // package loads are needed for this.
    let mut candidates: HashMap<Label, HashMap<ClassName, Vec<Arc<Rule>>>> = HashMap::new();
    let mut vis_queries: Vec<VisQuery> = Vec::new();
    let mut vis_seen: HashSet<(Label, String)> = HashSet::new();
    for consuming_rule in rules_to_fix {
        let consuming_label = consuming_rule.label();
        let existing_deps = &deps_of_rule[&consuming_label];
        let mut for_rule: HashMap<ClassName, Vec<Arc<Rule>>> = HashMap::new();
        for (class, satisfying_rules) in &resolved {
            if already_satisfied(&consuming_label, existing_deps, satisfying_rules) {
                continue;
            }
            for satisfying_rule in satisfying_rules {
                if !is_valid_dependency(java_kinds(), satisfying_rule) {
                    continue;
                }
                for_rule
                    .entry(class.clone())
                    .or_default()
                    .push(Arc::clone(satisfying_rule));
                let key = (satisfying_rule.label(), consuming_rule.pkg_name.clone());
                if vis_seen.insert(key) {
                    vis_queries.push(VisQuery {
                        rule: Arc::clone(satisfying_rule),
                        pkg: consuming_rule.pkg_name.clone(),
                    });
                }
            }
        }
        candidates.insert(consuming_label, for_rule);
    }

    // One batched visibility check covers every (candidate, consumer) pair.
    let visible = check_visibility(&*config.loader, config.test_mirror, &vis_queries).await?;

    let mut result: HashMap<Label, HashMap<ClassName, Vec<Label>>> = HashMap::new();
    for consuming_rule in rules_to_fix {
        let consuming_label = consuming_rule.label();
        let Some(class_to_satisfiers) = candidates.remove(&consuming_label) else {
            continue;
        };
        let mut missing_for_rule: HashMap<ClassName, Vec<Label>> = HashMap::new();
        for (class, satisfying_rules) in class_to_satisfiers {
            let mut labels: Vec<Label> = satisfying_rules
                .iter()
                .filter(|r| {
                    let key = (r.label(), consuming_rule.pkg_name.clone());
                    if visible.contains(&key) {
                        true
                    } else {
                        debug!(
                            "Filtered because of visibility: {} is not visible to {} for class {class}",
                            r.label(),
                            consuming_label
                        );
                        false
                    }
                })
                .map(|r| r.label())
                .collect();
            if labels.is_empty() && !satisfying_rules.is_empty() {
                // Visibility failures are usually fixed by the user, so
                // showing nothing helps nobody: fall back to everything.
                info!(
                    "No rules left for class {class} after visibility filtering; returning all results."
                );
                labels = satisfying_rules.iter().map(|r| r.label()).collect();
            }
            config.ranker.rank(&mut labels);
            missing_for_rule.insert(class, labels);
        }
        if !missing_for_rule.is_empty() {
            result.insert(consuming_label, missing_for_rule);
        }
    }

    Ok(MissingDeps {
        deps: result,
        unresolved,
    })
}

/// Like [`missing_deps`], but without filtering by rule kind, tags or
/// visibility. Useful for callers that want every satisfying label, e.g.
/// editor integrations with their own filtering.
pub async fn unfiltered_missing_deps(
    config: &Config,
    class_names: &[ClassName],
) -> (HashMap<ClassName, Vec<Label>>, Vec<ClassName>) {
    let (resolved_rules, unresolved, _errors) =
        resolve_all(&config.resolvers, class_names, &ConsumingRules::new()).await;
    let mut resolved = HashMap::new();
    for (class, rules) in resolved_rules {
        let mut labels: Vec<Label> = rules.iter().map(|r| r.label()).collect();
        config.ranker.rank(&mut labels);
        resolved.insert(class, labels);
    }
    (resolved, unresolved)
}

/// The `deps` attribute of `rule` as a label set.
fn deps(rule: &Rule) -> HashSet<Label> {
    rule.label_list("deps").into_iter().collect()
}

/// Whether a class is already satisfied by the existing deps of the
/// consuming rule, or provided by the consuming rule itself.
fn already_satisfied(
    consuming_rule_label: &Label,
    existing_deps: &HashSet<Label>,
    satisfying_rules: &[Arc<Rule>],
) -> bool {
    satisfying_rules.iter().any(|r| {
        let label = r.label();
        label == *consuming_rule_label || existing_deps.contains(&label)
    })
}
