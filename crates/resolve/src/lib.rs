//! Resolution of class names to the Bazel rules that provide them.
//!
//! Resolvers are chained into a pipeline: each receives the classes the
//! previous ones left unresolved. Errors are collected per resolver and
//! surfaced, but never abort the pipeline.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use jadep_core::{ClassName, Error, Label, Result, Rule};

mod dict;
mod fs;
pub mod jar;
mod thirdparty;

pub use dict::{read_dict_from_csv, Dict, DictResolver};
pub use fs::FsResolver;
pub use thirdparty::ThirdPartyResolver;

/// The existing dependencies of each rule being fixed: rule label → set of
/// its `deps`, resolved relative to the rule's package.
pub type ConsumingRules = HashMap<Label, HashSet<Label>>;

/// Maps class names to Bazel rules that provide them.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// A short description of the resolver, for logs.
    fn name(&self) -> &str;

    /// Resolves `class_names` to candidate rules. `consuming_rules` lists
    /// the dependencies of each rule being fixed; resolvers may use it to
    /// short-circuit work for classes that are already satisfied.
    async fn resolve(
        &self,
        class_names: &[ClassName],
        consuming_rules: &ConsumingRules,
    ) -> Result<HashMap<ClassName, Vec<Arc<Rule>>>>;
}

/// Runs `resolvers` in order, feeding the unresolved classes of each into
/// the next. Returns the resolved map, the sorted list of classes no
/// resolver could satisfy, and any per-resolver errors.
pub async fn resolve_all(
    resolvers: &[Arc<dyn Resolver>],
    class_names: &[ClassName],
    consuming_rules: &ConsumingRules,
) -> (
    HashMap<ClassName, Vec<Arc<Rule>>>,
    Vec<ClassName>,
    Vec<(String, Error)>,
) {
    let mut resolved: HashMap<ClassName, Vec<Arc<Rule>>> = HashMap::new();
    let mut unresolved: HashSet<ClassName> = class_names.iter().cloned().collect();
    let mut errors = Vec::new();

    for resolver in resolvers {
        if unresolved.is_empty() {
            break;
        }
        let remaining: Vec<ClassName> = unresolved.iter().cloned().collect();

        let stopwatch = Instant::now();
        match resolver.resolve(&remaining, consuming_rules).await {
            Ok(found) => {
                info!(
                    "Resolved {:4}/{:<4} classes using {:20} ({}ms)",
                    found.len(),
                    remaining.len(),
                    resolver.name(),
                    stopwatch.elapsed().as_millis()
                );
                for (class, rules) in found {
                    unresolved.remove(&class);
                    resolved.entry(class).or_default().extend(rules);
                }
            }
            Err(e) => {
                warn!("Error when resolving using {}: {e}", resolver.name());
                errors.push((resolver.name().to_string(), e));
            }
        }
    }

    let mut unresolved: Vec<ClassName> = unresolved.into_iter().collect();
    unresolved.sort();
    (resolved, unresolved, errors)
}

/// Finds class names for which every consuming rule already has a
/// satisfying dependency (or is itself one). Returns, per such class, the
/// satisfying dependencies that cover all consuming rules. Used to skip
/// loads for classes that need no new edge.
pub fn satisfied_by_existing_deps(
    consuming_rules: &ConsumingRules,
    satisfying_rules: &HashMap<ClassName, Vec<Label>>,
) -> HashMap<ClassName, Vec<Label>> {
    if consuming_rules.is_empty() {
        return HashMap::new();
    }

    let mut already_satisfied = HashMap::new();
    'class_loop: for (class, possible_deps) in satisfying_rules {
        let mut existing_satisfying_deps = Vec::new();
        for (consuming_rule, existing_deps) in consuming_rules {
            let satisfied = possible_deps.iter().find(|d| {
                *consuming_rule == **d || existing_deps.contains(*d)
            });
            match satisfied {
                Some(dep) => existing_satisfying_deps.push(dep.clone()),
                None => continue 'class_loop,
            }
        }
        already_satisfied.insert(class.clone(), existing_satisfying_deps);
    }
    already_satisfied
}
