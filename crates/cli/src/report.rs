//! Reporting of results to the user.

use jadep_core::ClassName;
use jadep_engine::MissingDeps;

/// Prints the dependencies detected as missing, per rule and class.
pub fn report_missing_deps(missing: &MissingDeps) {
    let mut anything_missing = false;
    let mut rules: Vec<_> = missing.deps.iter().collect();
    rules.sort_by_key(|(label, _)| (*label).clone());
    for (rule_label, class_to_labels) in rules {
        println!("Missing dependencies in {rule_label}");
        let mut classes: Vec<_> = class_to_labels.iter().collect();
        classes.sort_by_key(|(class, _)| (*class).clone());
        for (class, labels) in classes {
            let labels: Vec<&str> = labels.iter().map(|l| l.as_str()).collect();
            println!("{class:<50} can be satisfied using:");
            println!("             {}", labels.join(", "));
            anything_missing = true;
        }
    }
    if !anything_missing {
        println!("Nothing to do.");
    }
}

/// Prints the class names no resolver could satisfy.
pub fn report_unresolved_class_names(unresolved: &[ClassName]) {
    if unresolved.is_empty() {
        return;
    }
    println!("Class names we don't know how to satisfy:");
    for class in unresolved {
        println!("{class}");
    }
}
