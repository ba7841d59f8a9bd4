//! Interactive selection of dependencies to add.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use jadep_core::{Error, Label, Result};

use crate::missing_deps::MissingDeps;

/// Asks the user which dependency to add for every (rule, class) with
/// candidates. Returns rule label → labels to add. Classes already covered
/// by a previously chosen label are skipped. Reading from `input` makes
/// this testable; the prompt goes to stdout.
pub fn select_deps_to_add(
    input: &mut impl BufRead,
    missing: &MissingDeps,
) -> Result<HashMap<Label, Vec<Label>>> {
    let mut deps_to_add: HashMap<Label, Vec<Label>> = HashMap::new();
    for (rule_label, class_to_labels) in &missing.deps {
        let mut added: HashSet<Label> = HashSet::new();
        for (class, labels) in class_to_labels {
            if labels.is_empty() || labels.iter().any(|l| added.contains(l)) {
                continue;
            }
            let choice = ask(
                input,
                &format!("Choose a BUILD rule for {class} to add to {rule_label}.\n"),
                labels,
            )?;
            if let Some(chosen) = choice {
                added.insert(chosen.clone());
                deps_to_add
                    .entry(rule_label.clone())
                    .or_default()
                    .push(chosen);
            }
        }
    }
    Ok(deps_to_add)
}

/// Presents numbered options and reads the user's pick. Returns `None`
/// when the user chooses `0` (none). A single option needs no prompt. An
/// empty line selects the default (the first option).
fn ask(input: &mut impl BufRead, description: &str, options: &[Label]) -> Result<Option<Label>> {
    if options.len() == 1 {
        return Ok(Some(options[0].clone()));
    }
    println!();
    for (i, option) in options.iter().enumerate().rev() {
        println!("[{}] {option}", i + 1);
    }
    println!("[0] None");
    print!("{description}");
    println!(
        "Enter a number to choose, or just Enter to select the default [{}]",
        options[0]
    );

    loop {
        let mut line = String::new();
        let n = input
            .read_line(&mut line)
            .map_err(|e| Error::invalid_input(format!("error reading input: {e}")))?;
        if n == 0 {
            return Err(Error::invalid_input("input closed while waiting for a choice"));
        }
        let line = line.trim();
        if line.is_empty() {
            return Ok(Some(options[0].clone()));
        }
        let Ok(index) = line.parse::<usize>() else {
            println!("Couldn't read a number. Please try again.");
            continue;
        };
        if index == 0 {
            return Ok(None);
        }
        if index <= options.len() {
            return Ok(Some(options[index - 1].clone()));
        }
        println!("Invalid index inputted. Please try again.");
    }
}
