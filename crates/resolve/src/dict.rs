//! Dictionary resolver: class names to rules via an in-memory map.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use jadep_core::{ClassName, Error, FutureValue, Label, Result, Rule};
use jadep_loader::{load_rules, Loader};

use crate::{satisfied_by_existing_deps, ConsumingRules, Resolver};

/// The dictionary type: class name → labels that provide it. An empty
/// label list means the class exists and needs no dependency.
pub type Dict = HashMap<ClassName, Vec<Label>>;

/// Resolves class names according to an in-memory map, typically loaded in
/// the background from a CSV file.
pub struct DictResolver {
    name: String,
    dict: FutureValue<Dict>,
    loader: Arc<dyn Loader>,
}

impl DictResolver {
    pub fn new(name: impl Into<String>, dict: FutureValue<Dict>, loader: Arc<dyn Loader>) -> DictResolver {
        DictResolver {
            name: name.into(),
            dict,
            loader,
        }
    }
}

#[async_trait]
impl Resolver for DictResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(
        &self,
        class_names: &[ClassName],
        consuming_rules: &ConsumingRules,
    ) -> Result<HashMap<ClassName, Vec<Arc<Rule>>>> {
        let dict = self.dict.get().await?;

        let mut candidates: HashMap<ClassName, Vec<Label>> = HashMap::new();
        for class in class_names {
            if let Some(labels) = dict.get(class) {
                candidates.insert(class.clone(), labels.clone());
            }
        }

        // Classes already satisfied by a consuming rule's deps need no
        // load; answer with a synthetic rule wrapper for the existing dep.
        let already_satisfied = satisfied_by_existing_deps(consuming_rules, &candidates);
        for class in already_satisfied.keys() {
            candidates.remove(class);
        }

        let labels: Vec<Label> = candidates.values().flatten().cloned().collect();
        let (rules, _) = load_rules(&*self.loader, &labels).await?;

        let mut result: HashMap<ClassName, Vec<Arc<Rule>>> = HashMap::new();
        for (class, labels) in already_satisfied {
            let wrappers = labels
                .iter()
                .map(|label| {
                    let (pkg_name, rule_name) = label.split();
                    Arc::new(Rule::new("", pkg_name, rule_name, HashMap::new()))
                })
                .collect();
            result.insert(class, wrappers);
        }
        for (class, labels) in candidates {
            let found = labels
                .iter()
                .filter_map(|label| rules.get(label).cloned())
                .collect();
            result.insert(class, found);
        }

        Ok(result)
    }
}

/// Reads a class-name → labels dictionary from CSV:
/// `className,label1,label2,...`.
///
/// A record with no labels maps to the empty list. Labels must be in
/// absolute form; invalid labels are silently ignored.
pub fn read_dict_from_csv(reader: impl Read) -> Result<Dict> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut result = Dict::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| Error::invalid_input(format!("error reading CSV: {e}")))?;
        let Some(class) = record.get(0) else {
            continue;
        };
        let labels = record
            .iter()
            .skip(1)
            .filter_map(|field| Label::parse_absolute(field).ok())
            .collect();
        result.insert(ClassName::from(class), labels);
    }
    Ok(result)
}
