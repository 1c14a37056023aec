//! The dependency resolver (§4.2): topological ordering with cycle detection.

use std::collections::{BTreeSet, HashMap};

use crate::{error::Error, ports::ConfigStore};

#[derive(Clone, Copy, Eq, PartialEq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Computes deploy order for a set of stacks within a context.
pub struct DependencyResolver<'a> {
    config: &'a dyn ConfigStore,
}

impl<'a> DependencyResolver<'a> {
    #[must_use]
    pub fn new(config: &'a dyn ConfigStore) -> Self {
        Self { config }
    }

    /// Returns a permutation of `names` such that every stack appears after all of its declared
    /// dependencies that are also in `names`. Ties are broken alphabetically for determinism.
    pub async fn order(&self, context: &str, names: &[String]) -> Result<Vec<String>, Error> {
        let wanted: BTreeSet<&str> = names.iter().map(String::as_str).collect();

        let mut dependencies = HashMap::with_capacity(names.len());
        for name in names {
            let config = self
                .config
                .get_stack(name, context)
                .await
                .map_err(|source| {
                    Error::cloud(format!("failed to get stack config for '{name}'"), source)
                })?;
            dependencies.insert(name.clone(), config.dependencies);
        }

        let mut sorted: Vec<&str> = names.iter().map(String::as_str).collect();
        sorted.sort_unstable();

        let mut marks: HashMap<&str, Mark> =
            sorted.iter().map(|name| (*name, Mark::Unvisited)).collect();
        let mut order = Vec::with_capacity(names.len());

        for name in &sorted {
            visit(name, &dependencies, &wanted, &mut marks, &mut order)?;
        }

        Ok(order.into_iter().map(str::to_string).collect())
    }
}

fn visit<'a>(
    name: &'a str,
    dependencies: &'a HashMap<String, Vec<String>>,
    wanted: &BTreeSet<&str>,
    marks: &mut HashMap<&'a str, Mark>,
    order: &mut Vec<&'a str>,
) -> Result<(), Error> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            return Err(Error::Cycle(format!(
                "circular dependency detected involving '{name}'"
            )))
        }
        _ => {}
    }

    marks.insert(name, Mark::Visiting);

    let mut deps: Vec<&str> = dependencies
        .get(name)
        .into_iter()
        .flatten()
        .map(String::as_str)
        .filter(|dep| wanted.contains(dep))
        .collect();
    deps.sort_unstable();

    for dep in deps {
        visit(dep, dependencies, wanted, marks, order)?;
    }

    marks.insert(name, Mark::Done);
    order.push(name);

    Ok(())
}

/// Reverses a deploy order, for use by the Deleter (§4.2, §4.7).
#[must_use]
pub fn reverse(order: Vec<String>) -> Vec<String> {
    order.into_iter().rev().collect()
}
