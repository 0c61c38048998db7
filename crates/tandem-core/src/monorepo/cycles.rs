//! Dependency cycle detection

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::types::DependencyKind;

use super::workspace::WorkspaceModel;

/// Find every distinct dependency cycle among workspace members.
///
/// Each cycle is reported once as `n0 < k0 < n1 < ... < n0`, where `ki` is
/// the kind of the edge from `ni` to the next package and `n0` is the
/// alphabetically smallest package in the cycle. The result is sorted.
pub fn find_cycles(model: &WorkspaceModel, include_dev_dependencies: bool) -> Vec<String> {
    let mut finder = CycleFinder {
        model,
        kinds: DependencyKind::filter(include_dev_dependencies),
        branch: Vec::new(),
        fully_visited: HashSet::new(),
        cycles: BTreeSet::new(),
    };

    for name in model.packages().keys() {
        finder.visit(name, None);
    }

    debug!(cycles = finder.cycles.len(), "cycle detection complete");
    finder.cycles.into_iter().collect()
}

struct BranchEntry {
    name: String,
    /// Kind of the edge that led here; `None` for the starting package
    kind_in: Option<DependencyKind>,
}

struct CycleFinder<'a> {
    model: &'a WorkspaceModel,
    kinds: Vec<DependencyKind>,
    branch: Vec<BranchEntry>,
    fully_visited: HashSet<String>,
    cycles: BTreeSet<String>,
}

impl<'a> CycleFinder<'a> {
    /// Returns the branch packages this subtree cycled back to
    fn visit(&mut self, name: &str, kind_in: Option<DependencyKind>) -> HashSet<String> {
        if self.fully_visited.contains(name) {
            return HashSet::new();
        }

        if let Some(start) = self.branch.iter().position(|e| e.name == name) {
            if let Some(closing) = kind_in {
                self.record(start, closing);
            }
            return HashSet::from([name.to_string()]);
        }

        let model = self.model;
        let Some(package) = model.packages().get(name) else {
            return HashSet::new();
        };

        let mut deps: Vec<(&str, DependencyKind)> = package
            .dependencies
            .iter()
            .filter(|(kind, _, _)| self.kinds.contains(kind))
            .map(|(kind, dep, _)| (dep, kind))
            .collect();
        deps.sort();

        self.branch.push(BranchEntry {
            name: name.to_string(),
            kind_in,
        });

        let mut tips = HashSet::new();
        for (dep, kind) in deps {
            tips.extend(self.visit(dep, Some(kind)));
        }

        self.branch.pop();
        tips.remove(name);
        if tips.is_empty() {
            self.fully_visited.insert(name.to_string());
        }
        tips
    }

    fn record(&mut self, start: usize, closing: DependencyKind) {
        let entries = &self.branch[start..];
        let mut pairs: Vec<(&str, DependencyKind)> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let kind_out = entries
                    .get(i + 1)
                    .and_then(|next| next.kind_in)
                    .unwrap_or(closing);
                (entry.name.as_str(), kind_out)
            })
            .collect();

        let smallest = pairs
            .iter()
            .enumerate()
            .min_by_key(|(_, (name, _))| *name)
            .map_or(0, |(i, _)| i);
        pairs.rotate_left(smallest);

        let mut signature = String::new();
        for (name, kind) in &pairs {
            signature.push_str(name);
            signature.push_str(" < ");
            signature.push_str(kind.as_str());
            signature.push_str(" < ");
        }
        signature.push_str(pairs[0].0);

        self.cycles.insert(signature);
    }
}
