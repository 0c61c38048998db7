//! Dependents tree rooted at one package
//!
//! The tree answers "who depends on P, directly or transitively". Nodes live
//! in an arena and edges refer to them by [`NodeId`], so a package reached
//! along several paths is one shared node, and cycles are edges flagged
//! with `is_cycle` instead of infinite recursion.

use std::collections::HashMap;
use std::path::PathBuf;

use semver::Version;
use serde::Serialize;
use tracing::trace;

use crate::types::DependencyKind;

use super::workspace::{WorkspaceModel, WorkspacePackage};

/// Index of a node in a [`DependentsTree`]
pub type NodeId = usize;

/// A package in the dependents tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DagNode {
    pub name: String,
    /// `None` when the package is not in the workspace
    pub path: Option<PathBuf>,
    pub version: Option<Version>,
    /// Present, public, and not the workspace root
    pub is_internal_package: bool,
    pub dependents: Vec<DagEdge>,
}

/// `node` declares a dependency on `parent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DagEdge {
    pub parent: NodeId,
    pub node: NodeId,
    pub kind: DependencyKind,
    pub range: String,
    /// The dependent is already on the current branch
    pub is_cycle: bool,
}

/// Transitive dependents of one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependentsTree {
    root: NodeId,
    nodes: Vec<DagNode>,
}

impl DependentsTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &DagNode {
        &self.nodes[self.root]
    }

    pub fn node(&self, id: NodeId) -> &DagNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[DagNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node for a package name
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Names of every dependent, excluding the root, in discovery order
    pub fn dependent_names(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(id, _)| *id != self.root)
            .map(|(_, n)| n.name.as_str())
            .collect()
    }
}

/// Build the dependents tree of `root_name`.
///
/// Candidates are scanned in name order with the workspace root last, and
/// kinds in manifest order. An already-visited dependent gets an edge but
/// is not expanded again. Dependents of a non-internal package are recorded
/// but not expanded.
pub fn build_dependents_tree(
    model: &WorkspaceModel,
    root_name: &str,
    include_dev_dependencies: bool,
) -> DependentsTree {
    let mut builder = DagBuilder {
        model,
        kinds: DependencyKind::filter(include_dev_dependencies),
        nodes: Vec::new(),
        visited: HashMap::new(),
        branch: Vec::new(),
    };

    let root = match model.get(root_name) {
        Some(package) => builder.allocate(package),
        None => builder.push(DagNode {
            name: root_name.to_string(),
            path: None,
            version: None,
            is_internal_package: false,
            dependents: Vec::new(),
        }),
    };
    builder.visited.insert(root_name.to_string(), root);
    builder.branch.push(root_name.to_string());
    builder.expand(root);

    trace!(root = root_name, nodes = builder.nodes.len(), "built dependents tree");
    DependentsTree {
        root,
        nodes: builder.nodes,
    }
}

struct DagBuilder<'a> {
    model: &'a WorkspaceModel,
    kinds: Vec<DependencyKind>,
    nodes: Vec<DagNode>,
    visited: HashMap<String, NodeId>,
    branch: Vec<String>,
}

impl<'a> DagBuilder<'a> {
    fn push(&mut self, node: DagNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn allocate(&mut self, package: &WorkspacePackage) -> NodeId {
        self.push(DagNode {
            name: package.name.clone(),
            path: Some(package.path.clone()),
            version: package.version.clone(),
            is_internal_package: package.is_internal_package(),
            dependents: Vec::new(),
        })
    }

    fn expand(&mut self, parent: NodeId) {
        let model = self.model;
        let parent_name = self.nodes[parent].name.clone();
        let descend = self.nodes[parent].is_internal_package;

        for candidate in model.iter() {
            if candidate.name == parent_name {
                continue;
            }

            for kind in self.kinds.clone() {
                let Some(range) = candidate.dependencies.range(kind, &parent_name) else {
                    continue;
                };

                if let Some(&existing) = self.visited.get(&candidate.name) {
                    let is_cycle = self.branch.contains(&candidate.name);
                    self.nodes[parent].dependents.push(DagEdge {
                        parent,
                        node: existing,
                        kind,
                        range: range.to_string(),
                        is_cycle,
                    });
                    continue;
                }

                let node = self.allocate(candidate);
                self.visited.insert(candidate.name.clone(), node);
                self.branch.push(candidate.name.clone());
                self.nodes[parent].dependents.push(DagEdge {
                    parent,
                    node,
                    kind,
                    range: range.to_string(),
                    is_cycle: false,
                });
                if descend {
                    self.expand(node);
                }
                self.branch.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monorepo::workspace::BuildOptions;
    use crate::types::DependencyKind::{Dependencies, DevDependencies};

    fn model(members: Vec<WorkspacePackage>) -> WorkspaceModel {
        let root = WorkspacePackage::new("root", "").root();
        WorkspaceModel::from_packages("/ws", root, members, &BuildOptions::default())
    }

    fn pkg(name: &str) -> WorkspacePackage {
        WorkspacePackage::new(name, format!("packages/{}", name)).with_version("1.0.0")
    }

    #[test]
    fn test_chain_of_dependents() {
        let model = model(vec![
            pkg("a"),
            pkg("b").with_dependency(Dependencies, "a", "^1.0.0"),
            pkg("c").with_dependency(Dependencies, "b", "^1.0.0"),
        ]);

        let tree = build_dependents_tree(&model, "a", true);
        assert_eq!(tree.dependent_names(), vec!["b", "c"]);

        let root = tree.root_node();
        assert_eq!(root.dependents.len(), 1);
        let b = tree.node(root.dependents[0].node);
        assert_eq!(b.name, "b");
        assert_eq!(tree.node(b.dependents[0].node).name, "c");
        assert_eq!(b.dependents[0].parent, root.dependents[0].node);
    }

    #[test]
    fn test_diamond_shares_node() {
        let model = model(vec![
            pkg("a"),
            pkg("b").with_dependency(Dependencies, "a", "^1.0.0"),
            pkg("c").with_dependency(Dependencies, "a", "^1.0.0"),
            pkg("d")
                .with_dependency(Dependencies, "b", "^1.0.0")
                .with_dependency(Dependencies, "c", "^1.0.0"),
        ]);

        let tree = build_dependents_tree(&model, "a", true);
        assert_eq!(tree.len(), 4);

        let d = tree.find("d").unwrap();
        let c = tree.node(tree.find("c").unwrap());
        assert_eq!(c.dependents[0].node, d);
        assert!(!c.dependents[0].is_cycle);
    }

    #[test]
    fn test_cycle_edge_is_flagged() {
        let model = model(vec![
            pkg("a").with_dependency(Dependencies, "b", "^1.0.0"),
            pkg("b").with_dependency(Dependencies, "a", "^1.0.0"),
        ]);

        let tree = build_dependents_tree(&model, "a", true);
        let b = tree.node(tree.find("b").unwrap());
        assert_eq!(b.dependents.len(), 1);
        assert_eq!(b.dependents[0].node, tree.root());
        assert!(b.dependents[0].is_cycle);
    }

    #[test]
    fn test_dev_edges_filtered() {
        let model = model(vec![
            pkg("a"),
            pkg("b").with_dependency(DevDependencies, "a", "^1.0.0"),
        ]);

        assert_eq!(build_dependents_tree(&model, "a", true).len(), 2);
        assert_eq!(build_dependents_tree(&model, "a", false).len(), 1);
    }

    #[test]
    fn test_private_package_not_expanded() {
        let model = model(vec![
            pkg("a"),
            pkg("b").private().with_dependency(Dependencies, "a", "^1.0.0"),
            pkg("c").with_dependency(Dependencies, "b", "^1.0.0"),
            pkg("d").with_dependency(Dependencies, "c", "^1.0.0"),
        ]);

        let tree = build_dependents_tree(&model, "a", true);
        let b = tree.find("b").unwrap();
        let c = tree.find("c").unwrap();
        assert!(!tree.node(b).is_internal_package);
        assert_eq!(tree.dependent_names(), vec!["b", "c"]);
        assert_eq!(tree.node(b).dependents[0].node, c);
        // c is recorded under private b but not expanded, so d never appears
        assert!(tree.node(c).dependents.is_empty());
        assert!(tree.find("d").is_none());
    }

    #[test]
    fn test_root_package_is_a_leaf_dependent() {
        let root = WorkspacePackage::new("root", "")
            .root()
            .with_dependency(DevDependencies, "a", "^1.0.0");
        let model =
            WorkspaceModel::from_packages("/ws", root, vec![pkg("a")], &BuildOptions::default());

        let tree = build_dependents_tree(&model, "a", true);
        let edge = &tree.root_node().dependents[0];
        assert_eq!(tree.node(edge.node).name, "root");
        assert_eq!(edge.kind, DevDependencies);
        assert!(!tree.node(edge.node).is_internal_package);
    }

    #[test]
    fn test_unknown_root() {
        let model = model(vec![pkg("a")]);
        let tree = build_dependents_tree(&model, "missing", true);
        assert_eq!(tree.len(), 1);
        assert!(tree.root_node().path.is_none());
    }
}
