//! Dependents command

use std::collections::HashSet;

use clap::Args;
use console::style;
use tracing::info;

use tandem_core::monorepo::{build_dependents_tree, BuildOptions, DependentsTree, NodeId};

use super::{parse_bool, Workspace};
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Show the transitive dependents of a package
#[derive(Debug, Args)]
pub struct DependentsCommand {
    /// Package name
    pub package: String,

    /// Whether devDependencies count as edges (defaults to the config value)
    #[arg(long, value_name = "BOOL", value_parser = parse_bool)]
    pub include_dev_dependencies: Option<bool>,
}

impl DependentsCommand {
    /// Execute the dependents command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(package = %self.package, "executing dependents command");
        let workspace = Workspace::load(&BuildOptions::default())?;
        if workspace.model.get(&self.package).is_none() {
            anyhow::bail!("Package not found in workspace: {}", self.package);
        }
        let include_dev = self
            .include_dev_dependencies
            .unwrap_or(workspace.config.graph.include_dev_dependencies);

        let tree = build_dependents_tree(&workspace.model, &self.package, include_dev);

        match cli.format {
            OutputFormat::Json => output::json(&tree)?,
            OutputFormat::Text => {
                let mut lines = Vec::new();
                render(&tree, tree.root(), 0, &mut HashSet::new(), &mut lines);
                for line in lines {
                    println!("{}", line);
                }
            }
        }

        Ok(())
    }
}

/// Render the tree depth first, one edge per line. A node shared by
/// several dependents is expanded only where it is first printed.
fn render(
    tree: &DependentsTree,
    id: NodeId,
    depth: usize,
    expanded: &mut HashSet<NodeId>,
    lines: &mut Vec<String>,
) {
    let node = tree.node(id);
    if depth == 0 {
        let version = node
            .version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default();
        lines.push(format!(
            "{} {}",
            output::package_style().apply_to(&node.name),
            output::version_style().apply_to(version)
        ));
        expanded.insert(id);
    }

    for edge in &node.dependents {
        let dependent = tree.node(edge.node);
        let mut line = format!(
            "{}{} ({} {})",
            "  ".repeat(depth + 1),
            output::package_style().apply_to(&dependent.name),
            edge.kind,
            edge.range
        );
        if edge.is_cycle {
            line.push_str(&format!(" {}", style("cycle").red()));
        }
        lines.push(line);

        if !edge.is_cycle && expanded.insert(edge.node) {
            render(tree, edge.node, depth + 1, expanded, lines);
        }
    }
}
