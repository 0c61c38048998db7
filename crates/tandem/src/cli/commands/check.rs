//! Check command - Report internal ranges the workspace no longer satisfies

use clap::Args;
use console::style;
use tracing::info;

use tandem_core::monorepo::{BuildOptions, UnsatisfiedDependency};

use super::Workspace;
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Report every internal dependency declaration whose range is not
/// satisfied by the workspace version of that dependency
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Only report, never exit with a failure code
    #[arg(long)]
    pub no_fail: bool,
}

impl CheckCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(no_fail = self.no_fail, "executing check command");
        let workspace = Workspace::load(&BuildOptions {
            prune_dependencies: false,
        })?;
        let unsatisfied = workspace.model.unsatisfied_dependencies();

        match cli.format {
            OutputFormat::Json => output::json(&unsatisfied)?,
            OutputFormat::Text => print_text(&unsatisfied, cli),
        }

        if !unsatisfied.is_empty() && !self.no_fail {
            std::process::exit(exit_codes::VALIDATION_ERROR);
        }

        Ok(())
    }
}

fn describe(entry: &UnsatisfiedDependency) -> String {
    let version = entry
        .version
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "no version".to_string());
    format!(
        "{} {} {}@{} (workspace has {})",
        entry.dependent, entry.kind, entry.dependency, entry.range, version
    )
}

fn print_text(unsatisfied: &[UnsatisfiedDependency], cli: &Cli) {
    if unsatisfied.is_empty() {
        if !cli.quiet {
            output::success("All internal dependency ranges are satisfied");
        }
        return;
    }

    println!(
        "{} ({})",
        output::header("Unsatisfied internal ranges"),
        style(unsatisfied.len()).yellow()
    );
    for entry in unsatisfied {
        println!("  {} {}", style("✗").red(), describe(entry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;
    use tandem_core::DependencyKind;

    #[test]
    fn test_describe() {
        let entry = UnsatisfiedDependency {
            dependent: "app".to_string(),
            kind: DependencyKind::Dependencies,
            dependency: "lib".to_string(),
            range: "^1.0.0".to_string(),
            version: Some(Version::new(2, 0, 0)),
        };
        assert_eq!(
            describe(&entry),
            "app dependencies lib@^1.0.0 (workspace has 2.0.0)"
        );
    }
}
