//! Release command

use clap::Args;
use console::style;
use tracing::info;

use tandem_core::monorepo::{
    BuildOptions, ChangeDetector, ChangeOptions, NpmPackList, ReleaseOptions, ReleasePlan,
    ReleasePlanner, ReleaseTree,
};
use tandem_core::vcs::CachedVcs;
use tandem_git::{ConventionalAnalyzer, GitRepo};

use super::{parse_bool, Workspace};
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Plan the next release of changed packages and their dependents.
///
/// Nothing is written, tagged or published; the plan is the output.
#[derive(Debug, Args)]
pub struct ReleaseCommand {
    /// Bump dependents even when the new version still satisfies their range
    #[arg(long, value_name = "BOOL", value_parser = parse_bool)]
    pub bump_in_range_dependencies: Option<bool>,

    /// Raise a dependent's release type to that of its dependency
    #[arg(long, value_name = "BOOL", value_parser = parse_bool)]
    pub inherit_greater_release_type: Option<bool>,

    /// Ignore devDependencies-only changes and dev edges
    #[arg(long)]
    pub exclude_dev_changes: bool,

    /// Ignore changes older than this commit-ish
    #[arg(long)]
    pub since: Option<String>,
}

impl ReleaseCommand {
    /// Execute the release command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            bump_in_range = ?self.bump_in_range_dependencies,
            inherit = ?self.inherit_greater_release_type,
            "executing release command"
        );
        let workspace = Workspace::load(&BuildOptions::default())?;
        if cli.verbose {
            if let Some(path) = &workspace.config_path {
                output::info(&format!("Using config {}", path.display()));
            }
        }

        let repo = GitRepo::discover(workspace.model.root_dir())?;
        let vcs = CachedVcs::new(&repo);
        let records = ChangeDetector::new(&workspace.model, &vcs, &NpmPackList)
            .with_options(self.change_options(&workspace))
            .detect()?;

        let analyzer = ConventionalAnalyzer::new(&repo);
        let plan = ReleasePlanner::new(&analyzer)
            .with_options(self.release_options(&workspace))
            .plan(&records)?;

        match cli.format {
            OutputFormat::Json => output::json(&plan)?,
            OutputFormat::Text => print_plan(&plan, cli),
        }

        Ok(())
    }

    fn change_options(&self, workspace: &Workspace) -> ChangeOptions {
        let mut options = ChangeOptions::from_config(&workspace.config);
        if self.since.is_some() {
            options.since = self.since.clone();
        }
        options.exclude_dev_changes |= self.exclude_dev_changes;
        options
    }

    fn release_options(&self, workspace: &Workspace) -> ReleaseOptions {
        let mut options = ReleaseOptions::from_config(&workspace.config);
        if let Some(value) = self.bump_in_range_dependencies {
            options.bump_in_range_dependencies = value;
        }
        if let Some(value) = self.inherit_greater_release_type {
            options.inherit_greater_release_type = value;
        }
        options.exclude_dev_changes |= self.exclude_dev_changes;
        options
    }
}

fn print_plan(plan: &ReleasePlan, cli: &Cli) {
    if plan.trees.is_empty() {
        if !cli.quiet {
            output::info("Nothing to release");
        }
        return;
    }

    if !cli.quiet {
        println!("{}", output::header("Release plan"));
    }
    for tree in &plan.trees {
        print_tree(tree);
    }

    for warning in &plan.warnings {
        output::warning(warning);
    }
}

fn print_tree(tree: &ReleaseTree) {
    let version = match (&tree.old_version, &tree.new_version) {
        (Some(old), Some(new)) => format!(
            "{} → {}",
            old,
            output::version_style().apply_to(new)
        ),
        (Some(old), None) => format!("{} (unchanged)", old),
        (None, _) => "unversioned".to_string(),
    };
    let publish = if tree.should_publish {
        style("publish").green()
    } else {
        style("no publish").dim()
    };
    println!(
        "  {} {} [{}] {}",
        output::package_style().apply_to(&tree.name),
        version,
        tree.release_type,
        publish
    );

    for (kind, dependencies) in &tree.dependencies {
        for (name, range) in dependencies {
            println!("{}", output::key_value(&format!("{} {}", kind, name), range));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tandem_core::config::{Config, PackageConfig};
    use tandem_core::monorepo::{WorkspaceModel, WorkspacePackage};

    fn workspace(config: Config) -> Workspace {
        Workspace {
            config,
            config_path: None,
            model: WorkspaceModel::from_packages(
                "/repo",
                WorkspacePackage::new("", "").root(),
                Vec::new(),
                &BuildOptions::default(),
            ),
        }
    }

    fn command(args: &[&str]) -> ReleaseCommand {
        let cli = Cli::parse_from(["tandem", "release"].iter().chain(args));
        match cli.command {
            crate::cli::Commands::Release(cmd) => cmd,
            _ => panic!("expected release command"),
        }
    }

    #[test]
    fn test_defaults_come_from_config() {
        let mut config = Config::default();
        config.packages.push(PackageConfig {
            name: "frozen".to_string(),
            bump_version: false,
        });

        let options = command(&[]).release_options(&workspace(config));
        assert!(options.bump_in_range_dependencies);
        assert!(!options.inherit_greater_release_type);
        assert!(options.frozen.contains("frozen"));
    }

    #[test]
    fn test_flags_override_config() {
        let options = command(&[
            "--bump-in-range-dependencies",
            "false",
            "--inherit-greater-release-type",
            "true",
            "--exclude-dev-changes",
        ])
        .release_options(&workspace(Config::default()));

        assert!(!options.bump_in_range_dependencies);
        assert!(options.inherit_greater_release_type);
        assert!(options.exclude_dev_changes);
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let result = Cli::try_parse_from(["tandem", "release", "--bump-in-range-dependencies", "sometimes"]);
        assert!(result.is_err());
    }
}
