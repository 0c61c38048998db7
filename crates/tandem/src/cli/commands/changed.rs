//! Changed command

use clap::Args;
use console::style;
use tracing::info;

use tandem_core::monorepo::{BuildOptions, ChangeDetector, ChangeOptions, ChangeRecord, NpmPackList};
use tandem_core::vcs::CachedVcs;
use tandem_git::GitRepo;

use super::Workspace;
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// List packages with changes since their last release
#[derive(Debug, Args)]
pub struct ChangedCommand {
    /// Show the changed files of each package
    #[arg(long)]
    pub files: bool,

    /// Ignore changes older than this commit-ish
    #[arg(long)]
    pub since: Option<String>,

    /// Ignore package.json edits confined to devDependencies or publishConfig
    #[arg(long)]
    pub exclude_dev_changes: bool,
}

impl ChangedCommand {
    /// Execute the changed command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(since = ?self.since, "executing changed command");
        let workspace = Workspace::load(&BuildOptions::default())?;
        let options = self.options(&workspace);

        let repo = GitRepo::discover(workspace.model.root_dir())?;
        let vcs = CachedVcs::new(&repo);
        let records = ChangeDetector::new(&workspace.model, &vcs, &NpmPackList)
            .with_options(options)
            .detect()?;

        match cli.format {
            OutputFormat::Json => {
                let output: Vec<_> = records
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "name": r.name,
                            "path": r.path,
                            "cascaded": r.is_cascaded(),
                            "releasable": r.is_releasable(),
                            "changedFiles": r.changed_files,
                            "changedReleasableFiles": r.changed_releasable_files,
                        })
                    })
                    .collect();
                output::json(&output)?;
            }
            OutputFormat::Text => self.print_text(&records, cli),
        }

        Ok(())
    }

    fn options(&self, workspace: &Workspace) -> ChangeOptions {
        let mut options = ChangeOptions::from_config(&workspace.config);
        if self.since.is_some() {
            options.since = self.since.clone();
        }
        options.exclude_dev_changes |= self.exclude_dev_changes;
        options
    }

    fn print_text(&self, records: &[ChangeRecord], cli: &Cli) {
        if records.is_empty() {
            if !cli.quiet {
                output::info("No packages changed");
            }
            return;
        }

        if !cli.quiet {
            println!("{}", output::header("Changed packages"));
        }
        for record in records {
            let marker = if record.is_cascaded() {
                style("cascaded").dim()
            } else if record.is_releasable() {
                style("releasable").green()
            } else {
                style("unreleasable").yellow()
            };
            println!(
                "  {} {} ({})",
                output::package_style().apply_to(&record.name),
                output::path_style().apply_to(record.path.display()),
                marker
            );

            if self.files || cli.verbose {
                for file in &record.changed_files {
                    let flag = if record.changed_releasable_files.contains(file) {
                        style("*").green()
                    } else {
                        style(" ").dim()
                    };
                    println!("    {} {}", flag, file);
                }
            }
        }
    }
}
