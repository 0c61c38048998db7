//! Cycles command

use clap::Args;
use console::style;
use tracing::info;

use tandem_core::monorepo::{find_cycles, BuildOptions};

use super::{parse_bool, Workspace};
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Report dependency cycles between workspace packages
#[derive(Debug, Args)]
pub struct CyclesCommand {
    /// Whether devDependencies count as edges (defaults to the config value)
    #[arg(long, value_name = "BOOL", value_parser = parse_bool)]
    pub include_dev_dependencies: Option<bool>,

    /// Exit with a failure code when any cycle exists
    #[arg(long)]
    pub strict: bool,
}

impl CyclesCommand {
    /// Execute the cycles command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(strict = self.strict, "executing cycles command");
        let workspace = Workspace::load(&BuildOptions::default())?;
        let include_dev = self
            .include_dev_dependencies
            .unwrap_or(workspace.config.graph.include_dev_dependencies);

        let cycles = find_cycles(&workspace.model, include_dev);

        match cli.format {
            OutputFormat::Json => output::json(&cycles)?,
            OutputFormat::Text => {
                if cycles.is_empty() {
                    if !cli.quiet {
                        output::success("No dependency cycles");
                    }
                } else {
                    println!(
                        "{} ({})",
                        output::header("Dependency cycles"),
                        style(cycles.len()).yellow()
                    );
                    for cycle in &cycles {
                        println!("  {}", cycle);
                    }
                }
            }
        }

        if self.strict && !cycles.is_empty() {
            std::process::exit(exit_codes::VALIDATION_ERROR);
        }

        Ok(())
    }
}
