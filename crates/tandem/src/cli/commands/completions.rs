//! Shell completions

use std::path::PathBuf;

use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use tracing::info;

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Generate shell completions for tandem
#[derive(Debug, Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to this file instead of stdout
    #[arg(short, long, conflicts_with = "install")]
    pub output: Option<PathBuf>,

    /// Write the script to the shell's per-user completion directory
    #[arg(long)]
    pub install: bool,
}

impl CompletionsCommand {
    /// Execute the completions command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(shell = %self.shell, install = self.install, "executing completions command");

        let target = if self.install {
            let path = install_path(self.shell).ok_or_else(|| {
                anyhow::anyhow!(
                    "No per-user completion directory known for {}; use --output",
                    self.shell
                )
            })?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Some(path)
        } else {
            self.output.clone()
        };

        let script = render(self.shell);
        let Some(path) = target else {
            print!("{}", script);
            return Ok(());
        };

        std::fs::write(&path, &script)?;
        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({
                "shell": self.shell.to_string(),
                "path": path,
            }))?,
            OutputFormat::Text if !cli.quiet => {
                output::success(&format!("Completions written to {}", path.display()));
                if self.shell == Shell::Zsh {
                    output::info("Make sure ~/.zfunc is on your fpath before compinit");
                }
            }
            OutputFormat::Text => {}
        }

        Ok(())
    }
}

/// Completion script for the tandem command line
fn render(shell: Shell) -> String {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut buffer = Vec::new();
    generate(shell, &mut cmd, name, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Where each shell looks for per-user completion scripts
fn install_path(shell: Shell) -> Option<PathBuf> {
    match shell {
        Shell::Bash => Some(
            dirs::data_dir()?
                .join("bash-completion")
                .join("completions")
                .join("tandem"),
        ),
        Shell::Zsh => Some(dirs::home_dir()?.join(".zfunc").join("_tandem")),
        Shell::Fish => Some(
            dirs::config_dir()?
                .join("fish")
                .join("completions")
                .join("tandem.fish"),
        ),
        _ => None,
    }
}
