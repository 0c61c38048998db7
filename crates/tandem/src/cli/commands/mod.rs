//! CLI commands

mod changed;
mod check;
mod completions;
mod cycles;
mod dependents;
mod release;

pub use changed::ChangedCommand;
pub use check::CheckCommand;
pub use completions::CompletionsCommand;
pub use cycles::CyclesCommand;
pub use dependents::DependentsCommand;
pub use release::ReleaseCommand;

use std::path::PathBuf;

use tracing::debug;

use tandem_core::config::{load_config_or_default, Config};
use tandem_core::monorepo::{BuildOptions, ManifestWorkspaces, WorkspaceModel};

/// Configuration and workspace model for the current directory
pub(crate) struct Workspace {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub model: WorkspaceModel,
}

impl Workspace {
    /// Load the workspace rooted at the working directory
    pub fn load(options: &BuildOptions) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let (config, config_path) = load_config_or_default(&cwd)?;
        let model = WorkspaceModel::build(&cwd, &ManifestWorkspaces, options)?;
        debug!(
            packages = model.packages().len(),
            prune = options.prune_dependencies,
            "workspace loaded"
        );

        Ok(Self {
            config,
            config_path,
            model,
        })
    }
}

/// Parse a `true`/`false` flag value
pub(crate) fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(format!("expected true or false, got '{}'", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Ok(true));
        assert_eq!(parse_bool("FALSE"), Ok(false));
        assert_eq!(parse_bool("0"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }
}
