//! Error types for tandem

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using TandemError
pub type Result<T> = std::result::Result<T, TandemError>;

/// Main error type for tandem operations
#[derive(Debug, Error)]
pub enum TandemError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Manifest-related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Version-control errors
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Semver range errors
    #[error(transparent)]
    Range(#[from] RangeError),

    /// Change detection errors
    #[error(transparent)]
    Change(#[from] ChangeError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Package manifest errors
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The workspace root has no package.json
    #[error("Workspace manifest not found at {0}")]
    RootNotFound(PathBuf),

    /// A present manifest could not be parsed
    #[error("Failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A workspace pattern could not be expanded
    #[error("Invalid workspace pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// pnpm-workspace.yaml could not be parsed
    #[error("Failed to parse {path}: {source}")]
    PnpmWorkspace {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Version-control errors
#[derive(Debug, Error)]
pub enum VcsError {
    /// Repository not found
    #[error("Git repository not found at {0}")]
    RepositoryNotFound(PathBuf),

    /// Not a git repository
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    /// Failed to open repository
    #[error("Failed to open repository: {0}")]
    OpenFailed(String),

    /// No commits found
    #[error("No commits found in repository")]
    NoCommits,

    /// Unknown commit
    #[error("Unknown commit: {0}")]
    UnknownCommit(String),

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),
}

/// Semver range errors
#[derive(Debug, Error)]
pub enum RangeError {
    /// Range expression could not be parsed
    #[error("Invalid version range '{range}': {message}")]
    Invalid { range: String, message: String },

    /// Version could not be parsed
    #[error("Invalid version '{0}': {1}")]
    InvalidVersion(String, semver::Error),
}

/// Change detection errors
#[derive(Debug, Error)]
pub enum ChangeError {
    /// The version-control collaborator reported a directory instead of a file
    #[error("Changed file list contains a directory entry: {0}")]
    DirectoryEntry(String),
}

impl TandemError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}
