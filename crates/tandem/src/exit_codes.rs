//! Exit codes for the CLI

use tandem_core::TandemError;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Git error
pub const GIT_ERROR: i32 = 3;

/// Validation error (cycles or unsatisfied ranges in strict mode)
pub const VALIDATION_ERROR: i32 = 5;

/// Exit code for an error returned by a command
pub fn for_error(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<TandemError>() {
        Some(TandemError::Config(_)) => CONFIG_ERROR,
        Some(TandemError::Vcs(_)) => GIT_ERROR,
        _ if error.downcast_ref::<tandem_core::error::VcsError>().is_some() => GIT_ERROR,
        _ => ERROR,
    }
}
