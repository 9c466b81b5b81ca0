// ============================================================================
// metarr-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Exit codes for the metarr binary
//
// KEY COMPONENTS:
// - CliResult: Type alias for CLI operations
// - exit codes: 0 success, 1 any file failed, 2 configuration error

// ---- Internal crate imports ----
use metarr_core::{CoreError, CoreResult, RunSummary};

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURES: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;

/// Exit code for an error that stopped the run before or between batches.
pub fn exit_code_for(error: &CoreError) -> i32 {
    match error {
        CoreError::Config(_) | CoreError::DependencyNotFound(_) => EXIT_CONFIG,
        _ => EXIT_FAILURES,
    }
}

/// Exit code for a finished run. A cancelled run counts as failed.
pub fn exit_code_for_summary(summary: &RunSummary) -> i32 {
    if summary.has_failures() || summary.cancelled {
        EXIT_FAILURES
    } else {
        EXIT_SUCCESS
    }
}
