// ============================================================================
// metarr-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: Styled status lines for the metarr binary
//
// Status lines go to stdout so they stay readable next to log output on
// stderr. Colour is decided by `console` (off when stdout is not a tty).
//
// KEY COMPONENTS:
// - styling: symbols and indentation
// - print_section / print_status / print_success / print_error
// - print_summary: per-run result listing

// ---- External crate imports ----
use console::style;
use metarr_core::processing::ExecuteOutcome;
use metarr_core::{FileReport, RunSummary};

// ---- Standard library imports ----
use std::time::Duration;

/// Styling constants for terminal output
pub mod styling {
    pub const SUCCESS_SYMBOL: &str = "✓";
    pub const PROCESSING_SYMBOL: &str = "»";
    pub const ERROR_SYMBOL: &str = "✗";

    pub const SECTION_PREFIX: &str = "===== ";
    pub const SECTION_SUFFIX: &str = " =====";

    pub const STATUS_INDENT: &str = "  ";
}

/// Print a section header for major phases
pub fn print_section(title: &str) {
    println!();
    println!(
        "{}{}{}",
        styling::SECTION_PREFIX,
        style(title.to_uppercase()).cyan().bold(),
        styling::SECTION_SUFFIX
    );
}

/// Print a label/value pair, label padded for alignment
pub fn print_status(label: &str, value: impl std::fmt::Display) {
    println!(
        "{}{:<14} {}",
        styling::STATUS_INDENT,
        style(format!("{label}:")).dim(),
        value
    );
}

pub fn print_processing(message: &str) {
    println!("{} {}", style(styling::PROCESSING_SYMBOL).cyan(), message);
}

pub fn print_success(message: &str) {
    println!("{} {}", style(styling::SUCCESS_SYMBOL).green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", style(styling::ERROR_SYMBOL).red().bold(), style(message).red());
}

fn describe(report: &FileReport) -> String {
    match &report.outcome {
        ExecuteOutcome::MetadataOnly => {
            if report.sidecar_changed {
                "sidecar updated".to_string()
            } else {
                "sidecar unchanged".to_string()
            }
        }
        ExecuteOutcome::AlreadyTagged { final_path } => {
            format!("already tagged: {}", final_path.display())
        }
        ExecuteOutcome::Encoded { final_path } => format!("wrote {}", final_path.display()),
    }
}

/// Formats a duration as `1h 2m 3s`, `2m 3s` or `3s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

/// Print the result of a whole run.
pub fn print_summary(summary: &RunSummary, elapsed: Duration) {
    print_section("Summary");
    for report in &summary.processed {
        println!(
            "{}{} {} ({})",
            styling::STATUS_INDENT,
            style(styling::SUCCESS_SYMBOL).green(),
            report.sidecar.display(),
            describe(report)
        );
    }
    for failure in &summary.failures {
        println!(
            "{}{} {}",
            styling::STATUS_INDENT,
            style(styling::ERROR_SYMBOL).red(),
            failure
        );
    }
    println!();
    print_status("Batches", summary.batches);
    print_status("Succeeded", style(summary.processed.len()).green().bold());
    if summary.has_failures() {
        print_status("Failed", style(summary.failures.len()).red().bold());
    } else {
        print_status("Failed", summary.failures.len());
    }
    print_status("Elapsed", format_duration(elapsed));
    if summary.cancelled {
        println!("{}", style("Run was cancelled").yellow());
    }
}
