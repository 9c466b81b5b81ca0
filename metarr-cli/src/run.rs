// ============================================================================
// metarr-cli/src/run.rs
// ============================================================================
//
// RUN: Wire the parsed flags to the metarr-core batch orchestrator
//
// WORKFLOW:
// 1. Build and validate the CoreConfig (exit 2 on failure)
// 2. Initialise logging next to the first sidecar directory
// 3. Check for ffmpeg/ffprobe when videos will be processed
// 4. Install the Ctrl-C handler that cancels the run
// 5. Run all batches and print the summary

// ---- Internal crate imports ----
use crate::cli::Cli;
use crate::config::build_core_config;
use crate::error::{EXIT_CONFIG, exit_code_for, exit_code_for_summary};
use crate::terminal;

// ---- External crate imports ----
use anyhow::{Context, Result};
use log::{debug, info, warn};
use metarr_core::edit::ConsolePrompter;
use metarr_core::external::{
    CommandFfprobeExecutor, SidecarSpawner, SystemEncoderCatalog, check_dependency,
};
use metarr_core::logging::{init_logging, level_for};
use metarr_core::processing::SysinfoProbe;
use metarr_core::scraper::NoopScraper;
use metarr_core::{BatchProcessor, CancellationToken, Collaborators, CoreConfig, CoreResult};

// ---- Standard library imports ----
use std::time::Instant;

fn wants_videos(config: &CoreConfig) -> bool {
    !config.skip_videos && !(config.video_dirs.is_empty() && config.video_files.is_empty())
}

fn check_tools(config: &CoreConfig) -> CoreResult<()> {
    if wants_videos(config) {
        check_dependency("ffmpeg")?;
        check_dependency("ffprobe")?;
        debug!("External dependency check passed.");
    }
    Ok(())
}

/// Runs metarr with parsed flags and returns the process exit code.
/// `Err` is only returned for setup failures (logger, signal handler).
pub fn run(cli: Cli) -> Result<i32> {
    let start = Instant::now();

    let config = match build_core_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            terminal::print_error(&e.to_string());
            return Ok(EXIT_CONFIG);
        }
    };

    let log_dir = config.log_dir().filter(|dir| dir.is_dir());
    init_logging(log_dir.as_deref(), level_for(cli.debug_level))
        .context("failed to initialise logging")?;

    if let Err(e) = check_tools(&config) {
        terminal::print_error(&e.to_string());
        return Ok(exit_code_for(&e));
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            warn!("Interrupt received, finishing up");
            cancel.cancel();
        })
        .context("failed to install Ctrl-C handler")?;
    }

    let scraper = match &config.cookie_path {
        Some(path) => match NoopScraper::with_cookie_file(path) {
            Ok(scraper) => scraper,
            Err(e) => {
                terminal::print_error(&e.to_string());
                return Ok(exit_code_for(&e));
            }
        },
        None => NoopScraper::new(),
    };
    let spawner = SidecarSpawner;
    let prober = CommandFfprobeExecutor::new();
    let catalog = SystemEncoderCatalog::new();
    let system = SysinfoProbe::new();
    let prompter = ConsolePrompter;
    let tools = Collaborators {
        spawner: &spawner,
        prober: &prober,
        catalog: &catalog,
        system: &system,
        scraper: &scraper,
        prompter: &prompter,
    };

    terminal::print_section("Metarr");
    terminal::print_status("Workers", config.worker_count());
    if let Some(dir) = &log_dir {
        terminal::print_status("Log file", metarr_core::logging::log_file_path(dir).display());
    }
    terminal::print_processing("Processing batches");
    info!("Run started with {} worker(s)", config.worker_count());

    let summary = match BatchProcessor::new(&config, tools, cancel).run() {
        Ok(summary) => summary,
        Err(e) => {
            terminal::print_error(&e.to_string());
            return Ok(exit_code_for(&e));
        }
    };

    terminal::print_summary(&summary, start.elapsed());
    if !summary.has_failures() && !summary.cancelled {
        terminal::print_success("All files processed");
    }
    Ok(exit_code_for_summary(&summary))
}
