//! Logging setup for Metarr.
//!
//! Console output goes to stderr; when a log directory is known the same
//! records are also written to `metarr.log`, rotated at 1 MiB into three
//! gzip backups (`metarr.log.1.gz` .. `metarr.log.3.gz`).

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            RollingFileAppender,
            policy::compound::{
                CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
            },
        },
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

pub const LOG_FILE_NAME: &str = "metarr.log";
pub const LOG_ROTATE_BYTES: u64 = 1024 * 1024;
pub const LOG_BACKUPS: u32 = 3;

/// Maps `--debug-level 0..=5` to a level filter. Anything above 5 is trace.
pub fn level_for(debug_level: u8) -> LevelFilter {
    match debug_level {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 | 4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn build_config(log_dir: Option<&Path>, level: LevelFilter) -> Result<Config> {
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{h({l:<5})} {m}{n}")))
        .build();

    let mut builder =
        Config::builder().appender(Appender::builder().build("console", Box::new(console)));
    let mut root = Root::builder().appender("console");

    if let Some(dir) = log_dir {
        std::fs::create_dir_all(dir)?;
        let log_file = log_file_path(dir);
        let pattern = format!("{}.{{}}.gz", log_file.display());
        let roller = FixedWindowRoller::builder()
            .base(1)
            .build(&pattern, LOG_BACKUPS)?;
        let policy = CompoundPolicy::new(
            Box::new(SizeTrigger::new(LOG_ROTATE_BYTES)),
            Box::new(roller),
        );
        let file = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(
                "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}",
            )))
            .build(&log_file, Box::new(policy))?;
        builder = builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    Ok(builder.build(root.build(level))?)
}

/// Installs the global logger. Call once, before any batch runs.
pub fn init_logging(log_dir: Option<&Path>, level: LevelFilter) -> Result<()> {
    let config = build_config(log_dir, level)?;
    log4rs::init_config(config)?;
    log::debug!("Logger initialised at {}", level);
    Ok(())
}

pub fn log_file_path(dir: &Path) -> PathBuf {
    dir.join(LOG_FILE_NAME)
}
