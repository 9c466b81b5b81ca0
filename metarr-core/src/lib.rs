//! Core library for sidecar-driven video metadata tagging.
//!
//! Metarr reads JSON and NFO sidecars written by video downloaders, fills a
//! normalised metadata record from them, applies user edits back to the
//! sidecar, and hands the result to ffmpeg to tag (and optionally
//! transcode) the matching video.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use metarr_core::{BatchProcessor, CancellationToken, Collaborators, CoreConfigBuilder};
//! use metarr_core::edit::ConsolePrompter;
//! use metarr_core::external::{CommandFfprobeExecutor, SidecarSpawner, SystemEncoderCatalog};
//! use metarr_core::processing::SysinfoProbe;
//! use metarr_core::scraper::NoopScraper;
//! use std::path::PathBuf;
//!
//! let config = CoreConfigBuilder::new()
//!     .video_dir(PathBuf::from("/videos"))
//!     .sidecar_dir(PathBuf::from("/videos"))
//!     .build()
//!     .unwrap();
//!
//! let spawner = SidecarSpawner;
//! let prober = CommandFfprobeExecutor::new();
//! let catalog = SystemEncoderCatalog::new();
//! let system = SysinfoProbe::new();
//! let scraper = NoopScraper::new();
//! let prompter = ConsolePrompter;
//! let tools = Collaborators {
//!     spawner: &spawner,
//!     prober: &prober,
//!     catalog: &catalog,
//!     system: &system,
//!     scraper: &scraper,
//!     prompter: &prompter,
//! };
//!
//! let summary = BatchProcessor::new(&config, tools, CancellationToken::new())
//!     .run()
//!     .unwrap();
//! println!("{} file(s) processed", summary.processed.len());
//! ```

pub mod cancel;
pub mod config;
pub mod dates;
pub mod discovery;
pub mod edit;
pub mod error;
pub mod external;
pub mod filename;
pub mod fill;
pub mod fsutil;
pub mod logging;
pub mod model;
pub mod processing;
pub mod scraper;
pub mod sidecar;
pub mod template;
pub mod transcode;

// Re-exports for public API
pub use cancel::CancellationToken;
pub use config::{CoreConfig, CoreConfigBuilder, PurgeMode};
pub use error::{CoreError, CoreResult, ProcessingError};
pub use model::{FileData, SidecarKind};
pub use processing::{BatchProcessor, Collaborators, FileReport, RunSummary};
pub use transcode::HwAccel;
