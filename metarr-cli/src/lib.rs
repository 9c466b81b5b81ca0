// metarr-cli/src/lib.rs
//
// Library portion of the Metarr CLI application.
// Contains argument definitions, flag parsing and the run logic.

pub mod cli;
pub mod config;
pub mod error;
pub mod run;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::Cli;
pub use config::build_core_config;
pub use run::run;
