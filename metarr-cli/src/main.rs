// metarr-cli/src/main.rs
//
// Entry point for the metarr binary: parse flags, run, exit with the code
// the run produced (0 success, 1 failures, 2 configuration error).

use clap::Parser;
use metarr_cli::{Cli, run, terminal};
use std::process;

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            terminal::print_error(&format!("{e:#}"));
            process::exit(1);
        }
    }
}
