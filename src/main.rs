//! Binary entry point for the `zpkglist` command-line tool.
//!
//! Argument parsing and dispatch both live in [`zpkglist::cli`]; this file
//! only turns its `anyhow::Result<i32>` into a process exit code.

use clap::Parser;
use zpkglist::cli::args::Cli;

fn main() {
    let cli = Cli::parse();
    match zpkglist::cli::run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("zpkglist: {e:#}");
            std::process::exit(128);
        }
    }
}
