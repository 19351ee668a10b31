//! Command-line argument definitions. `anyhow` is used here, and only here,
//! to attach file/operation context to errors before they reach `main`; the
//! library itself never pulls in `anyhow`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "zpkglist",
    version,
    about = "Codec for RPM package-list files and the zpkglist container format"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Decompress rather than compress.
    #[arg(short = 'd', long = "decompress")]
    pub decompress: bool,

    /// Read blobs via the malloc discipline (one owned allocation per blob).
    #[arg(long, conflicts_with = "view")]
    pub malloc: bool,

    /// Read blobs via the view discipline (a reused buffer, valid until the next call).
    #[arg(long)]
    pub view: bool,

    /// Print the declared content size and exit without decompressing.
    #[arg(long = "print-content-size")]
    pub print_content_size: bool,

    /// Query format string, as accepted by librpm tools. Parsed but not
    /// implemented: using it is a hard error rather than a silent no-op.
    #[arg(long = "qf", value_name = "FMT")]
    pub qf: Option<String>,

    /// Output path. Defaults to stdout.
    #[arg(short = 'o', long = "output", value_name = "OUT")]
    pub output: Option<PathBuf>,

    /// Input files. Defaults to stdin. Multiple files are concatenated as a
    /// single logical stream, same as `cat file1 file2 | zpkglist ...`.
    pub inputs: Vec<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compress a package-list stream into the zpkglist container format.
    Compress {
        #[arg(short = 'o', long = "output", value_name = "OUT")]
        output: Option<PathBuf>,
        input: Option<PathBuf>,
    },
}
