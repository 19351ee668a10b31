//! Command-line front end: argument parsing lives in [`args`], everything
//! else here just wires parsed flags to the library's `compress`/`Reader`
//! entry points.

pub mod args;

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use crate::config::HEADER_MAGIC;
use crate::container::compress;
use crate::reader::Reader;
use args::{Cli, Command};

const STDIN_MARK: &str = "-";

pub fn run(cli: Cli) -> anyhow::Result<i32> {
    if cli.qf.is_some() {
        bail!("--qf requires librpm's header formatting engine, which this implementation does not carry");
    }
    match cli.command {
        Some(Command::Compress { output, input }) => do_compress(output, input),
        None if cli.decompress => do_decompress(&cli),
        None => do_compress(cli.output.clone(), cli.inputs.first().cloned()),
    }
}

fn open_input(path: Option<&Path>) -> anyhow::Result<Box<dyn Read>> {
    match path {
        None => Ok(Box::new(io::stdin())),
        Some(p) if p.as_os_str() == STDIN_MARK => Ok(Box::new(io::stdin())),
        Some(p) => Ok(Box::new(
            File::open(p).with_context(|| format!("opening {}", p.display()))?,
        )),
    }
}

/// Chains every named input into one logical byte stream, the same as piping
/// `cat file1 file2 ... | zpkglist ...` would. Defaults to stdin when no
/// files are named.
fn chained_input(paths: &[PathBuf]) -> anyhow::Result<Box<dyn Read>> {
    if paths.is_empty() {
        return Ok(Box::new(io::stdin()));
    }
    let mut readers = Vec::with_capacity(paths.len());
    for p in paths {
        readers.push(open_input(Some(p))?);
    }
    let mut iter = readers.into_iter();
    let first = iter.next().expect("checked non-empty above");
    Ok(iter.fold(first, |acc, next| Box::new(acc.chain(next)) as Box<dyn Read>))
}

fn do_compress(output: Option<PathBuf>, input: Option<PathBuf>) -> anyhow::Result<i32> {
    let mut reader = open_input(input.as_deref())?;
    match output {
        Some(path) => {
            let mut f =
                File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            compress(&mut reader, &mut f, None)
                .with_context(|| format!("compressing into {}", path.display()))?;
        }
        None => {
            let mut buf = io::Cursor::new(Vec::new());
            compress(&mut reader, &mut buf, None).context("compressing")?;
            io::stdout()
                .write_all(&buf.into_inner())
                .context("writing to stdout")?;
        }
    }
    Ok(0)
}

fn do_decompress(cli: &Cli) -> anyhow::Result<i32> {
    let input = chained_input(&cli.inputs)?;
    let mut reader = match Reader::open(input).context("opening input")? {
        None => return Ok(0),
        Some(r) => r,
    };

    if cli.print_content_size {
        match reader.content_size() {
            Some(n) => println!("{n}"),
            None => println!("unknown"),
        }
        return Ok(0);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.malloc {
        while let Some((blob, _pos)) = reader.next_malloc().context("reading blob")? {
            out.write_all(&HEADER_MAGIC).context("writing to stdout")?;
            out.write_all(&blob).context("writing to stdout")?;
        }
    } else if cli.view {
        while let Some((blob, _pos)) = reader.next_view().context("reading blob")? {
            out.write_all(&HEADER_MAGIC).context("writing to stdout")?;
            out.write_all(blob).context("writing to stdout")?;
        }
    } else {
        while let Some(chunk) = reader.bulk().context("reading")? {
            out.write_all(chunk).context("writing to stdout")?;
        }
    }
    Ok(0)
}
