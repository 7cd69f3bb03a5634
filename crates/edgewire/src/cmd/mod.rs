use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use edgewire_frame::FrameConfig;

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod dump;
pub mod stats;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a capture and print each element.
    Dump(DumpArgs),
    /// Count elements per type and units per data type.
    Stats(StatsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Dump(args) => dump::run(args, format),
        Command::Stats(args) => stats::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Capture of concatenated elements (`-` for stdin).
    pub input: PathBuf,
    /// Stop after printing N elements.
    #[arg(long)]
    pub limit: Option<usize>,
    /// Only print stream-scoped elements of these streams (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub stream: Option<Vec<u8>>,
    /// Maximum unit content size in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_content: Option<usize>,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Capture of concatenated elements (`-` for stdin).
    pub input: PathBuf,
    /// Maximum unit content size in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_content: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn open_input(path: &Path) -> CliResult<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(std::io::stdin()));
    }
    let file = File::open(path)
        .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
    Ok(Box::new(file))
}

pub fn frame_config(max_content: Option<usize>) -> FrameConfig {
    let mut config = FrameConfig::default();
    if let Some(max) = max_content {
        config.max_content_len = max;
    }
    config
}
