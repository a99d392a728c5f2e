use std::path::PathBuf;

use clap::Parser;

/// sizew - cached recursive directory-size engine
///
/// Measures the total size of a directory tree, using a persistent on-disk
/// index to skip subtrees that provably have not changed since the last
/// scan.
#[derive(Parser, Debug)]
#[command(name = "sizew")]
#[command(about = "Cached recursive directory-size measurement")]
pub struct Args {
    /// Directory to measure
    pub path: PathBuf,

    /// Recurse into subdirectories; pass `--recursive false` to measure only
    /// the files directly in the target directory
    #[arg(short, long, default_value_t = true, action = clap::ArgAction::Set)]
    pub recursive: bool,

    /// Ignore the cache entirely: recompute everything, read or write nothing
    #[arg(long)]
    pub bypass_cache: bool,

    /// Force a full recompute, but still write results back to the cache
    #[arg(long)]
    pub recalculate: bool,

    /// Override the cache file's directory
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// Print timing and cache-hit statistics to stderr
    #[arg(long)]
    pub stats: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}
