//! lru-replay - run a trace of cache operations through an LRU cache

mod command;
mod error;
mod replay;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::command::parse_trace;
use crate::replay::{Replayer, Summary};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Trace file (reads stdin when omitted)
    trace: Option<PathBuf>,

    /// Cache capacity (number of items, 0 = unbounded)
    #[arg(short, long, default_value_t = 0)]
    capacity: usize,

    /// Print a JSON summary of cache statistics at the end
    #[arg(long)]
    json: bool,

    /// Suppress per-command output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so replies stay pipeable
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let input = read_trace(args.trace.as_deref(), io::stdin())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = run(&input, args.capacity, args.quiet, &mut out)?;

    if args.json {
        write_summary(&summary, &mut out)?;
    }
    Ok(())
}

/// Directives from `RUST_LOG` when they parse, `warn` otherwise
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

/// Read the whole trace from `path`, or from `stdin` when no path is given
fn read_trace<R: Read>(path: Option<&Path>, mut stdin: R) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read trace {}", path.display())),
        None => {
            let mut buf = String::new();
            stdin
                .read_to_string(&mut buf)
                .context("failed to read trace from stdin")?;
            Ok(buf)
        }
    }
}

fn write_summary<W: Write>(summary: &Summary, out: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, summary).context("failed to write summary")?;
    writeln!(out)?;
    Ok(())
}

fn run<W: Write>(input: &str, capacity: usize, quiet: bool, out: &mut W) -> Result<Summary> {
    let trace = parse_trace(input)?;
    info!(commands = trace.len(), capacity, "replaying trace");

    let mut replayer = Replayer::new(capacity);
    for entry in trace {
        debug!(line = entry.line, command = ?entry.command, "applying");
        for reply in replayer.apply(entry.command) {
            if !quiet {
                writeln!(out, "{}", reply)?;
            }
        }
    }

    let summary = replayer.summary();
    info!(
        len = summary.len,
        evictions = summary.evictions,
        hit_ratio = summary.hit_ratio,
        "trace finished"
    );
    Ok(summary)
}
