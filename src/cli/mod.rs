//! CLI layer: argument parsing, logging setup, command dispatch.

pub mod args;

pub use args::*;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::api::{self, ExtractOptions, Extraction};
use crate::graph;
use crate::render::{self, StubOptions};
use crate::usage::{self, HelperConfig, UsageMode};
use crate::{CancelToken, SurfaceError};

// ─── CLI ─────────────────────────────────────────────────────────────

/// Public API surface extraction and sample-coverage engine for SDK packages
#[derive(Parser, Debug)]
#[command(name = "surface", version, about, after_help = "\
Run 'surface <COMMAND> --help' for detailed options and examples.\n\
Common options: -d <DIR> (package root), -t <N> (parse threads)")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log verbosity: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Extract the public API surface as JSON
    Extract(ExtractArgs),

    /// Render the API as compact prioritized stubs
    Stubs(StubsArgs),

    /// Score a sample corpus against the client surface
    Coverage(CoverageArgs),

    /// Print a human summary of the extracted surface
    Info(InfoArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            warn!(error = %e, "could not install Ctrl-C handler; cancellation disabled");
        }
    }

    let result = match cli.command {
        Commands::Extract(args) => cmd_extract(args, &cancel),
        Commands::Stubs(args) => cmd_stubs(args, &cancel),
        Commands::Coverage(args) => cmd_coverage(args, &cancel),
        Commands::Info(args) => cmd_info(args, &cancel),
    };

    if let Err(e) = result {
        eprintln!("Error [{}]: {}", e.code(), e);
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let level = match level {
        "error" => tracing::Level::ERROR,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::WARN,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn extraction_for(dir: &str, threads: usize, cancel: &CancelToken) -> Result<Extraction, SurfaceError> {
    let options = ExtractOptions { threads, ..ExtractOptions::default() };
    let extraction = api::extract(Path::new(dir), &options, cancel)?;
    let stats = &extraction.stats;
    eprintln!(
        "[surface] Parsed {} files in {:.1}s: {} types, {} read errors, {} lossy-utf8",
        stats.file_count,
        stats.elapsed_ms as f64 / 1000.0,
        extraction.index.type_count(),
        stats.parse_errors,
        stats.lossy_file_count,
    );
    Ok(extraction)
}

// ─── Commands ───────────────────────────────────────────────────────

fn cmd_extract(args: ExtractArgs, cancel: &CancelToken) -> Result<(), SurfaceError> {
    let extraction = extraction_for(&args.dir, args.threads, cancel)?;
    println!("{}", render::to_json(&extraction.index, args.pretty)?);
    Ok(())
}

fn cmd_stubs(args: StubsArgs, cancel: &CancelToken) -> Result<(), SurfaceError> {
    let extraction = extraction_for(&args.dir, args.threads, cancel)?;
    let options = StubOptions { budget: args.budget };
    print!("{}", render::render_stubs(&extraction.index, None, &options));
    Ok(())
}

fn cmd_coverage(args: CoverageArgs, cancel: &CancelToken) -> Result<(), SurfaceError> {
    let extraction = extraction_for(&args.dir, args.threads, cancel)?;
    let clients = graph::client_set(&extraction.index);
    eprintln!("[surface] Client surface: {} type(s)", clients.types.len());

    let mode = match &args.helper {
        Some(helper) => {
            let mut config = HelperConfig::new(PathBuf::from(helper));
            config.timeout = Duration::from_secs(args.timeout);
            UsageMode::Helper(config)
        }
        None => UsageMode::Native,
    };

    let usage_index = usage::analyze(
        &extraction.index,
        &clients,
        Path::new(&args.samples),
        &mode,
        cancel,
    )?;

    if args.stubs {
        let options = StubOptions { budget: args.budget };
        print!("{}", render::render_stubs(&extraction.index, Some(&usage_index), &options));
    } else {
        println!("{}", serde_json::to_string_pretty(&usage_index)?);
    }
    Ok(())
}

fn cmd_info(args: InfoArgs, cancel: &CancelToken) -> Result<(), SurfaceError> {
    let extraction = extraction_for(&args.dir, args.threads, cancel)?;
    let index = &extraction.index;

    println!("Package:    {}", index.package);
    if let Some(v) = &index.version {
        println!("Version:    {}", v);
    }
    println!("Namespaces: {}", index.namespaces.len());

    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    let mut entry_points = 0usize;
    for (_, t) in index.all_types() {
        *by_kind.entry(t.kind.as_str()).or_default() += 1;
        if t.entry_point == Some(true) {
            entry_points += 1;
        }
    }
    println!("Types:      {}", index.type_count());
    for (kind, count) in &by_kind {
        println!("  {:<14} {}", kind, count);
    }
    println!("Entry points: {}", entry_points);

    let clients = graph::client_set(index);
    println!("Client surface ({}):", clients.types.len());
    for client in &clients.types {
        println!("  {} ({} operations)", client.name, client.operations.len());
    }

    if let Some(deps) = index.dependencies.as_deref() {
        println!("Dependencies ({}):", deps.len());
        for dep in deps {
            let tag = if dep.is_stdlib == Some(true) { " [stdlib]" } else { "" };
            println!("  {}{}: {} type(s)", dep.package, tag, dep.types.len());
        }
    }
    Ok(())
}
