//! `codix` command-line entry point.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use codix_chunker::{Chunker, ChunkingOutcome, ChunkingRequest, PROFILES, Strategy};
use codix_core::Config;
use codix_core::config::resolve_config_path;
use codix_index::{CodeIndexer, IndexReport, IndexerConfig, JsonLinesSink, ScanOptions};

#[derive(Parser, Debug)]
#[command(name = "codix")]
#[command(about = "Semantic code chunking and repository indexing")]
#[command(version)]
struct Cli {
    /// Path to configuration file (default: $CODIX_CONFIG, then config/default.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk a single file and print its blocks
    Chunk {
        file: PathBuf,
        /// Override the configured strategy (ast, line, token)
        #[arg(long)]
        strategy: Option<Strategy>,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scan a directory and write one JSON record per block
    Index {
        dir: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        strategy: Option<Strategy>,
    },
    /// List recognized languages and their grammar support
    Languages,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            init_subscriber("info");
            return Err(e.context(format!("invalid config {}", config_path.display())));
        }
    };
    init_subscriber(&config.logging.level);
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    match cli.command {
        Command::Chunk {
            file,
            strategy,
            json,
        } => run_chunk(&config, &file, strategy, json),
        Command::Index {
            dir,
            output,
            strategy,
        } => run_index(&config, &dir, output.as_deref(), strategy),
        Command::Languages => {
            print_languages(&mut std::io::stdout().lock())?;
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays clean for block output.
fn init_subscriber(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn indexer_config(config: &Config, strategy: Option<Strategy>) -> IndexerConfig {
    IndexerConfig {
        limits: config.chunking.limits,
        filter_flags: config.chunking.filter,
        strategy: strategy.unwrap_or(config.chunking.strategy),
        scan: ScanOptions {
            max_file_size_bytes: config.scan.max_file_size_bytes,
            include_hidden: config.scan.include_hidden,
            respect_gitignore: config.scan.respect_gitignore,
        },
    }
}

fn run_chunk(
    config: &Config,
    file: &Path,
    strategy: Option<Strategy>,
    json: bool,
) -> anyhow::Result<()> {
    let content =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let settings = indexer_config(config, strategy);
    let mut chunker = Chunker::new(config.chunker_config()?);
    let request = ChunkingRequest::new(file, &content)
        .with_limits(settings.limits)
        .with_filter_flags(settings.filter_flags)
        .with_strategy(settings.strategy);
    let outcome = chunker.chunk(&request);

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &outcome)?;
        writeln!(out)?;
    } else {
        print_outcome(&mut out, &outcome)?;
    }
    Ok(())
}

fn print_outcome(out: &mut impl Write, outcome: &ChunkingOutcome) -> std::io::Result<()> {
    let language = outcome.language.map_or("unknown", |l| l.id());
    match outcome.fallback_reason {
        Some(reason) => writeln!(
            out,
            "language: {language}, strategy: {} (fallback: {reason})",
            outcome.strategy_used
        )?,
        None => writeln!(
            out,
            "language: {language}, strategy: {}",
            outcome.strategy_used
        )?,
    }
    for block in &outcome.blocks {
        writeln!(out)?;
        writeln!(
            out,
            "--- {} {} [{}-{}]",
            block.kind,
            block.name.as_deref().unwrap_or("-"),
            block.start_line,
            block.end_line
        )?;
        writeln!(out, "{}", block.text)?;
    }
    Ok(())
}

fn run_index(
    config: &Config,
    dir: &Path,
    output: Option<&Path>,
    strategy: Option<Strategy>,
) -> anyhow::Result<()> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut sink = JsonLinesSink::new(BufWriter::new(writer));
    let mut indexer = CodeIndexer::new(
        Chunker::new(config.chunker_config()?),
        indexer_config(config, strategy),
    );
    let report = indexer
        .index_project(dir, &mut sink)
        .with_context(|| format!("failed to index {}", dir.display()))?;

    print_report(&mut std::io::stderr().lock(), &report)?;
    Ok(())
}

fn print_report(out: &mut impl Write, report: &IndexReport) -> std::io::Result<()> {
    writeln!(
        out,
        "indexed {} of {} files ({} skipped, {} failed), {} blocks in {} ms",
        report.files_chunked,
        report.files_scanned,
        report.files_skipped,
        report.files_failed,
        report.blocks_emitted,
        report.duration_ms
    )?;
    for (strategy, count) in &report.by_strategy {
        writeln!(out, "  strategy {strategy}: {count}")?;
    }
    for (reason, count) in &report.fallbacks {
        writeln!(out, "  fallback {reason}: {count}")?;
    }
    for error in &report.errors {
        writeln!(out, "  error: {error}")?;
    }
    Ok(())
}

fn print_languages(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{:<12} {:<8} {:<8} matches", "language", "grammar", "query")?;
    for profile in PROFILES {
        let matches: Vec<String> = profile
            .extensions
            .iter()
            .map(|ext| format!(".{ext}"))
            .chain(profile.file_names.iter().map(|name| (*name).to_owned()))
            .collect();
        writeln!(
            out,
            "{:<12} {:<8} {:<8} {}",
            profile.lang.id(),
            if profile.lang.has_grammar() { "yes" } else { "no" },
            if profile.has_query { "yes" } else { "generic" },
            matches.join(" ")
        )?;
    }
    Ok(())
}
