use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use deskfind::config::Config;
use deskfind::index::IndexRegistry;
use deskfind::progress::{NullReporter, TerminalReporter};
use deskfind::search::MatchedField;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// deskfind - index local directories and search their files
#[derive(Parser, Debug)]
#[command(name = "deskfind")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Index storage directory (overrides config file)
    #[arg(long, value_name = "DIR", global = true)]
    index_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a template configuration file
    Init {
        /// Where to write the template
        #[arg(value_name = "FILE", default_value = "deskfind.toml")]
        file: PathBuf,
    },
    /// Index the configured watched directories
    Index {
        /// Additional directories to index (adds to config file directories)
        #[arg(value_name = "DIR")]
        directories: Vec<String>,

        /// Hide the progress bar
        #[arg(long)]
        quiet: bool,
    },
    /// Search the index
    Search {
        /// Query terms (whitespace-separated, OR semantics per term)
        #[arg(value_name = "TERM", required = true)]
        terms: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Print the scoring explanation for each hit
        #[arg(long)]
        explain: bool,
    },
    /// Remove index entries whose files no longer exist
    Gc,
}

#[derive(Serialize)]
struct HitOutput {
    path: String,
    score: f32,
    matched_field: Option<MatchedField>,
    preview: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    match &args.command {
        Command::Init { file } => {
            if file.exists() {
                eprintln!("Error: Config file already exists: {}", file.display());
                eprintln!("Remove it first or choose a different path.");
                std::process::exit(1);
            }
            Config::write_template(file)?;
            println!("✓ Generated config file: {}", file.display());
            println!("\nEdit the file to add your directories, then index with:");
            println!("  deskfind --config {} index", file.display());
            Ok(())
        }
        Command::Index { directories, quiet } => {
            let config = load_config(&args, directories.clone())?;
            run_index(&config, *quiet)
        }
        Command::Search {
            terms,
            json,
            explain,
        } => {
            let config = load_config(&args, Vec::new())?;
            run_search(&config, &terms.join(" "), *json, *explain)
        }
        Command::Gc => {
            let config = load_config(&args, Vec::new())?;
            run_gc(&config)
        }
    }
}

fn load_config(args: &Args, extra_dirs: Vec<String>) -> Result<Config> {
    let config = if let Some(path) = &args.config {
        Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
    } else if let Some((config, path)) = Config::from_default_locations()? {
        info!(path = %path.display(), "Configuration loaded");
        config
    } else {
        Config::default()
    };

    Ok(config.with_overrides(args.index_path.clone(), extra_dirs))
}

fn run_index(config: &Config, quiet: bool) -> Result<()> {
    if config.directories.is_empty() {
        bail!(
            "no directories to index; pass them as arguments or add a [[directories]] \
             entry to the config file (see `deskfind init`)"
        );
    }

    let registry = IndexRegistry::new();
    let handle = registry.get(&config.index.path)?;

    let result = if quiet {
        handle.index_directories(&config.directories, &NullReporter)
    } else {
        let reporter = TerminalReporter::new();
        let result = handle.index_directories(&config.directories, &reporter);
        reporter.finish();
        result
    };
    result?;

    println!(
        "✓ Indexed {} directories into {}",
        config.directories.iter().filter(|d| d.used).count(),
        config.index.path.display()
    );

    registry.close_all()?;
    Ok(())
}

fn run_search(config: &Config, query: &str, json: bool, explain: bool) -> Result<()> {
    let registry = IndexRegistry::new();
    let handle = registry.get(&config.index.path)?;

    let hits = handle.search(query)?;

    if json {
        let mut outputs = Vec::with_capacity(hits.len());
        for hit in &hits {
            let document = handle.get_document(hit.address)?;
            outputs.push(HitOutput {
                path: document.path,
                score: hit.score,
                matched_field: handle.matched_field(hit.address, query)?,
                preview: handle.highlight(hit.address, query)?,
            });
        }
        println!("{}", serde_json::to_string_pretty(&outputs)?);
    } else {
        if hits.is_empty() {
            println!("No results for '{query}'");
        }
        for (rank, hit) in hits.iter().enumerate() {
            let document = handle.get_document(hit.address)?;
            let preview = handle.highlight(hit.address, query)?;
            println!("{:2}. {} (score {:.3})", rank + 1, document.path, hit.score);
            println!("    {preview}");
            if explain {
                println!("{}", handle.get_explanation(hit.address, query)?);
            }
        }
    }

    registry.close_all()?;
    Ok(())
}

fn run_gc(config: &Config) -> Result<()> {
    let registry = IndexRegistry::new();
    let handle = registry.get(&config.index.path)?;

    let removed = handle.garbage_collect()?;
    println!("✓ Removed {removed} stale entries");

    registry.close_all()?;
    Ok(())
}
