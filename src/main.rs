//! mdvault CLI.
//!
//! A thin wrapper over the library: load `mdvault.toml`, apply flag
//! overrides, size the worker pool, run the pipeline, print the summary.
//! Everything interesting lives behind [`mdvault::pipeline::run`].

use clap::{Parser, Subcommand};
use mdvault::config;
use mdvault::pipeline;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mdvault")]
#[command(version)]
#[command(about = "Batch processor for Obsidian-style Markdown vaults")]
#[command(long_about = "\
Batch processor for Obsidian-style Markdown vaults

Walks a vault of Markdown and media, resolves wiki-links, embeds and
aliases, and writes hashed HTML artifacts, responsive media variants, a
content graph, and JSON catalogues into the output directory.

Configuration comes from mdvault.toml (see --config); the flags below
override the file. Only `input` is required:

  mdvault build --input vault --output build

Outputs under <output>/:
  posts.json            final post records
  slug-map.json         slug → content hash
  path-map.json         original path → content hash
  media/                encoded (size × format) variants
  media*.json           media catalogue and index maps
  graph.json            post/media relationship graph
  processor-issues.json every non-fatal diagnostic of the run")]
struct Cli {
    /// Config file
    #[arg(long, default_value = "mdvault.toml", global = true)]
    config: PathBuf,

    /// Vault root (overrides the config file)
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Output directory (overrides the config file)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Verbosity 0-3 (overrides the config file)
    #[arg(long, global = true)]
    debug_level: Option<u8>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline
    Build,
    /// Print the effective configuration as TOML and exit
    ShowConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = config::load_config(&cli.config)?;
    if let Some(input) = cli.input {
        config.input = input;
    }
    if let Some(output) = cli.output {
        config.output = output;
    }
    if let Some(debug_level) = cli.debug_level {
        config.debug_level = debug_level;
    }

    init_tracing(config.debug_level);

    match cli.command {
        Command::Build => {
            pipeline::init_worker_pool(&config);
            let output = pipeline::run(&config)?;
            println!("==> {}", output.summary);
            if !output.issues.is_empty() {
                println!(
                    "==> {} issue(s) recorded in processor-issues.json",
                    output.issues.len()
                );
            }
            println!("==> Output: {}", config.output_dir().display());
        }
        Command::ShowConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Map `debug_level` 0..3 onto a tracing env-filter, unless RUST_LOG is
/// set explicitly.
fn init_tracing(debug_level: u8) {
    let level = match debug_level {
        0 => "error",
        1 => "warn",
        2 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mdvault={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
