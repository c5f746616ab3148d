//! Pipeline orchestration.
//!
//! The library entry point. Phases are strictly ordered — no component
//! reads partial output from an earlier phase:
//!
//! ```text
//! walk → transcode media → parse markdown → allocate slugs
//!      → resolve + render → build graph → emit
//! ```
//!
//! Fatal errors (invalid config, unreadable input root) abort before any
//! output is written. Everything downstream is recoverable: diagnostics
//! accumulate in the issue collector and a successful run always produces
//! the full set of output files, with `processor-issues.json` as the
//! authoritative diagnostic channel.

use crate::config::{self, Config, ConfigError};
use crate::emit::{self, EmitError, EmitReport};
use crate::graph::{self, Graph};
use crate::issues::{Issue, IssueCollector};
use crate::markdown::{self, ParsedPost};
use crate::media::{self, MediaCatalog, RasterBackend};
use crate::resolver::{self, Post};
use crate::slugs;
use crate::walker;
use rayon::prelude::*;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("emit error: {0}")]
    Emit(#[from] EmitError),
}

/// Counts the CLI prints after a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub markdown_files: usize,
    pub media_files: usize,
    pub variants: usize,
    pub graph_edges: usize,
    pub issues: usize,
    pub elapsed_ms: u128,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} posts, {} media files ({} variants), {} graph edges, {} issues in {}ms",
            self.markdown_files,
            self.media_files,
            self.variants,
            self.graph_edges,
            self.issues,
            self.elapsed_ms
        )
    }
}

/// Everything a run produced, in memory. The same data has already been
/// written under the output directory.
#[derive(Debug)]
pub struct ProcessorOutput {
    pub posts: Vec<Post>,
    pub media: MediaCatalog,
    pub graph: Graph,
    pub issues: Vec<Issue>,
    pub report: EmitReport,
    pub summary: RunSummary,
}

/// Run the whole pipeline for one configuration.
pub fn run(config: &Config) -> Result<ProcessorOutput, PipelineError> {
    config.validate()?;
    let started = Instant::now();
    let input = config.input_dir();
    let issues = IssueCollector::new();

    info!("walking vault {}", input.display());
    let walk = walker::walk(&input, config);
    info!(
        "found {} markdown files, {} media candidates",
        walk.markdown.len(),
        walk.media.len()
    );

    let backend = RasterBackend::new();
    let media = media::transcode_all(&walk.media, config, &backend, &issues);

    info!("parsing {} markdown files", walk.markdown.len());
    let parsed: Vec<ParsedPost> = walk
        .markdown
        .par_iter()
        .filter_map(|file| markdown::parse_post(file, &media, &config.media.preferred_size))
        .collect();

    let slug_infos = slugs::allocate(&parsed, config.slug_strategy, &issues);

    info!("rendering {} posts", parsed.len());
    let mut posts = resolver::build_posts(&parsed, &slug_infos, &media, config, &issues);

    let graph = graph::build_graph(&mut posts, &media, config);

    let issues = issues.into_issues();
    let report = emit::emit_all(config, &posts, &media, &graph, &issues)?;

    let summary = RunSummary {
        markdown_files: posts.len(),
        media_files: media.records.len(),
        variants: media
            .records
            .iter()
            .map(|r| r.sizes.values().map(Vec::len).sum::<usize>())
            .sum(),
        graph_edges: graph.edges.len(),
        issues: issues.len(),
        elapsed_ms: started.elapsed().as_millis(),
    };
    info!("run complete: {summary}");

    Ok(ProcessorOutput {
        posts,
        media,
        graph,
        issues,
        report,
        summary,
    })
}

/// Initialize the global rayon pool from config.
///
/// Caps at the number of available CPU cores — the user can constrain
/// down, not up. Encoder workers are the memory-heavy part this protects.
pub fn init_worker_pool(config: &Config) {
    let workers = config::effective_workers(&config.processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()
        .ok();
    info!("using {workers} worker threads");
}
