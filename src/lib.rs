//! # mdvault
//!
//! A batch processor for Obsidian-style Markdown vaults. Point it at a
//! directory tree of Markdown plus binary media and it produces hashed
//! HTML artifacts with deterministic slugs, a matrix of responsive media
//! variants, a derived content graph, and a set of JSON catalogues — all
//! under one output directory.
//!
//! # Architecture: A Strictly Phased Pipeline
//!
//! ```text
//! 1. Walk       vault/    →  file descriptors     (ignore rules, classification)
//! 2. Transcode  media     →  media catalog        (size × format variants)
//! 3. Parse      markdown  →  parsed posts         (metrics, ToC, frontmatter)
//! 4. Allocate   slugs     →  slug table           (two-phase, deterministic)
//! 5. Resolve    posts     →  rendered HTML        (wiki-links, embeds, aliases)
//! 6. Graph      html      →  nodes + edges        (post→post, post→image)
//! 7. Emit       all       →  build/*.json         (atomic writes)
//! ```
//!
//! The ordering is the design: link resolution is deferred until slug
//! allocation has completed globally, because a wiki-link can only resolve
//! against the *complete* slug catalog. Resolving during parsing would be
//! a correctness bug, not an optimization.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`walker`] | Phase 1 — deterministic traversal, ignore rules, `public` inclusion |
//! | [`media`] | Phase 2 — the (size × format) transcoding matrix and catalog |
//! | [`frontmatter`] | Polymorphic YAML tree with date coercion and embed expansion |
//! | [`markdown`] | Phase 3 — metric extraction from the event stream |
//! | [`slugs`] | Phase 4 — two-phase unique slug assignment |
//! | [`resolver`] | Phase 5 — reference catalogs and final post assembly |
//! | [`render`] | Phase 5 — the HTML event-stream transform |
//! | [`graph`] | Phase 6 — content-hash-keyed relationship edges |
//! | [`issues`] | Non-fatal diagnostics, append-only from any worker |
//! | [`emit`] | Phase 7 — atomic JSON emission and per-post export |
//! | [`pipeline`] | Orchestration and the library entry point |
//! | [`config`] | The single configuration record |
//! | [`hash`] | SHA-256 helpers and the canonical post digest |
//!
//! # Design Decisions
//!
//! ## Determinism As A Contract
//!
//! Directory entries are sorted lexicographically, slug allocation consumes
//! files in enumeration order, parallel phases collect in input order, and
//! emitted JSON keeps keys in insertion order. Running the pipeline twice
//! over an unchanged vault produces byte-identical catalogues.
//!
//! ## Everything Recoverable Except The Root
//!
//! Only an invalid config or an unreadable input root aborts a run.
//! Missing media, slug conflicts, encoder failures and broken links are
//! recorded in the issue collector and the pipeline continues with
//! best-effort output. `processor-issues.json` is the diagnostic channel.
//!
//! ## Pure-Rust Media Encoding
//!
//! The transcoder decodes and encodes through the `image` crate ecosystem
//! (plus vendored libwebp for lossy WebP) — no ImageMagick, no FFmpeg, no
//! system dependencies. Sources the backend can't decode (SVG, video) are
//! carried as pass-through originals rather than dropped.
//!
//! # Usage
//!
//! ```no_run
//! use mdvault::config::Config;
//!
//! let config = Config {
//!     input: "vault".into(),
//!     output: "build".into(),
//!     ..Config::default()
//! };
//! let output = mdvault::pipeline::run(&config)?;
//! println!("{}", output.summary);
//! # Ok::<(), mdvault::pipeline::PipelineError>(())
//! ```

pub mod config;
pub mod emit;
pub mod frontmatter;
pub mod graph;
pub mod hash;
pub mod issues;
pub mod markdown;
pub mod media;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod slugs;
pub mod walker;
