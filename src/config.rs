//! Processor configuration.
//!
//! The core is invoked with a single [`Config`] record. The CLI loads it from
//! an optional `mdvault.toml`; library embedders construct it directly.
//! Everything except `input` has a sensible default.
//!
//! ## Config File Shape
//!
//! ```toml
//! input = "vault"            # Required: the vault root
//! output = "build"           # Output directory
//! notes_prefix = "/notes"    # URL prefix for post pages
//! media_prefix = "/media"    # URL prefix for encoded media variants
//! # domain = "https://cdn.example.com"
//!
//! [media]
//! optimize = true
//! use_hash = false           # Content-addressed media layout
//! preferred_size = "lg"
//!
//! [posts]
//! process_all_files = false  # When false, only frontmatter `public: true`
//! export_enabled = false     # Per-post JSON export
//!
//! [processing]
//! max_workers = 4            # Omit for auto = CPU cores
//! ```
//!
//! ## Partial Configuration
//!
//! Only override what you need — every section merges over defaults:
//!
//! ```toml
//! input = "vault"
//!
//! [media]
//! skip_existing = true
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("input directory is required")]
    MissingInput,
    #[error("input directory does not exist or is unreadable: {0}")]
    InputUnreadable(PathBuf),
}

/// Full processor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory all relative paths resolve against. Defaults to cwd.
    pub base: Option<PathBuf>,
    /// Vault root to process. Required.
    pub input: PathBuf,
    /// Output directory.
    pub output: PathBuf,

    pub posts_filename: String,
    pub posts_folder: String,
    pub slug_map_filename: String,
    pub path_map_filename: String,
    pub media_folder_name: String,
    pub media_results_filename: String,
    pub media_path_map_filename: String,
    pub media_path_url_map_filename: String,
    pub media_path_hash_map_filename: String,

    /// URL prefix for post pages (`<notes_prefix>/<slug>`).
    pub notes_prefix: String,
    /// URL prefix for non-media static assets.
    pub assets_prefix: String,
    /// URL prefix for encoded media variants.
    pub media_prefix: String,
    /// Optional absolute origin, e.g. `https://cdn.example.com`.
    pub domain: Option<String>,
    /// Prefer absolute URLs in the path→url maps when a domain is set.
    pub use_absolute_paths: bool,

    pub media: MediaConfig,
    pub posts: PostsConfig,
    pub embeds: EmbedConfig,
    pub mermaid: MermaidConfig,
    pub processing: ProcessingConfig,

    /// Ignore patterns used when the vault has no `.repoignore`.
    pub ignore_patterns: Option<Vec<String>>,
    /// How slug collisions are broken.
    pub slug_strategy: SlugStrategy,
    /// 0 = errors only, 1 = warnings, 2 = info, 3 = debug.
    pub debug_level: u8,
}

/// Deterministic slug conflict resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugStrategy {
    /// Append `2`, `3`, … until unique.
    Number,
    /// Append the first 8 hex chars of the file's content hash.
    Hash,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base: None,
            input: PathBuf::new(),
            output: PathBuf::from("build"),
            posts_filename: "posts.json".into(),
            posts_folder: "posts".into(),
            slug_map_filename: "slug-map.json".into(),
            path_map_filename: "path-map.json".into(),
            media_folder_name: "media".into(),
            media_results_filename: "media.json".into(),
            media_path_map_filename: "media-path-map.json".into(),
            media_path_url_map_filename: "media-path-url-map.json".into(),
            media_path_hash_map_filename: "media-path-hash-map.json".into(),
            notes_prefix: "/notes".into(),
            assets_prefix: "/assets".into(),
            media_prefix: "/media".into(),
            domain: None,
            use_absolute_paths: false,
            media: MediaConfig::default(),
            posts: PostsConfig::default(),
            embeds: EmbedConfig::default(),
            mermaid: MermaidConfig::default(),
            processing: ProcessingConfig::default(),
            ignore_patterns: None,
            slug_strategy: SlugStrategy::Number,
            debug_level: 1,
        }
    }
}

impl Config {
    /// Validate the parts whose absence is fatal (abort before any output
    /// is written). Everything else is recoverable downstream.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.as_os_str().is_empty() {
            return Err(ConfigError::MissingInput);
        }
        let input = self.input_dir();
        if !input.is_dir() {
            return Err(ConfigError::InputUnreadable(input));
        }
        Ok(())
    }

    fn base_dir(&self) -> PathBuf {
        self.base
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Absolute vault root.
    pub fn input_dir(&self) -> PathBuf {
        if self.input.is_absolute() {
            self.input.clone()
        } else {
            self.base_dir().join(&self.input)
        }
    }

    /// Absolute output root.
    pub fn output_dir(&self) -> PathBuf {
        if self.output.is_absolute() {
            self.output.clone()
        } else {
            self.base_dir().join(&self.output)
        }
    }

    /// Directory all encoded media variants land in.
    pub fn media_output_dir(&self) -> PathBuf {
        self.output_dir().join(&self.media_folder_name)
    }

    /// Directory for the optional per-post export.
    pub fn posts_export_dir(&self) -> PathBuf {
        self.output_dir().join(&self.posts_folder)
    }

    /// `domain` with any trailing slash trimmed, when configured.
    pub fn trimmed_domain(&self) -> Option<&str> {
        self.domain.as_deref().map(|d| d.trim_end_matches('/'))
    }
}

/// Media transcoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Skip media processing entirely (empty catalog).
    pub skip: bool,
    /// Produce resized/re-encoded variants. When false, only pass-through
    /// `original` entries are produced.
    pub optimize: bool,
    /// Reuse an output file when it exists and is newer than the source.
    pub skip_existing: bool,
    /// Re-encode even when `skip_existing` would reuse an output.
    pub force_reprocess: bool,
    /// Size matrix. Width in px of the bounding box; height unbounded.
    pub sizes: Vec<SizeSpec>,
    /// Format matrix.
    pub formats: Vec<FormatSpec>,
    /// Content-addressed output layout.
    pub use_hash: bool,
    /// Shard hashed outputs by the first two hex chars.
    pub use_hash_sharding: bool,
    /// Content hashes whose sources are recorded but never written.
    pub skip_hashes: Vec<String>,
    /// First preference for best-variant selection.
    pub preferred_size: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            skip: false,
            optimize: true,
            skip_existing: false,
            force_reprocess: false,
            sizes: SizeSpec::defaults(),
            formats: FormatSpec::defaults(),
            use_hash: false,
            use_hash_sharding: false,
            skip_hashes: Vec::new(),
            preferred_size: "lg".into(),
        }
    }
}

/// One entry of the size matrix. `width: None` is the `original`
/// pass-through pseudo-size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSpec {
    pub name: String,
    pub width: Option<u32>,
}

impl SizeSpec {
    pub fn defaults() -> Vec<Self> {
        [
            ("xs", Some(320)),
            ("sm", Some(640)),
            ("md", Some(1024)),
            ("lg", Some(1920)),
            ("xl", Some(3840)),
            ("original", None),
        ]
        .into_iter()
        .map(|(name, width)| Self {
            name: name.into(),
            width,
        })
        .collect()
    }
}

/// One entry of the format matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSpec {
    pub format: String,
    pub quality: u8,
}

impl FormatSpec {
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                format: "webp".into(),
                quality: 80,
            },
            Self {
                format: "jpeg".into(),
                quality: 85,
            },
        ]
    }
}

/// Post output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostsConfig {
    /// Write hash-named and slug-named per-post JSON files.
    pub export_enabled: bool,
    /// Embed referenced media records in per-post exports.
    pub include_media_data: bool,
    /// Include every Markdown file, not just frontmatter `public: true`.
    pub process_all_files: bool,
}

/// Which URL classes the iframe-embed stage is allowed to expand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Off by default so mermaid fences are owned by the mermaid stage.
    pub mermaid: bool,
    pub html: bool,
    pub markdown: bool,
    pub code: bool,
    pub video: bool,
    pub midi: bool,
    pub model3d: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            mermaid: false,
            html: false,
            markdown: false,
            code: false,
            video: true,
            midi: true,
            model3d: true,
        }
    }
}

/// How mermaid code fences are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MermaidStrategy {
    /// Render to a PNG file via `mmdc` and emit an `<img>`.
    ImgPng,
    /// Render to an SVG file via `mmdc` and emit an `<img>`.
    ImgSvg,
    /// Render via `mmdc` and inline the SVG markup.
    InlineSvg,
    /// Emit `<pre class="mermaid">` for client-side rendering.
    PreMermaid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MermaidConfig {
    pub enabled: bool,
    pub strategy: MermaidStrategy,
    /// Use the dark theme when shelling out.
    pub dark: bool,
    /// Filename prefix for rendered diagram files.
    pub prefix: String,
    /// Raw mermaid config JSON forwarded to the renderer.
    pub config: Option<String>,
}

impl Default for MermaidConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: MermaidStrategy::InlineSvg,
            dark: false,
            prefix: "mermaid".into(),
            config: None,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_workers.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Load a config file, returning defaults when the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}
