//! Vault traversal and file classification.
//!
//! First phase of the pipeline. Walks the input tree, applies ignore rules,
//! and splits the survivors into Markdown files to process and media
//! candidates for the transcoder.
//!
//! ## Ignore Rules
//!
//! A fixed default list (docs files, VCS metadata, editor dotfolders, build
//! outputs, OS junk, test/coverage dirs, caches) is always applied. On top
//! of it, the first of these wins:
//!
//! 1. `<root>/.repoignore` — one gitignore-flavored pattern per line
//! 2. `ignore_patterns` from config
//! 3. nothing
//!
//! Pattern semantics are a gitignore subset: a pattern names a path segment
//! (or a `/`-joined run of segments), `*` matches within a single segment,
//! and matching a directory prunes recursion below it. Hidden directories
//! are always pruned.
//!
//! ## Determinism
//!
//! Directory entries are visited in lexicographic order
//! (`sort_by_file_name`), so enumeration order — and everything downstream
//! that mirrors it, including slug allocation — is a contract, not an
//! accident of the platform's readdir order.
//!
//! ## Failure Model
//!
//! Unreadable files log a warning and are skipped. The walker never aborts
//! the run.

use crate::config::Config;
use crate::frontmatter;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Media extensions the transcoder accepts as candidates.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "avif", "svg", "mp4", "webm",
];

/// Always-ignored entries, independent of any overlay.
const DEFAULT_IGNORES: &[&str] = &[
    "README.md",
    "LICENSE",
    "LICENSE.md",
    "CONTRIBUTING.md",
    "CHANGELOG.md",
    "node_modules",
    "build",
    "dist",
    "out",
    "target",
    "coverage",
    "__tests__",
    "tmp",
    "Thumbs.db",
    "desktop.ini",
];

/// A file discovered in the vault.
#[derive(Debug, Clone)]
pub struct VaultFile {
    pub absolute_path: PathBuf,
    /// Path relative to the vault root, forward slashes.
    pub relative_path: String,
    /// Parent folder relative to the root; empty at the root.
    pub folder: String,
    pub file_name: String,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl VaultFile {
    /// Filename without its extension.
    pub fn stem(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_name)
    }

    pub fn extension(&self) -> &str {
        self.file_name.rsplit_once('.').map(|(_, e)| e).unwrap_or("")
    }
}

/// Result of a traversal.
#[derive(Debug, Default)]
pub struct VaultWalk {
    /// Markdown files that passed the inclusion rule, in traversal order.
    pub markdown: Vec<VaultFile>,
    /// All discovered media candidates, in traversal order.
    pub media: Vec<VaultFile>,
}

/// A single gitignore-flavored pattern, pre-split into segments.
#[derive(Debug, Clone)]
struct Pattern {
    segments: Vec<String>,
}

impl Pattern {
    fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        Some(Self {
            segments: trimmed.split('/').map(str::to_string).collect(),
        })
    }

    /// `*` matches any run of characters within one segment.
    fn segment_matches(pattern: &str, segment: &str) -> bool {
        let mut parts = pattern.split('*');
        let Some(first) = parts.next() else {
            return pattern == segment;
        };
        if !segment.starts_with(first) {
            return false;
        }
        let mut pos = first.len();
        let mut rest: Vec<&str> = parts.collect();
        let last = rest.pop();
        for part in rest {
            match segment[pos..].find(part) {
                Some(found) => pos += found + part.len(),
                None => return false,
            }
        }
        match last {
            Some(last) => segment.len() >= pos && segment[pos..].ends_with(last),
            // No `*` at all: the prefix check above must cover the whole segment
            None => segment.len() == first.len(),
        }
    }

    /// Whether any contiguous window of the path's segments matches.
    fn matches(&self, rel_path: &str) -> bool {
        let path_segments: Vec<&str> = rel_path.split('/').collect();
        if self.segments.len() > path_segments.len() {
            return false;
        }
        for start in 0..=(path_segments.len() - self.segments.len()) {
            if self
                .segments
                .iter()
                .zip(&path_segments[start..])
                .all(|(p, s)| Self::segment_matches(p, s))
            {
                return true;
            }
        }
        false
    }
}

/// The combined ignore rules for a run.
#[derive(Debug)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    /// Build from defaults plus the `.repoignore` / config overlay.
    pub fn for_vault(root: &Path, config: &Config) -> Self {
        let mut patterns: Vec<Pattern> =
            DEFAULT_IGNORES.iter().filter_map(|p| Pattern::new(p)).collect();

        let repoignore = root.join(".repoignore");
        let overlay: Vec<String> = if repoignore.is_file() {
            match fs::read_to_string(&repoignore) {
                Ok(content) => content.lines().map(str::to_string).collect(),
                Err(e) => {
                    warn!("failed to read .repoignore: {e}");
                    Vec::new()
                }
            }
        } else {
            config.ignore_patterns.clone().unwrap_or_default()
        };

        patterns.extend(overlay.iter().filter_map(|p| Pattern::new(p)));
        Self { patterns }
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(rel_path))
    }
}

/// Walk the vault and classify its files.
pub fn walk(root: &Path, config: &Config) -> VaultWalk {
    let ignores = IgnoreSet::for_vault(root, config);
    let mut result = VaultWalk::default();

    let iter = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.path() == root {
                return true;
            }
            // Hidden directories are always pruned; hidden files still go
            // through classification and the inclusion rule
            if entry.file_type().is_dir()
                && entry.file_name().to_string_lossy().starts_with('.')
            {
                return false;
            }
            let rel = relative_str(entry.path(), root);
            !ignores.matches(&rel)
        });

    for entry in iter {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("walk error: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if ext == "md" {
            if let Some(file) = describe(path, root) {
                if include_markdown(&file, config) {
                    result.markdown.push(file);
                }
            }
        } else if MEDIA_EXTENSIONS.contains(&ext.as_str()) {
            if let Some(file) = describe(path, root) {
                result.media.push(file);
            }
        }
    }

    result
}

/// Inclusion rule: everything when `process_all_files`, else only files
/// whose frontmatter carries a truthy `public` key.
fn include_markdown(file: &VaultFile, config: &Config) -> bool {
    if config.posts.process_all_files {
        return true;
    }
    match fs::read_to_string(&file.absolute_path) {
        Ok(content) => frontmatter::is_public(&content),
        Err(e) => {
            warn!("skipping unreadable file {}: {e}", file.relative_path);
            false
        }
    }
}

/// Build a descriptor for a discovered file.
fn describe(path: &Path, root: &Path) -> Option<VaultFile> {
    let relative_path = relative_str(path, root);
    let file_name = path.file_name()?.to_string_lossy().to_string();
    let folder = match relative_path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    };

    let (created, modified) = match fs::metadata(path) {
        Ok(meta) => (
            meta.created().ok().map(DateTime::<Utc>::from),
            meta.modified().ok().map(DateTime::<Utc>::from),
        ),
        Err(e) => {
            warn!("failed to stat {relative_path}: {e}");
            (None, None)
        }
    };

    Some(VaultFile {
        absolute_path: path.to_path_buf(),
        relative_path,
        folder,
        file_name,
        created,
        modified,
    })
}

fn relative_str(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
