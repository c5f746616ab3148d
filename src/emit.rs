//! Output emission.
//!
//! Final pipeline phase: write the catalogues, index maps, per-post export
//! and issues report under the output directory. All JSON is UTF-8,
//! pretty-printed, with object keys in insertion order (`serde_json` with
//! `preserve_order`), so reruns produce byte-identical files and diffs
//! stay small.
//!
//! Files are written to a sibling temp path and renamed into place, so a
//! killed process leaves either the old file or the new one — never a
//! torn write. Pre-existing files in the output tree are never deleted.

use crate::config::Config;
use crate::graph::{EdgeType, Graph};
use crate::issues::Issue;
use crate::media::MediaCatalog;
use crate::resolver::Post;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What was written where, for the run summary.
#[derive(Debug, Default)]
pub struct EmitReport {
    pub files_written: Vec<PathBuf>,
    pub export_refused: bool,
}

/// One line of the per-post export index.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportIndexEntry {
    slug: String,
    hash: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    colophon: Option<String>,
}

/// A per-post export document, optionally carrying referenced media.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedPost<'a> {
    #[serde(flatten)]
    post: &'a Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<Vec<&'a crate::media::MediaRecord>>,
}

/// Write every output file for the run.
pub fn emit_all(
    config: &Config,
    posts: &[Post],
    media: &MediaCatalog,
    graph: &Graph,
    issues: &[Issue],
) -> Result<EmitReport, EmitError> {
    let output_dir = config.output_dir();
    let mut report = EmitReport::default();

    let mut write = |name: &str, value: &dyn erased::Value| -> Result<(), EmitError> {
        let path = output_dir.join(name);
        write_string_atomic(&path, &value.to_pretty_json()?)?;
        report.files_written.push(path);
        Ok(())
    };

    write(&config.posts_filename, &posts)?;

    // slug→hash and originalPath→hash indices, in post order
    let mut slug_map = serde_json::Map::new();
    let mut path_map = serde_json::Map::new();
    for post in posts {
        slug_map.insert(post.slug.clone(), serde_json::Value::String(post.hash.clone()));
        path_map.insert(
            post.original_file_path.clone(),
            serde_json::Value::String(post.hash.clone()),
        );
    }
    write(&config.slug_map_filename, &slug_map)?;
    write(&config.path_map_filename, &path_map)?;

    write(&config.media_results_filename, &media.records)?;
    write(&config.media_path_map_filename, &media.path_map)?;
    write(&config.media_path_url_map_filename, &media.path_url_map)?;
    write(&config.media_path_hash_map_filename, &media.path_hash_map)?;
    // The hash→url inversion keeps its historical hardcoded filename
    write("media-hash-url-map.json", &media.hash_url_map())?;

    if !graph.is_empty() {
        write("graph.json", graph)?;
    }

    write("processor-issues.json", &issues)?;

    if config.posts.export_enabled {
        export_posts(config, posts, media, graph, &mut report)?;
    }

    info!("wrote {} output files", report.files_written.len());
    Ok(report)
}

/// Hash-named and slug-named per-post JSON, plus index files.
fn export_posts(
    config: &Config,
    posts: &[Post],
    media: &MediaCatalog,
    graph: &Graph,
    report: &mut EmitReport,
) -> Result<(), EmitError> {
    let export_dir = config.posts_export_dir();
    let input_dir = config.input_dir();

    if path_is_within(&export_dir, &input_dir) {
        error!(
            "refusing per-post export: {} is inside the input vault {}",
            export_dir.display(),
            input_dir.display()
        );
        report.export_refused = true;
        return Ok(());
    }

    // POST_USE_IMAGE edges, grouped by source post hash
    let mut media_by_post: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        if edge.edge_type == EdgeType::PostUseImage {
            media_by_post
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }
    }

    let hash_dir = export_dir.join("hash");
    let slug_dir = export_dir.join("slug");

    let mut index = Vec::with_capacity(posts.len());
    for post in posts {
        let referenced = config.posts.include_media_data.then(|| {
            media_by_post
                .get(post.hash.as_str())
                .map(|hashes| {
                    media
                        .records
                        .iter()
                        .filter(|r| r.hash.as_deref().is_some_and(|h| hashes.contains(&h)))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        });
        let exported = ExportedPost {
            post,
            media: referenced,
        };

        let hash_path = hash_dir.join(format!("{}.json", post.hash));
        write_json_atomic(&hash_path, &exported)?;
        report.files_written.push(hash_path);

        let slug_path = slug_dir.join(format!("{}.json", post.slug));
        write_json_atomic(&slug_path, &exported)?;
        report.files_written.push(slug_path);

        index.push(ExportIndexEntry {
            slug: post.slug.clone(),
            hash: post.hash.clone(),
            title: post.title.clone(),
            colophon: post
                .frontmatter
                .get("colophon")
                .and_then(crate::frontmatter::Value::as_str)
                .map(str::to_string),
        });
    }

    for dir in [&hash_dir, &slug_dir] {
        let index_path = dir.join("index.json");
        write_json_atomic(&index_path, &index)?;
        report.files_written.push(index_path);
    }
    Ok(())
}

/// Serialize pretty JSON to a sibling temp file, then rename into place.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), EmitError> {
    write_string_atomic(path, &serde_json::to_string_pretty(value)?)
}

fn write_string_atomic(path: &Path, content: &str) -> Result<(), EmitError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "out.json".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Lexical containment check with a path-separator guard: `/a/bc` is not
/// within `/a/b`. Comparison is component-wise after normalizing `.` and
/// `..` segments, so no filesystem access is needed for paths that don't
/// exist yet.
pub fn path_is_within(candidate: &Path, ancestor: &Path) -> bool {
    let candidate = normalize(candidate);
    let ancestor = normalize(ancestor);
    candidate.starts_with(&ancestor)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Object-safe serialization shim so `emit_all` can use one closure for
/// every document type.
mod erased {
    use serde::Serialize;

    pub trait Value {
        fn to_pretty_json(&self) -> serde_json::Result<String>;
    }

    impl<T: Serialize> Value for T {
        fn to_pretty_json(&self) -> serde_json::Result<String> {
            serde_json::to_string_pretty(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents_and_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("deep/nested/out.json");
        write_json_atomic(&path, &serde_json::json!({"a": 1})).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"a\": 1"));
        // No temp file left behind
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn atomic_write_overwrites_existing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");
        write_json_atomic(&path, &serde_json::json!({"v": 1})).unwrap();
        write_json_atomic(&path, &serde_json::json!({"v": 2})).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("\"v\": 2"));
    }

    #[test]
    fn path_is_within_guards_separators() {
        assert!(path_is_within(Path::new("/a/b/c"), Path::new("/a/b")));
        assert!(path_is_within(Path::new("/a/b"), Path::new("/a/b")));
        assert!(!path_is_within(Path::new("/a/bc"), Path::new("/a/b")));
        assert!(!path_is_within(Path::new("/a"), Path::new("/a/b")));
        assert!(path_is_within(Path::new("/a/b/../b/c"), Path::new("/a/b")));
        assert!(!path_is_within(Path::new("/a/b/../c"), Path::new("/a/b")));
    }
}
