//! The media catalog: records, best-variant selection, and the derived
//! path/url/hash indices.
//!
//! The catalog is built entirely by the transcoder, then becomes frozen
//! input to the link resolver and graph builder. Downstream consumers go
//! through the `pathMap` indirection and treat `effectivePath` as opaque.

use crate::config::Config;
use serde::Serialize;
use std::collections::BTreeMap;

/// MIME type for a media file extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// One encoded output at a specific (size, format).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaVariant {
    pub width: u32,
    pub height: u32,
    pub format: String,
    /// Prefix-relative URL, e.g. `/media/img/photo-md.webp`.
    pub public_path: String,
    /// Present iff a domain is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_public_path: Option<String>,
    pub byte_size: u64,
    /// True for `skip_hashes` pass-throughs: recorded, never written.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped_optimization: bool,
}

/// Source-file metadata carried on every record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMeta {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// One source media file and all its variants.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Path relative to the vault root.
    pub original_path: String,
    pub file_name: String,
    pub extension: String,
    pub mime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// The address the asset is served under — content-addressed when
    /// hashing is on, path-mirrored otherwise.
    pub effective_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_path: Option<String>,
    /// size name → variants. BTreeMap keeps the key order deterministic.
    pub sizes: BTreeMap<String, Vec<MediaVariant>>,
    pub metadata: MediaMeta,
}

/// Size preference for best-variant selection.
const SIZE_ORDER: &[&str] = &["md", "sm", "lg", "xl", "xs", "original"];

/// Format preference for best-variant selection.
const FORMAT_ORDER: &[&str] = &["webp", "avif", "jpeg", "jpg"];

impl MediaRecord {
    /// Pick the variant a reference to this media should resolve to.
    ///
    /// Size preference is `md, sm, lg, xl, xs, original`; within a size,
    /// `webp` beats `avif` beats `jpeg` beats the source's own format. A
    /// `skipped_optimization` variant wins outright: the pass-through is
    /// the only address that exists.
    pub fn best_variant(&self) -> Option<&MediaVariant> {
        if let Some(skipped) = self
            .sizes
            .values()
            .flatten()
            .find(|v| v.skipped_optimization)
        {
            return Some(skipped);
        }

        for size in SIZE_ORDER {
            let Some(variants) = self.sizes.get(*size) else {
                continue;
            };
            if variants.is_empty() {
                continue;
            }
            for format in FORMAT_ORDER.iter().chain([&self.metadata.format.as_str()]) {
                if let Some(v) = variants.iter().find(|v| v.format == *format) {
                    return Some(v);
                }
            }
            return variants.first();
        }
        None
    }

    /// Best variant within one named size, by the same format preference.
    /// Callers that want the configured `preferred_size` (e.g. the first
    /// image of a post) go through this and fall back to
    /// [`best_variant`](Self::best_variant).
    pub fn variant_for_size(&self, size: &str) -> Option<&MediaVariant> {
        let variants = self.sizes.get(size)?;
        for format in FORMAT_ORDER.iter().chain([&self.metadata.format.as_str()]) {
            if let Some(v) = variants.iter().find(|v| v.format == *format) {
                return Some(v);
            }
        }
        variants.first()
    }

    /// Best-variant URL, honoring `use_absolute_paths`.
    pub fn best_url(&self, config: &Config) -> Option<String> {
        let variant = self.best_variant()?;
        if config.use_absolute_paths {
            if let Some(absolute) = &variant.absolute_public_path {
                return Some(absolute.clone());
            }
        }
        Some(variant.public_path.clone())
    }
}

/// The frozen output of the transcoding phase.
#[derive(Debug, Default)]
pub struct MediaCatalog {
    pub records: Vec<MediaRecord>,
    /// original path (and, when hashing, hashPath) → best-variant URL.
    pub path_map: BTreeMap<String, String>,
    /// original path → best-variant URL.
    pub path_url_map: BTreeMap<String, String>,
    /// original path → content hash.
    pub path_hash_map: BTreeMap<String, String>,
}

impl MediaCatalog {
    pub fn from_records(records: Vec<MediaRecord>, config: &Config) -> Self {
        let mut path_map = BTreeMap::new();
        let mut path_url_map = BTreeMap::new();
        let mut path_hash_map = BTreeMap::new();

        for record in &records {
            let Some(url) = record.best_url(config) else {
                continue;
            };
            path_map.insert(record.original_path.clone(), url.clone());
            if let Some(hash_path) = &record.hash_path {
                path_map.insert(hash_path.clone(), url.clone());
            }
            path_url_map.insert(record.original_path.clone(), url);
            if let Some(hash) = &record.hash {
                path_hash_map.insert(record.original_path.clone(), hash.clone());
            }
        }

        Self {
            records,
            path_map,
            path_url_map,
            path_hash_map,
        }
    }

    /// Inverted join of `path_hash_map` and `path_url_map`: hash → URL.
    pub fn hash_url_map(&self) -> BTreeMap<String, String> {
        self.path_hash_map
            .iter()
            .filter_map(|(path, hash)| {
                self.path_url_map
                    .get(path)
                    .map(|url| (hash.clone(), url.clone()))
            })
            .collect()
    }

    /// Strict lookup by original path or hash path.
    pub fn url_for(&self, path: &str) -> Option<&str> {
        self.path_map.get(path).map(String::as_str)
    }

    pub fn record_for_path(&self, path: &str) -> Option<&MediaRecord> {
        self.records.iter().find(|r| r.original_path == path)
    }

    /// Last-resort body resolution: match by bare filename.
    pub fn record_by_file_name(&self, name: &str) -> Option<&MediaRecord> {
        self.records.iter().find(|r| r.file_name == name)
    }

    /// Resolve a reference target to a media record.
    ///
    /// Candidate paths are consulted in strict order: the target as written,
    /// then the target relative to the referencing file's folder. Filename
    /// equality is a last resort for body references only — frontmatter
    /// resolution stays strict.
    pub fn resolve(
        &self,
        target: &str,
        base_folder: &str,
        allow_filename_fallback: bool,
    ) -> Option<&MediaRecord> {
        let cleaned = target
            .split(['|', '#'])
            .next()
            .unwrap_or(target)
            .trim()
            .trim_start_matches("./");

        let mut candidates = vec![cleaned.to_string()];
        if !base_folder.is_empty() {
            candidates.push(join_relative(base_folder, cleaned));
        }

        for candidate in &candidates {
            if let Some(record) = self
                .records
                .iter()
                .find(|r| r.original_path == *candidate || r.hash_path.as_deref() == Some(candidate))
            {
                return Some(record);
            }
        }

        if allow_filename_fallback {
            let name = cleaned.rsplit('/').next().unwrap_or(cleaned);
            return self.record_by_file_name(name);
        }
        None
    }
}

/// Join a reference target onto its base folder, resolving `..` segments
/// lexically.
fn join_relative(base_folder: &str, target: &str) -> String {
    let mut segments: Vec<&str> = base_folder.split('/').collect();
    for part in target.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
