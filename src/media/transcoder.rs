//! The (size × format) matrix driver.
//!
//! For every discovered media file, decide which variants to produce, where
//! they live on disk, and whether the work can be skipped, then drive the
//! backend and assemble the catalog record.
//!
//! ## Layout
//!
//! - Hashing off: the source's relative directory is mirrored under the
//!   media output folder; filenames become `<stem>[-<size>].<format>`
//!   (no suffix for `original`).
//! - Hashing on: all variants live flat at `<hash>[-<size>].<format>`,
//!   optionally sharded into `<hash[0:2]>/` subdirectories.
//!
//! ## Skip gates (three, independent)
//!
//! 1. `skip_hashes`: the content hash is listed — nothing is written, the
//!    record points at the source's own public path and carries
//!    `skippedOptimization: true`.
//! 2. `skip_existing` (without `force_reprocess`): the destination exists
//!    and is at least as new as the source — actual dimensions and size are
//!    read back, no encode happens.
//! 3. `force_reprocess`: always re-encode, overriding gate 2.
//!
//! ## Failure model
//!
//! Per-file errors (unreadable source, encoder failure) are appended to the
//! issue collector and the file is still represented in the catalog via a
//! pass-through `original` entry. The transcoder never aborts the run.

use super::backend::{Dimensions, ImageBackend};
use super::calculations::fit_inside;
use super::catalog::{MediaCatalog, MediaMeta, MediaRecord, MediaVariant, mime_for_extension};
use super::params::{EncodeFormat, Quality, TranscodeParams};
use crate::config::Config;
use crate::hash;
use crate::issues::{Issue, IssueCollector, MediaOperation};
use crate::walker::VaultFile;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions the backend can decode. Everything else (svg, video, avif
/// sources) is carried as a pass-through original — which also means the
/// SVG→AVIF combination can never be produced.
const DECODABLE: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Transcode all media candidates and build the frozen catalog.
///
/// Embarrassingly parallel across files; the caller bounds the worker pool
/// (encoders can be multi-hundred-MB resident). Record order mirrors the
/// walker's enumeration because rayon's collect preserves input order.
pub fn transcode_all(
    files: &[VaultFile],
    config: &Config,
    backend: &impl ImageBackend,
    issues: &IssueCollector,
) -> MediaCatalog {
    if config.media.skip {
        return MediaCatalog::default();
    }

    let media_dir = config.media_output_dir();
    let records: Vec<MediaRecord> = files
        .par_iter()
        .map(|file| process_file(file, config, &media_dir, backend, issues))
        .collect();

    MediaCatalog::from_records(records, config)
}

fn process_file(
    file: &VaultFile,
    config: &Config,
    media_dir: &Path,
    backend: &impl ImageBackend,
    issues: &IssueCollector,
) -> MediaRecord {
    let ext = file.extension().to_ascii_lowercase();
    let source_size = fs::metadata(&file.absolute_path).map(|m| m.len()).unwrap_or(0);

    let content_hash = match hash::hash_file(&file.absolute_path) {
        Ok(h) => Some(h),
        Err(e) => {
            warn!("unreadable media source {}: {e}", file.relative_path);
            issues.push(Issue::MediaProcessingError {
                file_path: file.relative_path.clone(),
                media_path: file.relative_path.clone(),
                operation: MediaOperation::Read,
                message: e.to_string(),
                code: e.raw_os_error().map(|c| c.to_string()),
            });
            None
        }
    };

    let layout = Layout {
        config,
        media_dir,
        file,
        ext: &ext,
        hash: content_hash.clone(),
    };

    let decodable = DECODABLE.contains(&ext.as_str());
    let dims = if decodable {
        backend.identify(&file.absolute_path).ok()
    } else {
        None
    };
    let dims = dims.unwrap_or(Dimensions {
        width: 0,
        height: 0,
    });

    let mut sizes: BTreeMap<String, Vec<MediaVariant>> = BTreeMap::new();

    let skipped_by_hash = content_hash
        .as_deref()
        .is_some_and(|h| config.media.skip_hashes.iter().any(|s| s == h));

    if content_hash.is_none() || skipped_by_hash {
        // Gate 1 (and the unreadable-source path): record only, no bytes.
        sizes.insert(
            "original".into(),
            vec![source_passthrough_variant(file, config, &ext, dims, source_size)],
        );
        return assemble(file, &ext, content_hash, &layout, dims, source_size, sizes);
    }

    if decodable && config.media.optimize {
        transcode_matrix(file, config, backend, &layout, dims, issues, &mut sizes);
    }

    if sizes.values().all(|v| v.is_empty()) {
        sizes.clear();
        // Non-decodable sources, optimize=false, or a fully failed matrix:
        // surface the source as the original variant.
        match copy_original(file, config, &layout, dims, issues) {
            Some(v) => {
                sizes.insert("original".into(), vec![v]);
            }
            None => {
                sizes.insert(
                    "original".into(),
                    vec![source_passthrough_variant(file, config, &ext, dims, source_size)],
                );
            }
        }
    }

    assemble(file, &ext, content_hash, &layout, dims, source_size, sizes)
}

/// Run the full (size × format) matrix for a decodable source.
fn transcode_matrix(
    file: &VaultFile,
    config: &Config,
    backend: &impl ImageBackend,
    layout: &Layout,
    dims: Dimensions,
    issues: &IssueCollector,
    sizes: &mut BTreeMap<String, Vec<MediaVariant>>,
) {
    for size in &config.media.sizes {
        let (width, height) = match size.width {
            Some(max_width) => fit_inside((dims.width, dims.height), max_width),
            None => (dims.width, dims.height),
        };
        let is_original = size.width.is_none();

        let mut variants = Vec::new();
        for format_spec in &config.media.formats {
            let Some(format) = EncodeFormat::from_name(&format_spec.format) else {
                warn!("unknown media format in config: {}", format_spec.format);
                continue;
            };

            let rel = layout.variant_rel_path(&size.name, is_original, format.extension());
            let dest = layout.media_dir.join(&rel);

            if let Some(parent) = dest.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    issues.push(Issue::MediaProcessingError {
                        file_path: file.relative_path.clone(),
                        media_path: file.relative_path.clone(),
                        operation: MediaOperation::Optimize,
                        message: e.to_string(),
                        code: e.raw_os_error().map(|c| c.to_string()),
                    });
                    continue;
                }
            }

            if reusable(&dest, file, config) {
                // Gate 2: read back what is actually on disk.
                let actual = backend.identify(&dest).unwrap_or(Dimensions { width, height });
                let byte_size = fs::metadata(&dest).map(|m| m.len()).unwrap_or(0);
                debug!("reusing {rel}");
                variants.push(layout.variant(&rel, actual.width, actual.height, format, byte_size));
                continue;
            }

            let params = TranscodeParams {
                source: file.absolute_path.clone(),
                output: dest.clone(),
                width,
                height,
                format,
                quality: Quality::new(format_spec.quality),
            };
            match backend.transcode(&params) {
                Ok(()) => {
                    let byte_size = fs::metadata(&dest).map(|m| m.len()).unwrap_or(0);
                    variants.push(layout.variant(&rel, width, height, format, byte_size));
                }
                Err(e) => {
                    warn!("encode failed for {rel}: {e}");
                    issues.push(Issue::MediaProcessingError {
                        file_path: file.relative_path.clone(),
                        media_path: file.relative_path.clone(),
                        operation: MediaOperation::Optimize,
                        message: e.to_string(),
                        code: None,
                    });
                }
            }
        }

        if !variants.is_empty() {
            sizes.insert(size.name.clone(), variants);
        }
    }
}

/// Copy the source unchanged to its `original` layout location.
fn copy_original(
    file: &VaultFile,
    config: &Config,
    layout: &Layout,
    dims: Dimensions,
    issues: &IssueCollector,
) -> Option<MediaVariant> {
    let rel = layout.variant_rel_path("original", true, layout.ext);
    let dest = layout.media_dir.join(&rel);

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).ok()?;
    }

    if !reusable(&dest, file, config) {
        if let Err(e) = fs::copy(&file.absolute_path, &dest) {
            warn!("copy failed for {}: {e}", file.relative_path);
            issues.push(Issue::MediaProcessingError {
                file_path: file.relative_path.clone(),
                media_path: file.relative_path.clone(),
                operation: MediaOperation::Read,
                message: e.to_string(),
                code: e.raw_os_error().map(|c| c.to_string()),
            });
            return None;
        }
    }

    let byte_size = fs::metadata(&dest).map(|m| m.len()).unwrap_or(0);
    let format = layout.ext.to_string();
    let public_path = layout.public_path(&rel);
    Some(MediaVariant {
        width: dims.width,
        height: dims.height,
        format,
        absolute_public_path: layout.absolute(&public_path),
        public_path,
        byte_size,
        skipped_optimization: false,
    })
}

/// Gate 2: reuse when the destination exists and its mtime is at least the
/// source's, unless `force_reprocess` overrides.
fn reusable(dest: &Path, file: &VaultFile, config: &Config) -> bool {
    if !config.media.skip_existing || config.media.force_reprocess {
        return false;
    }
    let Ok(meta) = fs::metadata(dest) else {
        return false;
    };
    let Ok(dest_modified) = meta.modified() else {
        return false;
    };
    match file.modified {
        Some(source_modified) => DateTime::<Utc>::from(dest_modified) >= source_modified,
        None => true,
    }
}

/// A `skip_hashes` or unreadable-source entry: nothing written, the record
/// points back at the source's own public path.
fn source_passthrough_variant(
    file: &VaultFile,
    config: &Config,
    ext: &str,
    dims: Dimensions,
    byte_size: u64,
) -> MediaVariant {
    let public_path = format!("{}/{}", config.media_prefix, file.relative_path);
    let absolute_public_path = config
        .trimmed_domain()
        .map(|domain| format!("{domain}{public_path}"));
    MediaVariant {
        width: dims.width,
        height: dims.height,
        format: ext.to_string(),
        public_path,
        absolute_public_path,
        byte_size,
        skipped_optimization: true,
    }
}

fn assemble(
    file: &VaultFile,
    ext: &str,
    content_hash: Option<String>,
    layout: &Layout,
    dims: Dimensions,
    source_size: u64,
    sizes: BTreeMap<String, Vec<MediaVariant>>,
) -> MediaRecord {
    let hash_path = layout.hash_path();
    MediaRecord {
        original_path: file.relative_path.clone(),
        file_name: file.file_name.clone(),
        extension: ext.to_string(),
        mime: mime_for_extension(ext).to_string(),
        effective_path: hash_path.clone().unwrap_or_else(|| file.relative_path.clone()),
        hash_path,
        hash: content_hash.clone(),
        sizes,
        metadata: MediaMeta {
            format: ext.to_string(),
            width: dims.width,
            height: dims.height,
            byte_size: source_size,
            hash: content_hash,
        },
    }
}

/// Resolves where variants live and what their public addresses are.
struct Layout<'a> {
    config: &'a Config,
    media_dir: &'a Path,
    file: &'a VaultFile,
    ext: &'a str,
    hash: Option<String>,
}

impl Layout<'_> {
    /// Relative path of one variant under the media output folder.
    fn variant_rel_path(&self, size_name: &str, is_original: bool, format_ext: &str) -> String {
        let suffix = if is_original {
            String::new()
        } else {
            format!("-{size_name}")
        };

        match (self.config.media.use_hash, self.hash.as_deref()) {
            (true, Some(hash)) => {
                let name = format!("{hash}{suffix}.{format_ext}");
                if self.config.media.use_hash_sharding {
                    format!("{}/{name}", &hash[..2])
                } else {
                    name
                }
            }
            _ => {
                let stem = self.file.stem();
                let name = format!("{stem}{suffix}.{format_ext}");
                if self.file.folder.is_empty() {
                    name
                } else {
                    format!("{}/{name}", self.file.folder)
                }
            }
        }
    }

    /// Content-addressed base path of the source, when hashing is on.
    fn hash_path(&self) -> Option<String> {
        if !self.config.media.use_hash {
            return None;
        }
        let hash = self.hash.as_deref()?;
        let name = format!("{hash}.{}", self.ext);
        if self.config.media.use_hash_sharding {
            Some(format!("{}/{name}", &hash[..2]))
        } else {
            Some(name)
        }
    }

    fn public_path(&self, rel: &str) -> String {
        format!("{}/{rel}", self.config.media_prefix)
    }

    fn absolute(&self, public_path: &str) -> Option<String> {
        self.config
            .trimmed_domain()
            .map(|domain| format!("{domain}{public_path}"))
    }

    fn variant(
        &self,
        rel: &str,
        width: u32,
        height: u32,
        format: EncodeFormat,
        byte_size: u64,
    ) -> MediaVariant {
        let public_path = self.public_path(rel);
        MediaVariant {
            width,
            height,
            format: format.extension().to_string(),
            absolute_public_path: self.absolute(&public_path),
            public_path,
            byte_size,
            skipped_optimization: false,
        }
    }
}

/// Absolute destination of a variant, for callers that need to check disk.
pub fn variant_abs_path(media_dir: &Path, public_path: &str, media_prefix: &str) -> PathBuf {
    let rel = public_path
        .strip_prefix(media_prefix)
        .unwrap_or(public_path)
        .trim_start_matches('/');
    media_dir.join(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SizeSpec;
    use crate::media::backend::tests::MockBackend;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn vault_file(root: &Path, rel: &str, bytes: &[u8]) -> VaultFile {
        let abs = root.join(rel);
        fs::create_dir_all(abs.parent().unwrap()).unwrap();
        fs::write(&abs, bytes).unwrap();
        let meta = fs::metadata(&abs).unwrap();
        VaultFile {
            absolute_path: abs,
            relative_path: rel.to_string(),
            folder: rel.rsplit_once('/').map(|(d, _)| d.to_string()).unwrap_or_default(),
            file_name: rel.rsplit('/').next().unwrap().to_string(),
            created: meta.created().ok().map(DateTime::<Utc>::from),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        }
    }

    fn test_config(tmp: &TempDir) -> Config {
        Config {
            input: tmp.path().join("vault"),
            output: tmp.path().join("build"),
            ..Config::default()
        }
    }

    fn backend_4000x3000() -> MockBackend {
        MockBackend::new(Dimensions {
            width: 4000,
            height: 3000,
        })
    }

    #[test]
    fn full_matrix_for_large_source() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let file = vault_file(&tmp.path().join("vault"), "img/photo.jpg", b"jpegbytes");
        let backend = backend_4000x3000();
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file], &config, &backend, &issues);

        assert_eq!(catalog.records.len(), 1);
        let record = &catalog.records[0];
        let size_names: Vec<&str> = record.sizes.keys().map(String::as_str).collect();
        assert_eq!(size_names, vec!["lg", "md", "original", "sm", "xl", "xs"]);
        for variants in record.sizes.values() {
            let formats: Vec<&str> = variants.iter().map(|v| v.format.as_str()).collect();
            assert_eq!(formats, vec!["webp", "jpeg"]);
        }
        // 6 sizes × 2 formats
        assert_eq!(backend.transcode_count(), 12);
        assert!(issues.is_empty());
    }

    #[test]
    fn fit_inside_dimensions_recorded() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let file = vault_file(&tmp.path().join("vault"), "photo.jpg", b"x");
        let backend = backend_4000x3000();
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file], &config, &backend, &issues);
        let record = &catalog.records[0];
        let md = &record.sizes["md"][0];
        assert_eq!((md.width, md.height), (1024, 768));
        let original = &record.sizes["original"][0];
        assert_eq!((original.width, original.height), (4000, 3000));
    }

    #[test]
    fn mirrored_layout_and_public_paths() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let file = vault_file(&tmp.path().join("vault"), "img/photo.jpg", b"x");
        let backend = backend_4000x3000();
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file], &config, &backend, &issues);
        let record = &catalog.records[0];
        let md_webp = &record.sizes["md"][0];
        assert_eq!(md_webp.public_path, "/media/img/photo-md.webp");
        assert!(config.media_output_dir().join("img/photo-md.webp").exists());
        // original carries no suffix
        assert_eq!(record.sizes["original"][0].public_path, "/media/img/photo.jpeg");
        assert_eq!(record.effective_path, "img/photo.jpg");
        assert!(record.hash_path.is_none());
    }

    #[test]
    fn hashed_layout_flat_and_sharded() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.media.use_hash = true;
        let root = tmp.path().join("vault");
        let file = vault_file(&root, "img/photo.jpg", b"content-x");
        let hash = crate::hash::hash_bytes(b"content-x");
        let backend = backend_4000x3000();
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file.clone()], &config, &backend, &issues);
        let record = &catalog.records[0];
        assert_eq!(record.hash_path.as_deref(), Some(format!("{hash}.jpg").as_str()));
        assert_eq!(record.effective_path, format!("{hash}.jpg"));
        assert_eq!(
            record.sizes["md"][0].public_path,
            format!("/media/{hash}-md.webp")
        );

        // Sharded: first two hex chars become a directory
        config.media.use_hash_sharding = true;
        let catalog = transcode_all(&[file], &config, &backend, &issues);
        let record = &catalog.records[0];
        let shard = &hash[..2];
        assert_eq!(
            record.sizes["md"][0].public_path,
            format!("/media/{shard}/{hash}-md.webp")
        );
        assert_eq!(record.effective_path, format!("{shard}/{hash}.jpg"));
    }

    #[test]
    fn domain_produces_absolute_public_paths() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.domain = Some("https://cdn.x/".into());
        let file = vault_file(&tmp.path().join("vault"), "photo.jpg", b"x");
        let backend = backend_4000x3000();
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file], &config, &backend, &issues);
        for variants in catalog.records[0].sizes.values() {
            for v in variants {
                let abs = v.absolute_public_path.as_deref().unwrap();
                assert!(abs.starts_with("https://cdn.x/media/"), "{abs}");
            }
        }
    }

    #[test]
    fn skip_hashes_writes_nothing_but_records() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        let root = tmp.path().join("vault");
        let file = vault_file(&root, "img/photo.jpg", b"skipme");
        config.media.skip_hashes = vec![crate::hash::hash_bytes(b"skipme")];
        let backend = backend_4000x3000();
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file], &config, &backend, &issues);
        assert_eq!(backend.transcode_count(), 0);
        assert!(!config.media_output_dir().exists() || fs::read_dir(config.media_output_dir()).unwrap().next().is_none());

        let record = &catalog.records[0];
        let original = &record.sizes["original"][0];
        assert!(original.skipped_optimization);
        assert_eq!(original.public_path, "/media/img/photo.jpg");
        // Best-variant selection must surface the pass-through
        assert_eq!(catalog.url_for("img/photo.jpg"), Some("/media/img/photo.jpg"));
    }

    #[test]
    fn skip_existing_reuses_fresh_outputs() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.media.skip_existing = true;
        let file = vault_file(&tmp.path().join("vault"), "photo.jpg", b"x");
        let backend = backend_4000x3000();
        let issues = IssueCollector::new();

        transcode_all(std::slice::from_ref(&file), &config, &backend, &issues);
        let first_run = backend.transcode_count();
        assert_eq!(first_run, 12);

        // Second run: outputs exist and are newer than the source
        let backend2 = backend_4000x3000();
        let catalog = transcode_all(&[file], &config, &backend2, &issues);
        assert_eq!(backend2.transcode_count(), 0);
        // Catalog still fully populated from readback
        assert_eq!(catalog.records[0].sizes.len(), 6);
    }

    #[test]
    fn force_reprocess_overrides_skip_existing() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.media.skip_existing = true;
        config.media.force_reprocess = true;
        let file = vault_file(&tmp.path().join("vault"), "photo.jpg", b"x");
        let issues = IssueCollector::new();

        let backend = backend_4000x3000();
        transcode_all(std::slice::from_ref(&file), &config, &backend, &issues);
        let backend2 = backend_4000x3000();
        transcode_all(&[file], &config, &backend2, &issues);
        assert_eq!(backend2.transcode_count(), 12);
    }

    #[test]
    fn svg_is_passthrough_copy() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let file = vault_file(&tmp.path().join("vault"), "art/logo.svg", b"<svg/>");
        let backend = backend_4000x3000();
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file], &config, &backend, &issues);
        assert_eq!(backend.transcode_count(), 0);
        let record = &catalog.records[0];
        assert_eq!(record.sizes.len(), 1);
        let original = &record.sizes["original"][0];
        assert_eq!(original.format, "svg");
        assert!(config.media_output_dir().join("art/logo.svg").exists());
        assert_eq!(record.mime, "image/svg+xml");
    }

    #[test]
    fn optimize_false_copies_originals_only() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.media.optimize = false;
        let file = vault_file(&tmp.path().join("vault"), "photo.jpg", b"x");
        let backend = backend_4000x3000();
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file], &config, &backend, &issues);
        assert_eq!(backend.transcode_count(), 0);
        assert_eq!(catalog.records[0].sizes.len(), 1);
        assert!(catalog.records[0].sizes.contains_key("original"));
    }

    #[test]
    fn encoder_failure_surfaces_original_and_issue() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let file = vault_file(&tmp.path().join("vault"), "bad.jpg", b"x");
        let backend = backend_4000x3000();
        backend.fail_on("bad.jpg");
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file], &config, &backend, &issues);
        let record = &catalog.records[0];
        assert!(record.sizes.contains_key("original"));
        assert!(!issues.is_empty());
        let snapshot = issues.snapshot();
        assert!(snapshot.iter().any(|i| matches!(
            i,
            Issue::MediaProcessingError {
                operation: MediaOperation::Optimize,
                ..
            }
        )));
    }

    #[test]
    fn media_skip_yields_empty_catalog() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.media.skip = true;
        let file = vault_file(&tmp.path().join("vault"), "photo.jpg", b"x");
        let backend = backend_4000x3000();
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file], &config, &backend, &issues);
        assert!(catalog.records.is_empty());
        assert!(catalog.path_map.is_empty());
    }

    #[test]
    fn small_source_collapses_large_sizes_to_source_dims() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.media.sizes = vec![
            SizeSpec {
                name: "md".into(),
                width: Some(1024),
            },
            SizeSpec {
                name: "xl".into(),
                width: Some(3840),
            },
        ];
        let file = vault_file(&tmp.path().join("vault"), "small.jpg", b"x");
        let backend = MockBackend::new(Dimensions {
            width: 500,
            height: 400,
        });
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file], &config, &backend, &issues);
        let record = &catalog.records[0];
        assert_eq!(record.sizes["md"][0].width, 500);
        assert_eq!(record.sizes["xl"][0].width, 500);
    }

    #[test]
    fn path_hash_map_always_populated() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let file = vault_file(&tmp.path().join("vault"), "photo.jpg", b"hashed");
        let backend = backend_4000x3000();
        let issues = IssueCollector::new();

        let catalog = transcode_all(&[file], &config, &backend, &issues);
        assert_eq!(
            catalog.path_hash_map["photo.jpg"],
            crate::hash::hash_bytes(b"hashed")
        );
    }

    #[test]
    fn variant_abs_path_strips_prefix() {
        assert_eq!(
            variant_abs_path(Path::new("/out/media"), "/media/img/x-md.webp", "/media"),
            PathBuf::from("/out/media/img/x-md.webp")
        );
    }
}
