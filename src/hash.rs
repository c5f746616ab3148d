//! Content hashing.
//!
//! Two hash families drive the processor:
//!
//! - **File hashes**: SHA-256 over raw bytes. Content-based rather than
//!   mtime-based so they survive `git checkout` (which resets modification
//!   times). Media layout under `use_hash`, the `skip_hashes` gate, and the
//!   `hash` slug-disambiguation strategy all key off these.
//! - **Post hashes**: SHA-256 over a canonical JSON serialization of the
//!   post's identity fields (filename, slug, title, frontmatter, original
//!   path, rendered HTML, url). Frontmatter maps serialize in insertion
//!   order, so the digest is deterministic given identical inputs and
//!   catalog context.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// SHA-256 hash of a byte slice, as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 hash of a file's contents, as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

/// Canonical digest over any serializable record.
///
/// Serialization goes through `serde_json`, which (with `preserve_order`)
/// keeps map keys in insertion order — the canonical form is the compact
/// JSON string.
pub fn hash_canonical<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_string(value).unwrap_or_default();
    hash_bytes(json.as_bytes())
}

/// First 8 hex chars of a digest, used by the `hash` slug strategy.
pub fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}
