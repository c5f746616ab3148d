//! Two-phase slug allocation.
//!
//! Runs single-threaded after parsing completes, consuming files in the
//! walker's enumeration order so results are deterministic across runs.
//!
//! - **Phase A**: every file with a non-empty frontmatter `slug` reserves
//!   that slug first, in input order.
//! - **Phase B**: remaining files claim a slug derived from their filename.
//!   A file named `index` that is the sole occupant of its directory claims
//!   the directory's name instead.
//!
//! Collisions are broken deterministically per the configured strategy
//! (`number` appends `2`, `3`, …; `hash` appends the first 8 hex chars of
//! the file's content hash). An `index` file whose claim collides first
//! tries `<folder>-index`, which is what a vault with several section
//! indexes naturally wants. Every disambiguation is reported.

use crate::config::SlugStrategy;
use crate::hash;
use crate::issues::{Issue, IssueCollector};
use crate::markdown::ParsedPost;
use serde::Serialize;
use std::collections::HashMap;

/// The outcome of slug allocation for one file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugInfo {
    /// What the file asked for.
    pub desired: String,
    /// The collision-free result.
    pub disambiguated: String,
    /// Always equal to `disambiguated`.
    #[serde(rename = "final")]
    pub final_slug: String,
    pub is_disambiguated: bool,
}

/// Allocate a unique slug for every parsed post, in input order.
///
/// The returned vector is parallel to `posts`. After this, no two files
/// share a final slug.
pub fn allocate(
    posts: &[ParsedPost],
    strategy: SlugStrategy,
    issues: &IssueCollector,
) -> Vec<SlugInfo> {
    let mut table = SlugTable::default();
    let mut results: Vec<Option<SlugInfo>> = vec![None; posts.len()];

    // Phase A — frontmatter claims
    for (index, post) in posts.iter().enumerate() {
        let Some(desired) = frontmatter_slug(post) else {
            continue;
        };
        results[index] = Some(table.claim(desired, post, strategy, issues));
    }

    // Phase B — derived claims
    let dir_counts = directory_counts(posts);
    for (index, post) in posts.iter().enumerate() {
        if results[index].is_some() {
            continue;
        }
        let desired = derived_slug(post, &dir_counts);
        results[index] = Some(table.claim(desired, post, strategy, issues));
    }

    results.into_iter().flatten().collect()
}

fn frontmatter_slug(post: &ParsedPost) -> Option<String> {
    let slug = post.frontmatter.get("slug")?.as_str()?.trim();
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}

/// Markdown files per directory, for the sole-occupant rule.
fn directory_counts(posts: &[ParsedPost]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for post in posts {
        *counts.entry(post.file.folder.clone()).or_insert(0) += 1;
    }
    counts
}

fn derived_slug(post: &ParsedPost, dir_counts: &HashMap<String, usize>) -> String {
    let stem = post.file.stem();
    if stem == "index" {
        let sole = dir_counts.get(&post.file.folder).copied().unwrap_or(0) == 1;
        if sole {
            if let Some(parent) = folder_basename(&post.file.folder) {
                return slug::slugify(parent);
            }
        }
    }
    slug::slugify(stem)
}

fn folder_basename(folder: &str) -> Option<&str> {
    if folder.is_empty() {
        return None;
    }
    Some(folder.rsplit('/').next().unwrap_or(folder))
}

#[derive(Default)]
struct SlugTable {
    /// final slug → owning file path
    owners: HashMap<String, String>,
    /// desired slug → every file path that claimed it
    claimants: HashMap<String, Vec<String>>,
}

impl SlugTable {
    fn claim(
        &mut self,
        desired: String,
        post: &ParsedPost,
        strategy: SlugStrategy,
        issues: &IssueCollector,
    ) -> SlugInfo {
        let path = post.file.relative_path.clone();
        self.claimants
            .entry(desired.clone())
            .or_default()
            .push(path.clone());

        if !self.owners.contains_key(&desired) {
            self.owners.insert(desired.clone(), path);
            return SlugInfo {
                disambiguated: desired.clone(),
                final_slug: desired.clone(),
                desired,
                is_disambiguated: false,
            };
        }

        let final_slug = self.disambiguate(&desired, post, strategy);
        self.owners.insert(final_slug.clone(), path.clone());

        let conflicting: Vec<String> = self
            .claimants
            .get(&desired)
            .map(|paths| paths.iter().filter(|p| **p != path).cloned().collect())
            .unwrap_or_default();
        issues.push(Issue::SlugConflict {
            file_path: path,
            desired: desired.clone(),
            final_slug: final_slug.clone(),
            conflicting_files: conflicting,
        });

        SlugInfo {
            disambiguated: final_slug.clone(),
            final_slug,
            desired,
            is_disambiguated: true,
        }
    }

    fn disambiguate(&self, desired: &str, post: &ParsedPost, strategy: SlugStrategy) -> String {
        // Section indexes prefer their folder name over a bare counter
        if post.file.stem() == "index" {
            if let Some(parent) = folder_basename(&post.file.folder) {
                let candidate = format!("{}-index", slug::slugify(parent));
                if !self.owners.contains_key(&candidate) {
                    return candidate;
                }
            }
        }

        match strategy {
            SlugStrategy::Number => {
                let mut n = 2u64;
                loop {
                    let candidate = format!("{desired}{n}");
                    if !self.owners.contains_key(&candidate) {
                        return candidate;
                    }
                    n += 1;
                }
            }
            SlugStrategy::Hash => {
                let candidate =
                    format!("{desired}-{}", hash::short_hash(&post.content_hash));
                if !self.owners.contains_key(&candidate) {
                    return candidate;
                }
                // Identical content in two colliding files: fall through to
                // counters on top of the hashed candidate
                let mut n = 2u64;
                loop {
                    let numbered = format!("{candidate}{n}");
                    if !self.owners.contains_key(&numbered) {
                        return numbered;
                    }
                    n += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::Value;
    use crate::walker::VaultFile;
    use std::path::PathBuf;

    fn post(rel: &str, fm_slug: Option<&str>, content: &str) -> ParsedPost {
        let frontmatter = match fm_slug {
            Some(s) => Value::Map(vec![("slug".into(), Value::String(s.into()))]),
            None => Value::Map(Vec::new()),
        };
        let file_name = rel.rsplit('/').next().unwrap().to_string();
        ParsedPost {
            file: VaultFile {
                absolute_path: PathBuf::from(rel),
                relative_path: rel.into(),
                folder: rel.rsplit_once('/').map(|(d, _)| d.to_string()).unwrap_or_default(),
                file_name,
                created: None,
                modified: None,
            },
            frontmatter,
            body: String::new(),
            content_hash: hash::hash_bytes(content.as_bytes()),
            title: String::new(),
            first_paragraph: String::new(),
            plain_text: String::new(),
            word_count: 0,
            first_image: None,
            toc: Vec::new(),
        }
    }

    fn finals(posts: &[ParsedPost], strategy: SlugStrategy) -> Vec<String> {
        let issues = IssueCollector::new();
        allocate(posts, strategy, &issues)
            .into_iter()
            .map(|s| s.final_slug)
            .collect()
    }

    #[test]
    fn filename_derived_slugs() {
        let posts = vec![post("My Note.md", None, "a"), post("deep/Other.md", None, "b")];
        assert_eq!(finals(&posts, SlugStrategy::Number), vec!["my-note", "other"]);
    }

    #[test]
    fn frontmatter_slug_has_priority() {
        // b.md comes first in input order but a.md's frontmatter claim wins
        let posts = vec![post("b/shared.md", None, "b"), post("a.md", Some("shared"), "a")];
        let issues = IssueCollector::new();
        let slugs = allocate(&posts, SlugStrategy::Number, &issues);
        assert_eq!(slugs[1].final_slug, "shared");
        assert!(!slugs[1].is_disambiguated);
        assert_eq!(slugs[0].final_slug, "shared2");
        assert!(slugs[0].is_disambiguated);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn number_strategy_appends_counter() {
        let posts = vec![
            post("x/note.md", None, "1"),
            post("y/note.md", None, "2"),
            post("z/note.md", None, "3"),
        ];
        assert_eq!(
            finals(&posts, SlugStrategy::Number),
            vec!["note", "note2", "note3"]
        );
    }

    #[test]
    fn hash_strategy_appends_short_hash() {
        let posts = vec![post("x/note.md", None, "first"), post("y/note.md", None, "second")];
        let issues = IssueCollector::new();
        let slugs = allocate(&posts, SlugStrategy::Hash, &issues);
        assert_eq!(slugs[0].final_slug, "note");
        let expected = format!(
            "note-{}",
            hash::short_hash(&hash::hash_bytes(b"second"))
        );
        assert_eq!(slugs[1].final_slug, expected);
    }

    #[test]
    fn sole_index_takes_folder_slug() {
        let posts = vec![post("foo/index.md", None, "a")];
        assert_eq!(finals(&posts, SlugStrategy::Number), vec!["foo"]);
    }

    #[test]
    fn index_with_siblings_keeps_index_slug() {
        let posts = vec![post("foo/index.md", None, "a"), post("foo/other.md", None, "b")];
        assert_eq!(
            finals(&posts, SlugStrategy::Number),
            vec!["index", "other"]
        );
    }

    #[test]
    fn colliding_index_files_prefer_folder_prefix() {
        // Root index.md owns "index"; foo/index.md (with a sibling, so it
        // claims "index" too) resolves to foo-index.
        let posts = vec![
            post("index.md", None, "root"),
            post("foo/index.md", None, "a"),
            post("foo/sibling.md", None, "b"),
        ];
        assert_eq!(
            finals(&posts, SlugStrategy::Number),
            vec!["index", "foo-index", "sibling"]
        );
    }

    #[test]
    fn conflict_issue_lists_conflicting_files() {
        let posts = vec![post("a.md", Some("shared"), "1"), post("b.md", None, "2")];
        // b.md's filename slug is "b", no conflict; make it collide:
        let posts = vec![posts[0].clone(), post("shared.md", None, "2")];
        let issues = IssueCollector::new();
        let slugs = allocate(&posts, SlugStrategy::Number, &issues);
        assert_eq!(slugs[1].final_slug, "shared2");

        let snapshot = issues.snapshot();
        match &snapshot[0] {
            Issue::SlugConflict {
                file_path,
                desired,
                final_slug,
                conflicting_files,
            } => {
                assert_eq!(file_path, "shared.md");
                assert_eq!(desired, "shared");
                assert_eq!(final_slug, "shared2");
                assert_eq!(conflicting_files, &vec!["a.md".to_string()]);
            }
            other => panic!("unexpected issue: {other:?}"),
        }
    }

    #[test]
    fn empty_frontmatter_slug_falls_back_to_filename() {
        let posts = vec![post("note.md", Some("  "), "a")];
        assert_eq!(finals(&posts, SlugStrategy::Number), vec!["note"]);
    }

    #[test]
    fn every_post_gets_exactly_one_unique_slug() {
        let posts = vec![
            post("a.md", Some("x"), "1"),
            post("x.md", None, "2"),
            post("sub/x.md", None, "3"),
            post("y.md", None, "4"),
        ];
        let slugs = finals(&posts, SlugStrategy::Number);
        assert_eq!(slugs.len(), posts.len());
        let unique: std::collections::HashSet<&String> = slugs.iter().collect();
        assert_eq!(unique.len(), slugs.len());
    }
}
