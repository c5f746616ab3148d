//! Reference resolution and final post assembly.
//!
//! Built after slug allocation completes globally — the central design
//! constraint of the pipeline. The index maps every way a reference can
//! name a post (slug, filename, original path, alias) onto final slugs;
//! the renderer and the frontmatter embed expansion both resolve against
//! it and the frozen media catalog.
//!
//! Resolution order per reference, first match wins:
//!
//! 1. explicit slug
//! 2. exact filename (with or without `.md`)
//! 3. exact original relative path
//! 4. case-insensitive alias — several candidates resolve to the
//!    lexicographically smallest final slug, with a diagnostic
//! 5. otherwise the `#broken-link-<target>` placeholder

use crate::config::Config;
use crate::frontmatter::Value;
use crate::hash;
use crate::issues::{Issue, IssueCollector, ReferenceOrigin};
use crate::markdown::{ParsedPost, TocEntry, WIKI_EMBED_RE};
use crate::media::MediaCatalog;
use crate::render::Renderer;
use crate::slugs::SlugInfo;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use regex::Captures;
use serde::Serialize;
use std::collections::HashMap;

/// A fully assembled post record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub file_name: String,
    pub slug: String,
    pub title: String,
    /// `<notes_prefix>/<slug>`.
    pub url: String,
    /// Stable digest over the canonical identity fields.
    pub hash: String,
    pub original_file_path: String,
    pub folder: String,
    pub frontmatter: Value,
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub first_paragraph_text: String,
    pub plain_text: String,
    pub word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    /// Hashes of posts this one links to. Populated by the graph phase.
    pub links: Vec<String>,
}

/// Outcome of resolving one reference target.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Found(String),
    Ambiguous {
        slug: String,
        candidates: Vec<String>,
    },
    NotFound,
}

/// Lookup tables from every reference form to final slugs.
#[derive(Debug, Default)]
pub struct PostIndex {
    by_slug: HashMap<String, usize>,
    /// Keys: stem and full filename. First claimant (walker order) wins.
    by_filename: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
    /// Lowercased alias → candidate post indices.
    by_alias: HashMap<String, Vec<usize>>,
    final_slugs: Vec<String>,
}

impl PostIndex {
    pub fn build(posts: &[ParsedPost], slugs: &[SlugInfo]) -> Self {
        let mut index = Self {
            final_slugs: slugs.iter().map(|s| s.final_slug.clone()).collect(),
            ..Self::default()
        };

        for (i, post) in posts.iter().enumerate() {
            index.by_slug.insert(index.final_slugs[i].clone(), i);
            index
                .by_filename
                .entry(post.file.stem().to_string())
                .or_insert(i);
            index
                .by_filename
                .entry(post.file.file_name.clone())
                .or_insert(i);
            index.by_path.insert(post.file.relative_path.clone(), i);

            for alias in aliases(&post.frontmatter) {
                index
                    .by_alias
                    .entry(alias.to_lowercase())
                    .or_default()
                    .push(i);
            }
        }
        index
    }

    /// Resolve a reference target (fragment/query already stripped).
    pub fn resolve(&self, target: &str) -> ResolveOutcome {
        let target = target.trim();
        if target.is_empty() {
            return ResolveOutcome::NotFound;
        }

        // Slugs are lowercase by construction, so `[[B]]` finds slug `b`
        if let Some(&i) = self
            .by_slug
            .get(target)
            .or_else(|| self.by_slug.get(&target.to_lowercase()))
        {
            return ResolveOutcome::Found(self.final_slugs[i].clone());
        }
        let without_ext = target.strip_suffix(".md").unwrap_or(target);
        if let Some(&i) = self
            .by_filename
            .get(target)
            .or_else(|| self.by_filename.get(without_ext))
        {
            return ResolveOutcome::Found(self.final_slugs[i].clone());
        }
        if let Some(&i) = self
            .by_path
            .get(target)
            .or_else(|| self.by_path.get(&format!("{target}.md")))
        {
            return ResolveOutcome::Found(self.final_slugs[i].clone());
        }
        if let Some(candidates) = self.by_alias.get(&target.to_lowercase()) {
            let mut candidate_slugs: Vec<String> = candidates
                .iter()
                .map(|&i| self.final_slugs[i].clone())
                .collect();
            candidate_slugs.sort();
            candidate_slugs.dedup();
            let slug = candidate_slugs[0].clone();
            if candidate_slugs.len() == 1 {
                return ResolveOutcome::Found(slug);
            }
            return ResolveOutcome::Ambiguous {
                slug,
                candidates: candidate_slugs,
            };
        }
        ResolveOutcome::NotFound
    }
}

/// `aliases` (string or sequence) and `alias` frontmatter keys.
fn aliases(frontmatter: &Value) -> Vec<String> {
    let mut out = Vec::new();
    for key in ["aliases", "alias"] {
        match frontmatter.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => out.push(s.trim().to_string()),
            Some(Value::Seq(items)) => {
                out.extend(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                );
            }
            _ => {}
        }
    }
    out
}

/// Render every parsed post and assemble the final records, in input order.
pub fn build_posts(
    posts: &[ParsedPost],
    slugs: &[SlugInfo],
    media: &MediaCatalog,
    config: &Config,
    issues: &IssueCollector,
) -> Vec<Post> {
    let index = PostIndex::build(posts, slugs);

    posts
        .par_iter()
        .zip(slugs.par_iter())
        .map(|(parsed, slug_info)| {
            let renderer = Renderer {
                config,
                media,
                index: &index,
                issues,
            };
            let html = renderer.render(parsed);

            let mut frontmatter = parsed.frontmatter.clone();
            expand_frontmatter_embeds(&mut frontmatter, parsed, media, config, issues);

            let slug = slug_info.final_slug.clone();
            let url = format!("{}/{slug}", config.notes_prefix);
            let post_hash = canonical_post_hash(parsed, &slug, &frontmatter, &html, &url);

            Post {
                file_name: parsed.file.file_name.clone(),
                slug,
                title: parsed.title.clone(),
                url,
                hash: post_hash,
                original_file_path: parsed.file.relative_path.clone(),
                folder: parsed.file.folder.clone(),
                frontmatter,
                html,
                toc: parsed.toc.clone(),
                first_paragraph_text: parsed.first_paragraph.clone(),
                plain_text: parsed.plain_text.clone(),
                word_count: parsed.word_count,
                first_image: parsed.first_image.clone(),
                created: parsed.file.created,
                modified: parsed.file.modified,
                links: Vec::new(),
            }
        })
        .collect()
}

/// Digest over the canonical identity fields, in fixed key order.
fn canonical_post_hash(
    parsed: &ParsedPost,
    slug: &str,
    frontmatter: &Value,
    html: &str,
    url: &str,
) -> String {
    let mut canonical = serde_json::Map::new();
    canonical.insert(
        "fileName".into(),
        serde_json::Value::String(parsed.file.file_name.clone()),
    );
    canonical.insert("slug".into(), serde_json::Value::String(slug.to_string()));
    canonical.insert(
        "title".into(),
        serde_json::Value::String(parsed.title.clone()),
    );
    canonical.insert(
        "frontmatter".into(),
        serde_json::to_value(frontmatter).unwrap_or(serde_json::Value::Null),
    );
    canonical.insert(
        "originalFilePath".into(),
        serde_json::Value::String(parsed.file.relative_path.clone()),
    );
    canonical.insert("html".into(), serde_json::Value::String(html.to_string()));
    canonical.insert("url".into(), serde_json::Value::String(url.to_string()));
    hash::hash_canonical(&canonical)
}

/// Expand `![[target]]` expressions in every frontmatter string field.
///
/// Resolution is strict — no filename fallback. Top-level fields whose
/// entire value is a single embed additionally emit `<field>-<size>`
/// auxiliary entries for every size variant.
fn expand_frontmatter_embeds(
    frontmatter: &mut Value,
    parsed: &ParsedPost,
    media: &MediaCatalog,
    config: &Config,
    issues: &IssueCollector,
) {
    // Aux entries first, while the original embed expressions are intact.
    let mut aux: Vec<(usize, String, String)> = Vec::new();
    if let Some(entries) = frontmatter.entries_mut() {
        for (position, (key, value)) in entries.iter().enumerate() {
            let Some(text) = value.as_str() else { continue };
            let Some(caps) = WIKI_EMBED_RE.captures(text.trim()) else {
                continue;
            };
            if caps.get(0).unwrap().as_str() != text.trim() {
                continue;
            }
            let target = caps[1].trim();
            let Some(record) = media.resolve(target, &parsed.file.folder, false) else {
                continue;
            };
            for (size_name, variants) in &record.sizes {
                let Some(variant) = variants.first() else {
                    continue;
                };
                let url = if config.use_absolute_paths {
                    variant
                        .absolute_public_path
                        .clone()
                        .unwrap_or_else(|| variant.public_path.clone())
                } else {
                    variant.public_path.clone()
                };
                aux.push((position, format!("{key}-{size_name}"), url));
            }
        }
        // Insert after their source field, keeping relative order
        for (position, key, url) in aux.into_iter().rev() {
            entries.insert(position + 1, (key, Value::String(url)));
        }
    }

    frontmatter.for_each_string_mut(&mut |text: &mut String| {
        if !text.contains("![[") {
            return;
        }
        let replaced = WIKI_EMBED_RE.replace_all(text, |caps: &Captures| {
            let target = caps[1].trim();
            match media
                .resolve(target, &parsed.file.folder, false)
                .and_then(|record| record.best_url(config))
            {
                Some(url) => url,
                None => {
                    issues.push(Issue::MissingMedia {
                        file_path: parsed.file.relative_path.clone(),
                        media_path: target.to_string(),
                        referenced_from: ReferenceOrigin::Frontmatter,
                        original_reference: caps[0].to_string(),
                        module: "frontmatter".to_string(),
                    });
                    format!("#broken-link-{target}")
                }
            }
        });
        *text = replaced.into_owned();
    });
}
