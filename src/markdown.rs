//! Markdown parsing and metric extraction.
//!
//! Third pipeline phase. Each included file is parsed into a
//! `pulldown-cmark` event stream and mined for derived metrics: title,
//! first paragraph, plaintext, word count, table of contents, and the first
//! image whose target resolves through the media catalog.
//!
//! Parsing only *extracts*. Wiki-links and media embeds survive as literal
//! tokens — resolution is deferred to the render phase, which needs the
//! completed slug catalog. Resolving links here would be wrong: the full
//! slug table doesn't exist until every file has been parsed.

use crate::frontmatter::{self, Value};
use crate::hash;
use crate::media::MediaCatalog;
use crate::walker::VaultFile;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::sync::LazyLock;
use tracing::warn;

/// Obsidian media embeds: `![[target]]` / `![[target|alt]]`.
pub static WIKI_EMBED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\[([^\[\]|]+)(?:\|([^\[\]]+))?\]\]").unwrap());

/// One table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TocEntry {
    /// Hierarchical number, e.g. `1.2`.
    pub number: String,
    pub text: String,
    pub level: u32,
    /// Slugged anchor id, deduplicated within the document.
    pub id: String,
}

/// A parsed post, before slug assignment and rendering.
#[derive(Debug, Clone)]
pub struct ParsedPost {
    pub file: VaultFile,
    pub frontmatter: Value,
    /// Markdown body with the frontmatter block stripped.
    pub body: String,
    /// SHA-256 of the raw file content (drives the `hash` slug strategy).
    pub content_hash: String,
    pub title: String,
    pub first_paragraph: String,
    pub plain_text: String,
    pub word_count: usize,
    /// Best-variant URL of the first resolvable image reference.
    pub first_image: Option<String>,
    pub toc: Vec<TocEntry>,
}

pub fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_MATH);
    options
}

/// Parse one included file. Returns `None` when the file is unreadable.
///
/// `preferred_size` picks the size used for the first-image URL; selection
/// falls back to the regular best variant when that size is absent.
pub fn parse_post(
    file: &VaultFile,
    media: &MediaCatalog,
    preferred_size: &str,
) -> Option<ParsedPost> {
    let content = match fs::read_to_string(&file.absolute_path) {
        Ok(content) => content,
        Err(e) => {
            warn!("skipping unreadable file {}: {e}", file.relative_path);
            return None;
        }
    };
    let content_hash = hash::hash_bytes(content.as_bytes());

    let (frontmatter_str, body) = frontmatter::extract(&content);
    let fm = match frontmatter::parse(frontmatter_str) {
        Ok(fm) => fm,
        Err(e) => {
            warn!("invalid frontmatter in {}: {e}", file.relative_path);
            Value::Map(Vec::new())
        }
    };

    let title = fm
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| humanize(file.stem()));

    let metrics = extract_metrics(body);
    let toc = extract_toc(body);
    let first_image = first_image_url(body, &file.folder, media, preferred_size);

    Some(ParsedPost {
        file: file.clone(),
        frontmatter: fm,
        body: body.to_string(),
        content_hash,
        title,
        first_paragraph: metrics.first_paragraph,
        word_count: metrics.plain_text.split_whitespace().count(),
        plain_text: metrics.plain_text,
        first_image,
        toc,
    })
}

/// Humanize a filename stem into a display title: dashes and underscores
/// become spaces.
pub fn humanize(stem: &str) -> String {
    stem.replace(['-', '_'], " ").trim().to_string()
}

struct TextMetrics {
    plain_text: String,
    first_paragraph: String,
}

/// Walk the event stream collecting plaintext and the first paragraph.
fn extract_metrics(body: &str) -> TextMetrics {
    let parser = Parser::new_ext(body, parser_options());

    let mut plain = String::new();
    let mut first_paragraph = String::new();
    let mut paragraph_depth = 0usize;
    let mut first_paragraph_done = false;
    let mut current_paragraph = String::new();

    for event in parser {
        match event {
            Event::Start(Tag::Paragraph) => paragraph_depth += 1,
            Event::End(TagEnd::Paragraph) => {
                paragraph_depth = paragraph_depth.saturating_sub(1);
                if !first_paragraph_done && !current_paragraph.trim().is_empty() {
                    first_paragraph = current_paragraph.trim().to_string();
                    first_paragraph_done = true;
                }
                push_separator(&mut plain, '\n');
            }
            Event::Text(text) | Event::Code(text) => {
                plain.push_str(&text);
                if paragraph_depth > 0 && !first_paragraph_done {
                    current_paragraph.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                push_separator(&mut plain, ' ');
                if paragraph_depth > 0 && !first_paragraph_done {
                    push_separator(&mut current_paragraph, ' ');
                }
            }
            Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::Item) => {
                push_separator(&mut plain, '\n');
            }
            _ => {}
        }
    }

    // Wiki syntax reads better as its inner text in plaintext contexts
    let plain_text = strip_wiki_tokens(plain.trim());
    let first_paragraph = strip_wiki_tokens(&first_paragraph);

    TextMetrics {
        plain_text,
        first_paragraph,
    }
}

fn push_separator(buffer: &mut String, sep: char) {
    if !buffer.is_empty() && !buffer.ends_with(sep) {
        buffer.push(sep);
    }
}

static WIKI_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[\[([^\[\]|#]+)(?:#[^\[\]|]*)?(?:\|([^\[\]]+))?\]\]").unwrap());

/// Replace `[[Target|Alias]]` tokens with their display text.
pub fn strip_wiki_tokens(text: &str) -> String {
    WIKI_TOKEN_RE
        .replace_all(text, |caps: &regex::Captures| {
            caps.get(2)
                .or_else(|| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        })
        .to_string()
}

/// Extract headings into a hierarchically numbered, slug-deduplicated ToC.
pub fn extract_toc(body: &str) -> Vec<TocEntry> {
    let parser = Parser::new_ext(body, parser_options());

    let mut toc = Vec::new();
    let mut buffer = String::new();
    let mut current_level: Option<HeadingLevel> = None;
    let mut counters = [0usize; 6];
    let mut seen_ids: HashMap<String, usize> = HashMap::new();

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current_level = Some(level);
                buffer.clear();
            }
            Event::End(TagEnd::Heading(_)) => {
                let Some(level) = current_level.take() else {
                    continue;
                };
                let level_index = level as usize - 1;
                counters[level_index] += 1;
                for counter in counters.iter_mut().skip(level_index + 1) {
                    *counter = 0;
                }
                let number = counters[..=level_index]
                    .iter()
                    .filter(|&&c| c > 0)
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(".");

                let text = strip_wiki_tokens(buffer.trim());
                let id = unique_heading_id(&text, &mut seen_ids);

                toc.push(TocEntry {
                    number,
                    text,
                    level: level as u32,
                    id,
                });
            }
            Event::Text(text) | Event::Code(text) if current_level.is_some() => {
                buffer.push_str(&text);
            }
            _ => {}
        }
    }
    toc
}

/// Slug a heading, appending `-2`, `-3`, … on repeats.
fn unique_heading_id(text: &str, seen: &mut HashMap<String, usize>) -> String {
    let base = slug::slugify(text);
    let base = if base.is_empty() {
        "section".to_string()
    } else {
        base
    };
    let count = seen.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{base}-{count}")
    }
}

/// Earliest image reference — markdown (`![alt](target)`) or obsidian
/// (`![[target]]`) — whose target resolves through the media catalog.
fn first_image_url(
    body: &str,
    folder: &str,
    media: &MediaCatalog,
    preferred_size: &str,
) -> Option<String> {
    // (byte offset, target)
    let mut candidates: Vec<(usize, String)> = Vec::new();

    let parser = Parser::new_ext(body, parser_options());
    for (event, range) in parser.into_offset_iter() {
        if let Event::Start(Tag::Image { dest_url, .. }) = event {
            candidates.push((range.start, dest_url.to_string()));
        }
    }
    for caps in WIKI_EMBED_RE.captures_iter(body) {
        let m = caps.get(0).unwrap();
        candidates.push((m.start(), caps[1].trim().to_string()));
    }

    candidates.sort_by_key(|(offset, _)| *offset);
    candidates.into_iter().find_map(|(_, target)| {
        let record = media.resolve(&target, folder, true)?;
        record
            .variant_for_size(preferred_size)
            .or_else(|| record.best_variant())
            .map(|v| v.public_path.clone())
    })
}
