//! Derived content graph.
//!
//! Scans each post's rendered HTML for internal anchors and `<img>` tags
//! and keys the resulting edges by content hash. The graph is a value type
//! emitted once at the end of the run — it owns nothing.
//!
//! - Anchor URLs whose path (after stripping the notes prefix, fragments
//!   and queries) matches a post slug become `POST_LINKS_TO_POST` edges.
//! - `<img src>` URLs matching any media variant's public path (with or
//!   without domain), or containing a media filename, become
//!   `POST_USE_IMAGE` edges.
//! - External URLs, `data:`, anchor-only, `mailto:` and `tel:` links are
//!   skipped. Edges are deduplicated per source post.

use crate::config::Config;
use crate::media::MediaCatalog;
use crate::render::split_link_suffix;
use crate::resolver::Post;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a\s[^>]*?href="([^"]+)""#).unwrap());
static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img\s[^>]*?src="([^"]+)""#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeType {
    #[serde(rename = "POST_LINKS_TO_POST")]
    PostLinksToPost,
    #[serde(rename = "POST_USE_IMAGE")]
    PostUseImage,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    /// Content hash of the post or media.
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Filename of the underlying vault file.
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Build the graph and populate each post's `links` array.
pub fn build_graph(posts: &mut [Post], media: &MediaCatalog, config: &Config) -> Graph {
    let slug_to_hash: HashMap<&str, &str> = posts
        .iter()
        .map(|p| (p.slug.as_str(), p.hash.as_str()))
        .collect();

    // Any public or absolute variant path identifies its record
    let mut variant_paths: HashMap<&str, usize> = HashMap::new();
    for (i, record) in media.records.iter().enumerate() {
        for variants in record.sizes.values() {
            for variant in variants {
                variant_paths.insert(variant.public_path.as_str(), i);
                if let Some(absolute) = &variant.absolute_public_path {
                    variant_paths.insert(absolute.as_str(), i);
                }
            }
        }
    }

    let domain = config.trimmed_domain();
    let mut edges = Vec::new();
    let mut referenced_media: Vec<usize> = Vec::new();
    let mut seen_media: HashSet<usize> = HashSet::new();
    let mut post_links: Vec<Vec<String>> = vec![Vec::new(); posts.len()];

    for (post_idx, post) in posts.iter().enumerate() {
        let mut seen_edges: HashSet<(EdgeType, String)> = HashSet::new();

        for caps in HREF_RE.captures_iter(&post.html) {
            let href = decode_url(&caps[1]);
            let Some(slug) = internal_slug(&href, config, domain) else {
                continue;
            };
            let Some(&target_hash) = slug_to_hash.get(slug.as_str()) else {
                continue;
            };
            if target_hash == post.hash {
                // Self-links carry no graph information
                continue;
            }
            if seen_edges.insert((EdgeType::PostLinksToPost, target_hash.to_string())) {
                edges.push(GraphEdge {
                    source: post.hash.clone(),
                    target: target_hash.to_string(),
                    edge_type: EdgeType::PostLinksToPost,
                });
                post_links[post_idx].push(target_hash.to_string());
            }
        }

        for caps in IMG_SRC_RE.captures_iter(&post.html) {
            let src = decode_url(&caps[1]);
            if src.starts_with("data:") {
                continue;
            }
            let record_idx = variant_paths.get(src.as_str()).copied().or_else(|| {
                media
                    .records
                    .iter()
                    .position(|r| !r.file_name.is_empty() && src.contains(&r.file_name))
            });
            let Some(record_idx) = record_idx else {
                continue;
            };
            let Some(media_hash) = media.records[record_idx].hash.clone() else {
                continue;
            };
            if seen_edges.insert((EdgeType::PostUseImage, media_hash.clone())) {
                edges.push(GraphEdge {
                    source: post.hash.clone(),
                    target: media_hash,
                    edge_type: EdgeType::PostUseImage,
                });
                if seen_media.insert(record_idx) {
                    referenced_media.push(record_idx);
                }
            }
        }
    }

    for (post, links) in posts.iter_mut().zip(post_links) {
        post.links = links;
    }

    let mut nodes: Vec<GraphNode> = posts
        .iter()
        .map(|post| GraphNode {
            id: post.hash.clone(),
            node_type: "post".into(),
            label: post.file_name.clone(),
        })
        .collect();
    nodes.extend(referenced_media.into_iter().filter_map(|i| {
        let record = &media.records[i];
        record.hash.clone().map(|hash| GraphNode {
            id: hash,
            node_type: "media".into(),
            label: record.file_name.clone(),
        })
    }));

    Graph { nodes, edges }
}

fn decode_url(raw: &str) -> String {
    let unescaped = html_escape::decode_html_entities(raw);
    percent_encoding::percent_decode_str(&unescaped)
        .decode_utf8_lossy()
        .to_string()
}

/// Extract the slug from an internal post URL, or `None` for anything the
/// graph skips.
fn internal_slug(href: &str, config: &Config, domain: Option<&str>) -> Option<String> {
    let mut href = href;
    if let Some(domain) = domain {
        if let Some(stripped) = href.strip_prefix(domain) {
            href = stripped;
        }
    }
    if href.starts_with("http://")
        || href.starts_with("https://")
        || href.starts_with("data:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
        || href.is_empty()
    {
        return None;
    }

    let (path, _suffix) = split_link_suffix(href);
    let slug = path.strip_prefix(&config.notes_prefix)?.trim_matches('/');
    if slug.is_empty() {
        return None;
    }
    Some(slug.to_string())
}
