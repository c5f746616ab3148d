//! HTML rendering.
//!
//! Runs strictly after slug allocation, because wiki-links, markdown links
//! and aliases can only resolve against the complete catalogs. The renderer
//! is a `pulldown-cmark` event-stream transform; stages apply in this
//! order:
//!
//! 1. bare image URLs become `<img>` (images-without-links)
//! 2. iframe embeds (video/midi/3D URL recognition, feature-gated)
//! 3. GFM constructs (tables, strikethrough, tasklists — parser options)
//! 4. wiki-link resolution
//! 5. markdown-link resolution
//! 6. media embeds (markdown and obsidian forms)
//! 7. YouTube expansion
//! 8. callouts (`> [!note]` blockquotes)
//! 9. math → class-annotated nodes
//! 10. external-link rewriting (`target="_blank" rel="noopener"`)
//! 11. heading slugging + wrapping autolink anchors
//! 12. mermaid code fences (configured strategy, `mmdc` shell-out)
//! 13. syntax highlighting (syntect, curated language set)
//! 14. HTML serialization (dangerous HTML permitted)
//!
//! `pulldown-cmark` may fragment `[[wikilink]]` across several `Text`
//! events, so consecutive text is coalesced into a buffer and the inline
//! stages run on each flush — the same strategy the parser phase uses for
//! extraction.

use crate::config::{Config, MermaidStrategy};
use crate::hash;
use crate::issues::{Issue, IssueCollector, LinkKind, ReferenceOrigin};
use crate::markdown::{ParsedPost, WIKI_EMBED_RE, parser_options};
use crate::media::MediaCatalog;
use crate::resolver::{PostIndex, ResolveOutcome};
use html_escape::{encode_double_quoted_attribute, encode_text};
use pulldown_cmark::{CowStr, Event, Parser, Tag, TagEnd, html};
use regex::{Captures, Regex};
use std::fs;
use std::process::Command;
use std::sync::LazyLock;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::{debug, warn};

/// Wiki links: `[[target]]`, `[[target#frag]]`, `[[target|alias]]`.
static WIKI_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\[\]|#]+)(?:#([^\[\]|]+))?(?:\|([^\[\]]+))?\]\]").unwrap()
});

/// Bare URLs in running text.
static BARE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"\)]+"#).unwrap());

/// YouTube watch / short URLs.
static YOUTUBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?(?:youtube\.com/watch\?v=|youtu\.be/)([A-Za-z0-9_-]{6,})")
        .unwrap()
});

/// Obsidian callout marker at the head of a blockquote.
static CALLOUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[!([A-Za-z0-9-]+)\]\s*(.*)$").unwrap());

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Languages worth shipping highlighting classes for. Fences in other
/// languages fall back to a plain escaped block.
const HIGHLIGHT_LANGUAGES: &[&str] = &[
    "rust", "js", "javascript", "jsx", "ts", "typescript", "tsx", "python", "py", "go", "c",
    "cpp", "c++", "java", "kotlin", "swift", "ruby", "php", "json", "yaml", "yml", "toml",
    "html", "css", "scss", "bash", "sh", "shell", "zsh", "sql", "markdown", "md", "xml", "diff",
];

const IMAGE_URL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif", "svg"];
const VIDEO_URL_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v"];
const MIDI_URL_EXTENSIONS: &[&str] = &["mid", "midi"];
const MODEL3D_URL_EXTENSIONS: &[&str] = &["glb", "gltf", "stl", "obj"];
const CODE_URL_EXTENSIONS: &[&str] = &["rs", "py", "js", "ts", "c", "cpp", "go", "java"];

pub struct Renderer<'a> {
    pub config: &'a Config,
    pub media: &'a MediaCatalog,
    pub index: &'a PostIndex,
    pub issues: &'a IssueCollector,
}

impl<'a> Renderer<'a> {
    /// Render one post's body to HTML.
    pub fn render(&self, post: &ParsedPost) -> String {
        let events: Vec<Event> = Parser::new_ext(&post.body, parser_options()).collect();
        let mut state = TransformState::new(post);
        let transformed = self.transform(events, &mut state);

        let mut out = String::new();
        html::push_html(&mut out, transformed.into_iter());
        out
    }

    /// The main event transform. Recurses for blockquotes so callouts nest.
    fn transform<'e>(
        &self,
        events: Vec<Event<'e>>,
        state: &mut TransformState<'_>,
    ) -> Vec<Event<'e>> {
        let mut out: Vec<Event<'e>> = Vec::with_capacity(events.len());
        let mut text_buffer = String::new();
        // Closing markup for open links, innermost last
        let mut link_stack: Vec<Option<String>> = Vec::new();
        let mut image: Option<ImageCapture> = None;
        let mut code: Option<CodeCapture> = None;

        let mut iter = events.into_iter();
        while let Some(event) = iter.next() {
            // Alt-text capture inside an image swallows everything else
            if let Some(capture) = &mut image {
                match event {
                    Event::Text(text) | Event::Code(text) => capture.alt.push_str(&text),
                    Event::End(TagEnd::Image) => {
                        let capture = image.take().unwrap();
                        out.push(Event::Html(
                            self.markdown_image_html(&capture, state).into(),
                        ));
                    }
                    _ => {}
                }
                continue;
            }
            // Code fences buffer raw text until the closing fence
            if let Some(capture) = &mut code {
                match event {
                    Event::Text(text) => capture.source.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        let capture = code.take().unwrap();
                        out.push(Event::Html(self.code_block_html(&capture).into()));
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Text(text) => text_buffer.push_str(&text),
                Event::Start(Tag::BlockQuote(_)) => {
                    self.flush(&mut text_buffer, &mut out, state);
                    let inner = collect_blockquote(&mut iter);
                    let transformed = self.transform(inner, state);
                    out.extend(wrap_blockquote(transformed));
                }
                Event::Start(Tag::Image { dest_url, .. }) => {
                    self.flush(&mut text_buffer, &mut out, state);
                    image = Some(ImageCapture {
                        dest: dest_url.to_string(),
                        alt: String::new(),
                    });
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    self.flush(&mut text_buffer, &mut out, state);
                    let language = match kind {
                        pulldown_cmark::CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .unwrap_or("")
                            .to_ascii_lowercase(),
                        pulldown_cmark::CodeBlockKind::Indented => String::new(),
                    };
                    code = Some(CodeCapture {
                        language,
                        source: String::new(),
                    });
                }
                Event::Start(Tag::Link {
                    dest_url, title, ..
                }) => {
                    self.flush(&mut text_buffer, &mut out, state);
                    state.link_depth += 1;
                    match self.link_open_html(&dest_url, &title, state) {
                        Some(open) => {
                            out.push(Event::Html(open.into()));
                            link_stack.push(Some("</a>".to_string()));
                        }
                        None => {
                            out.push(Event::Start(Tag::Link {
                                link_type: pulldown_cmark::LinkType::Inline,
                                dest_url,
                                title,
                                id: CowStr::from(""),
                            }));
                            link_stack.push(None);
                        }
                    }
                }
                Event::End(TagEnd::Link) => {
                    self.flush(&mut text_buffer, &mut out, state);
                    state.link_depth = state.link_depth.saturating_sub(1);
                    match link_stack.pop().flatten() {
                        Some(closing) => out.push(Event::Html(closing.into())),
                        None => out.push(Event::End(TagEnd::Link)),
                    }
                }
                Event::Start(Tag::Heading { level, .. }) => {
                    self.flush(&mut text_buffer, &mut out, state);
                    let id = state
                        .post
                        .toc
                        .get(state.heading_idx)
                        .map(|entry| entry.id.clone())
                        .unwrap_or_default();
                    state.heading_idx += 1;
                    let tag = level as usize;
                    out.push(Event::Html(
                        format!(r##"<h{tag} id="{id}"><a class="heading-anchor" href="#{id}">"##)
                            .into(),
                    ));
                    state.open_heading = Some(tag);
                }
                Event::End(TagEnd::Heading(_)) => {
                    self.flush(&mut text_buffer, &mut out, state);
                    let tag = state.open_heading.take().unwrap_or(2);
                    out.push(Event::Html(format!("</a></h{tag}>").into()));
                }
                Event::InlineMath(src) => {
                    self.flush(&mut text_buffer, &mut out, state);
                    out.push(Event::Html(
                        format!(
                            r#"<span class="math math-inline">\({}\)</span>"#,
                            encode_text(&src)
                        )
                        .into(),
                    ));
                }
                Event::DisplayMath(src) => {
                    self.flush(&mut text_buffer, &mut out, state);
                    out.push(Event::Html(
                        format!(
                            r#"<div class="math math-display">\[{}\]</div>"#,
                            encode_text(&src)
                        )
                        .into(),
                    ));
                }
                other => {
                    self.flush(&mut text_buffer, &mut out, state);
                    out.push(other);
                }
            }
        }
        self.flush(&mut text_buffer, &mut out, state);
        out
    }

    /// Run the inline stages over coalesced text and emit one Html event.
    fn flush<'e>(
        &self,
        buffer: &mut String,
        out: &mut Vec<Event<'e>>,
        state: &mut TransformState<'_>,
    ) {
        if buffer.is_empty() {
            return;
        }
        let html = self.inline_html(buffer, state);
        out.push(Event::Html(html.into()));
        buffer.clear();
    }

    /// The inline custom-syntax stages, in documented order.
    fn inline_html(&self, text: &str, state: &mut TransformState<'_>) -> String {
        // Escape first; replacements below insert raw HTML into the escaped
        // stream, and targets are entity-decoded before lookup.
        let escaped = encode_text(text).to_string();

        // Obsidian media embeds before wiki links — `![[` would otherwise
        // leave a stray `!` in front of an anchor.
        let with_embeds = WIKI_EMBED_RE.replace_all(&escaped, |caps: &Captures| {
            let target = html_escape::decode_html_entities(caps[1].trim()).to_string();
            let alt = caps
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| target.clone());
            self.media_embed_html(&target, &alt, "obsidian-media", state)
        });

        let with_links = WIKI_LINK_RE.replace_all(&with_embeds, |caps: &Captures| {
            let target = html_escape::decode_html_entities(caps[1].trim()).to_string();
            let fragment = caps.get(2).map(|m| m.as_str().trim());
            let alias = caps.get(3).map(|m| m.as_str().trim());
            self.wiki_link_html(&target, fragment, alias, state)
        });

        // Link text must stay text — no iframes inside anchors
        if state.link_depth > 0 {
            return with_links.to_string();
        }

        BARE_URL_RE
            .replace_all(&with_links, |caps: &Captures| {
                let url = html_escape::decode_html_entities(&caps[0]).to_string();
                self.bare_url_html(&url, &caps[0])
            })
            .to_string()
    }

    /// A bare URL in running text: image → `<img>`, embeds, YouTube, else
    /// leave the text alone.
    fn bare_url_html(&self, url: &str, original: &str) -> String {
        let ext = url
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_default();

        if IMAGE_URL_EXTENSIONS.contains(&ext.as_str()) {
            return format!(
                r#"<img src="{}" alt="">"#,
                encode_double_quoted_attribute(url)
            );
        }
        let embeds = &self.config.embeds;
        if embeds.video && VIDEO_URL_EXTENSIONS.contains(&ext.as_str()) {
            return iframe_html(url, "embed-video");
        }
        if embeds.midi && MIDI_URL_EXTENSIONS.contains(&ext.as_str()) {
            return iframe_html(url, "embed-midi");
        }
        if embeds.model3d && MODEL3D_URL_EXTENSIONS.contains(&ext.as_str()) {
            return iframe_html(url, "embed-model");
        }
        if embeds.html && ext == "html" {
            return iframe_html(url, "embed-html");
        }
        if embeds.markdown && ext == "md" {
            return iframe_html(url, "embed-markdown");
        }
        if embeds.code && CODE_URL_EXTENSIONS.contains(&ext.as_str()) {
            return iframe_html(url, "embed-code");
        }
        if embeds.video {
            if let Some(caps) = YOUTUBE_RE.captures(url) {
                return format!(
                    r#"<iframe class="embed embed-youtube" src="https://www.youtube.com/embed/{}" allowfullscreen></iframe>"#,
                    &caps[1]
                );
            }
        }
        original.to_string()
    }

    /// Resolve `[[target]]` to an internal anchor, or the broken-link
    /// placeholder plus a diagnostic.
    fn wiki_link_html(
        &self,
        target: &str,
        fragment: Option<&str>,
        alias: Option<&str>,
        state: &mut TransformState<'_>,
    ) -> String {
        let label = alias.unwrap_or(target);
        let suffix = fragment.map(|f| format!("#{f}")).unwrap_or_default();

        match self.index.resolve(target) {
            ResolveOutcome::Found(slug) => {
                format!(
                    r#"<a href="{}/{slug}{suffix}">{}</a>"#,
                    self.config.notes_prefix,
                    encode_text(label)
                )
            }
            ResolveOutcome::Ambiguous { slug, candidates } => {
                warn!(
                    "alias '{target}' in {} matches several posts ({candidates:?}); using '{slug}'",
                    state.post.file.relative_path
                );
                format!(
                    r#"<a href="{}/{slug}{suffix}">{}</a>"#,
                    self.config.notes_prefix,
                    encode_text(label)
                )
            }
            ResolveOutcome::NotFound => {
                self.issues.push(Issue::BrokenLink {
                    source_file: state.post.file.relative_path.clone(),
                    target: target.to_string(),
                    link_kind: LinkKind::Wiki,
                });
                format!(
                    r##"<a href="#broken-link-{target}" class="broken-link">{}</a>"##,
                    encode_text(label)
                )
            }
        }
    }

    /// `![[target]]` and `![alt](target)` media references.
    fn media_embed_html(
        &self,
        target: &str,
        alt: &str,
        module: &str,
        state: &mut TransformState<'_>,
    ) -> String {
        let record = self
            .media
            .resolve(target, &state.post.file.folder, true);
        match record.and_then(|r| r.best_url(self.config)) {
            Some(url) => format!(
                r#"<img src="{}" alt="{}">"#,
                encode_double_quoted_attribute(&url),
                encode_double_quoted_attribute(alt)
            ),
            None => {
                self.issues.push(Issue::MissingMedia {
                    file_path: state.post.file.relative_path.clone(),
                    media_path: target.to_string(),
                    referenced_from: ReferenceOrigin::Body,
                    original_reference: target.to_string(),
                    module: module.to_string(),
                });
                format!(
                    r##"<img src="#broken-link-{target}" alt="{}">"##,
                    encode_double_quoted_attribute(alt)
                )
            }
        }
    }

    /// `![alt](dest)` — markdown-images, media-aware.
    fn markdown_image_html(&self, capture: &ImageCapture, state: &mut TransformState<'_>) -> String {
        if capture.dest.starts_with("http://")
            || capture.dest.starts_with("https://")
            || capture.dest.starts_with("data:")
        {
            return format!(
                r#"<img src="{}" alt="{}">"#,
                encode_double_quoted_attribute(&capture.dest),
                encode_double_quoted_attribute(&capture.alt)
            );
        }
        self.media_embed_html(&capture.dest, &capture.alt, "markdown-images", state)
    }

    /// Opening markup for `[text](dest)` links. `None` passes the original
    /// event through (anchor-only, mailto, tel).
    fn link_open_html(
        &self,
        dest: &str,
        title: &str,
        state: &mut TransformState<'_>,
    ) -> Option<String> {
        if dest.starts_with('#')
            || dest.starts_with("mailto:")
            || dest.starts_with("tel:")
            || dest.starts_with("data:")
        {
            return None;
        }
        let title_attr = if title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{}""#, encode_double_quoted_attribute(title))
        };

        if dest.starts_with("http://") || dest.starts_with("https://") {
            return Some(format!(
                r#"<a href="{}"{title_attr} target="_blank" rel="noopener">"#,
                encode_double_quoted_attribute(dest)
            ));
        }

        // Internal markdown link: resolve like a wiki target
        let (base, suffix) = split_link_suffix(dest);
        let decoded = percent_encoding::percent_decode_str(base)
            .decode_utf8_lossy()
            .to_string();
        match self.index.resolve(&decoded) {
            ResolveOutcome::Found(slug) | ResolveOutcome::Ambiguous { slug, .. } => Some(format!(
                r#"<a href="{}/{slug}{suffix}"{title_attr}>"#,
                self.config.notes_prefix
            )),
            ResolveOutcome::NotFound => {
                self.issues.push(Issue::BrokenLink {
                    source_file: state.post.file.relative_path.clone(),
                    target: decoded.clone(),
                    link_kind: LinkKind::Markdown,
                });
                Some(format!(
                    r##"<a href="#broken-link-{decoded}" class="broken-link">"##
                ))
            }
        }
    }

    /// Fenced code: mermaid strategy or syntect highlighting.
    fn code_block_html(&self, capture: &CodeCapture) -> String {
        if capture.language == "mermaid" {
            // The iframe-embed feature runs before the mermaid stage; it is
            // off by default so the fence isn't processed twice.
            if self.config.embeds.mermaid {
                let inner = format!(
                    "<pre class=\"mermaid\">{}</pre>",
                    encode_text(&capture.source)
                );
                return format!(
                    r#"<iframe class="embed embed-mermaid" srcdoc="{}"></iframe>"#,
                    encode_double_quoted_attribute(&inner)
                );
            }
            if self.config.mermaid.enabled {
                return self.mermaid_html(&capture.source);
            }
        }
        highlight_html(&capture.language, &capture.source)
    }

    fn mermaid_html(&self, source: &str) -> String {
        let fallback = || format!("<pre class=\"mermaid\">{}</pre>", encode_text(source));
        match self.config.mermaid.strategy {
            MermaidStrategy::PreMermaid => fallback(),
            MermaidStrategy::ImgPng | MermaidStrategy::ImgSvg | MermaidStrategy::InlineSvg => {
                match self.render_mermaid_diagram(source) {
                    Ok(MermaidOutput::Img(public_path)) => format!(
                        r#"<img class="mermaid-diagram" src="{}" alt="diagram">"#,
                        encode_double_quoted_attribute(&public_path)
                    ),
                    Ok(MermaidOutput::Inline(svg)) => {
                        format!(r#"<div class="mermaid-diagram">{svg}</div>"#)
                    }
                    Err(e) => {
                        warn!("mermaid rendering failed, falling back to pre: {e}");
                        fallback()
                    }
                }
            }
        }
    }

    /// Shell out to `mmdc`, content-addressing the diagram file so reruns
    /// reuse it.
    fn render_mermaid_diagram(&self, source: &str) -> std::io::Result<MermaidOutput> {
        let ext = match self.config.mermaid.strategy {
            MermaidStrategy::ImgPng => "png",
            _ => "svg",
        };
        let name = format!(
            "{}-{}.{ext}",
            self.config.mermaid.prefix,
            hash::short_hash(&hash::hash_bytes(source.as_bytes()))
        );
        let dir = self.config.media_output_dir().join("mermaid");
        fs::create_dir_all(&dir)?;
        let dest = dir.join(&name);

        if !dest.exists() {
            let input = dir.join(format!("{name}.mmd"));
            fs::write(&input, source)?;
            let mut command = Command::new("mmdc");
            command.arg("-i").arg(&input).arg("-o").arg(&dest);
            if self.config.mermaid.dark {
                command.args(["-t", "dark"]);
            }
            if let Some(mermaid_config) = &self.config.mermaid.config {
                let config_path = dir.join(format!("{name}.config.json"));
                fs::write(&config_path, mermaid_config)?;
                command.arg("-c").arg(&config_path);
            }
            let output = command.output()?;
            fs::remove_file(&input).ok();
            if !output.status.success() {
                return Err(std::io::Error::other(
                    String::from_utf8_lossy(&output.stderr).to_string(),
                ));
            }
            debug!("rendered mermaid diagram {name}");
        }

        if self.config.mermaid.strategy == MermaidStrategy::InlineSvg {
            return Ok(MermaidOutput::Inline(fs::read_to_string(&dest)?));
        }
        Ok(MermaidOutput::Img(format!(
            "{}/mermaid/{name}",
            self.config.media_prefix
        )))
    }
}

enum MermaidOutput {
    Img(String),
    Inline(String),
}

struct ImageCapture {
    dest: String,
    alt: String,
}

struct CodeCapture {
    language: String,
    source: String,
}

struct TransformState<'a> {
    post: &'a ParsedPost,
    heading_idx: usize,
    open_heading: Option<usize>,
    link_depth: usize,
}

impl<'a> TransformState<'a> {
    fn new(post: &'a ParsedPost) -> Self {
        Self {
            post,
            heading_idx: 0,
            open_heading: None,
            link_depth: 0,
        }
    }
}

fn iframe_html(url: &str, class: &str) -> String {
    format!(
        r#"<iframe class="embed {class}" src="{}" allowfullscreen></iframe>"#,
        encode_double_quoted_attribute(url)
    )
}

/// Split `target#frag` / `target?query` into base and preserved suffix.
pub fn split_link_suffix(target: &str) -> (&str, &str) {
    match target.find(['#', '?']) {
        Some(pos) => (&target[..pos], &target[pos..]),
        None => (target, ""),
    }
}

/// Collect events up to (and excluding) the matching `End(BlockQuote)`.
fn collect_blockquote<'e>(iter: &mut impl Iterator<Item = Event<'e>>) -> Vec<Event<'e>> {
    let mut inner = Vec::new();
    let mut depth = 0usize;
    for event in iter.by_ref() {
        match &event {
            Event::Start(Tag::BlockQuote(_)) => depth += 1,
            Event::End(TagEnd::BlockQuote(_)) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            _ => {}
        }
        inner.push(event);
    }
    inner
}

/// Wrap transformed blockquote contents: a callout `<div>` when the first
/// text carries an `[!kind]` marker, a plain `<blockquote>` otherwise.
fn wrap_blockquote(inner: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let marker = callout_marker(&inner);

    let Some((kind, title, marker_html)) = marker else {
        let mut out = Vec::with_capacity(inner.len() + 2);
        out.push(Event::Html("<blockquote>".into()));
        out.extend(inner);
        out.push(Event::Html("</blockquote>".into()));
        return out;
    };

    let kind = kind.to_ascii_lowercase();
    let title = if title.is_empty() {
        let mut chars = kind.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    } else {
        title
    };

    let mut out = Vec::with_capacity(inner.len() + 4);
    out.push(Event::Html(
        format!(
            r#"<div class="callout callout-{kind}" data-callout="{kind}"><div class="callout-title">{}</div><div class="callout-content">"#,
            encode_text(&title)
        )
        .into(),
    ));
    let mut stripped_marker = false;
    for event in inner {
        if !stripped_marker {
            if let Event::Html(html_content) = &event {
                if html_content.as_ref() == marker_html {
                    stripped_marker = true;
                    continue;
                }
                // The marker may share its Html event with following text
                if let Some(rest) = html_content.as_ref().strip_prefix(marker_html.as_str()) {
                    stripped_marker = true;
                    let rest = rest.trim_start_matches(['\n', ' ']);
                    if !rest.is_empty() {
                        out.push(Event::Html(rest.to_string().into()));
                    }
                    continue;
                }
            }
        }
        out.push(event);
    }
    out.push(Event::Html("</div></div>".into()));
    out
}

/// Find an `[!kind] title` marker in the blockquote's first rendered text.
///
/// Returns `(kind, title, the marker's prefix within that Html event)`.
fn callout_marker(inner: &[Event<'_>]) -> Option<(String, String, String)> {
    for event in inner {
        match event {
            Event::Start(Tag::Paragraph) => continue,
            Event::Html(content) => {
                let first_line = content.lines().next().unwrap_or("");
                let caps = CALLOUT_RE.captures(first_line.trim_start())?;
                let kind = caps[1].to_string();
                let title = caps[2].trim().to_string();
                let marker_len = content.find(&caps[0]).unwrap_or(0) + caps[0].len();
                return Some((kind, title, content[..marker_len].to_string()));
            }
            _ => return None,
        }
    }
    None
}

/// Syntect classed highlighting over the curated language set; anything
/// else renders as a plain escaped block.
pub fn highlight_html(language: &str, source: &str) -> String {
    let plain = |lang: &str| {
        let class = if lang.is_empty() {
            String::new()
        } else {
            format!(" class=\"language-{lang}\"")
        };
        format!("<pre><code{class}>{}</code></pre>", encode_text(source))
    };

    if language.is_empty() || !HIGHLIGHT_LANGUAGES.contains(&language) {
        return plain(language);
    }
    let Some(syntax) = SYNTAX_SET.find_syntax_by_token(language) else {
        return plain(language);
    };

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
    for line in LinesWithEndings::from(source) {
        if generator
            .parse_html_for_line_which_includes_newline(line)
            .is_err()
        {
            return plain(language);
        }
    }
    format!(
        "<pre><code class=\"language-{language}\">{}</code></pre>",
        generator.finalize()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::ParsedPost;
    use crate::resolver::PostIndex;
    use crate::slugs::SlugInfo;
    use crate::walker::VaultFile;
    use std::path::PathBuf;

    fn parsed(rel: &str, body: &str) -> ParsedPost {
        ParsedPost {
            file: VaultFile {
                absolute_path: PathBuf::from(rel),
                relative_path: rel.into(),
                folder: rel.rsplit_once('/').map(|(d, _)| d.to_string()).unwrap_or_default(),
                file_name: rel.rsplit('/').next().unwrap().into(),
                created: None,
                modified: None,
            },
            frontmatter: crate::frontmatter::Value::Map(Vec::new()),
            body: body.into(),
            content_hash: crate::hash::hash_bytes(body.as_bytes()),
            title: "T".into(),
            first_paragraph: String::new(),
            plain_text: String::new(),
            word_count: 0,
            first_image: None,
            toc: crate::markdown::extract_toc(body),
        }
    }

    fn slug_info(slug: &str) -> SlugInfo {
        SlugInfo {
            desired: slug.into(),
            disambiguated: slug.into(),
            final_slug: slug.into(),
            is_disambiguated: false,
        }
    }

    struct Fixture {
        posts: Vec<ParsedPost>,
        slugs: Vec<SlugInfo>,
        config: Config,
        media: MediaCatalog,
    }

    impl Fixture {
        fn new(posts: Vec<(&str, &str, &str)>) -> Self {
            let slugs = posts.iter().map(|(_, slug, _)| slug_info(slug)).collect();
            let posts = posts
                .into_iter()
                .map(|(rel, _, body)| parsed(rel, body))
                .collect();
            Self {
                posts,
                slugs,
                config: Config::default(),
                media: MediaCatalog::default(),
            }
        }

        fn render(&self, i: usize) -> (String, IssueCollector) {
            let index = PostIndex::build(&self.posts, &self.slugs);
            let issues = IssueCollector::new();
            let renderer = Renderer {
                config: &self.config,
                media: &self.media,
                index: &index,
                issues: &issues,
            };
            (renderer.render(&self.posts[i]), issues)
        }
    }

    #[test]
    fn wiki_link_resolves_to_notes_url() {
        let fx = Fixture::new(vec![
            ("a.md", "a", "See [[B]] for more."),
            ("b.md", "b", "I am B."),
        ]);
        let (html, issues) = fx.render(0);
        assert!(html.contains(r#"href="/notes/b""#), "{html}");
        assert!(html.contains(">B</a>"));
        assert!(issues.is_empty());
    }

    #[test]
    fn wiki_link_alias_text_and_fragment() {
        let fx = Fixture::new(vec![
            ("a.md", "a", "See [[B#setup|the docs]]."),
            ("b.md", "b", ""),
        ]);
        let (html, _) = fx.render(0);
        assert!(html.contains(r#"href="/notes/b#setup""#), "{html}");
        assert!(html.contains(">the docs</a>"));
    }

    #[test]
    fn broken_wiki_link_placeholder_and_issue() {
        let fx = Fixture::new(vec![("a.md", "a", "See [[Nonexistent]].")]);
        let (html, issues) = fx.render(0);
        assert!(html.contains(r##"href="#broken-link-Nonexistent""##), "{html}");
        let snapshot = issues.snapshot();
        assert!(matches!(
            &snapshot[0],
            Issue::BrokenLink {
                link_kind: LinkKind::Wiki,
                ..
            }
        ));
    }

    #[test]
    fn markdown_link_to_post_resolves() {
        let fx = Fixture::new(vec![
            ("a.md", "a", "Read [the other](b.md)."),
            ("b.md", "b", ""),
        ]);
        let (html, _) = fx.render(0);
        assert!(html.contains(r#"href="/notes/b""#), "{html}");
    }

    #[test]
    fn external_link_gets_target_blank() {
        let fx = Fixture::new(vec![("a.md", "a", "Go to [site](https://example.com/x).")]);
        let (html, _) = fx.render(0);
        assert!(
            html.contains(r#"<a href="https://example.com/x" target="_blank" rel="noopener">"#),
            "{html}"
        );
    }

    #[test]
    fn anchor_only_link_passes_through() {
        let fx = Fixture::new(vec![("a.md", "a", "Jump to [intro](#intro).")]);
        let (html, _) = fx.render(0);
        assert!(html.contains(r##"href="#intro""##), "{html}");
        assert!(!html.contains("broken-link"));
    }

    #[test]
    fn heading_gets_id_and_anchor_wrap() {
        let fx = Fixture::new(vec![("a.md", "a", "# My Heading\n\nText.")]);
        let (html, _) = fx.render(0);
        assert!(
            html.contains(r##"<h1 id="my-heading"><a class="heading-anchor" href="#my-heading">"##),
            "{html}"
        );
        assert!(html.contains("</a></h1>"));
    }

    #[test]
    fn callout_blockquote_becomes_div() {
        let fx = Fixture::new(vec![(
            "a.md",
            "a",
            "> [!note] Remember\n> The content line.\n",
        )]);
        let (html, _) = fx.render(0);
        assert!(html.contains(r#"<div class="callout callout-note" data-callout="note">"#), "{html}");
        assert!(html.contains(r#"<div class="callout-title">Remember</div>"#));
        assert!(html.contains("The content line."));
        assert!(!html.contains("[!note]"));
    }

    #[test]
    fn callout_without_title_uses_capitalized_kind() {
        let fx = Fixture::new(vec![("a.md", "a", "> [!warning]\n> Careful.\n")]);
        let (html, _) = fx.render(0);
        assert!(html.contains(r#"<div class="callout-title">Warning</div>"#), "{html}");
    }

    #[test]
    fn plain_blockquote_stays_blockquote() {
        let fx = Fixture::new(vec![("a.md", "a", "> Just a quote.\n")]);
        let (html, _) = fx.render(0);
        assert!(html.contains("<blockquote>"), "{html}");
        assert!(html.contains("Just a quote."));
    }

    #[test]
    fn math_nodes_emitted_with_classes() {
        let fx = Fixture::new(vec![("a.md", "a", "Euler: $e^{i\\pi}$\n\n$$x = 1$$\n")]);
        let (html, _) = fx.render(0);
        assert!(html.contains(r#"<span class="math math-inline">"#), "{html}");
        assert!(html.contains(r#"<div class="math math-display">"#), "{html}");
    }

    #[test]
    fn fenced_code_highlighted_with_language_class() {
        let fx = Fixture::new(vec![("a.md", "a", "```rust\nfn main() {}\n```\n")]);
        let (html, _) = fx.render(0);
        assert!(html.contains(r#"<code class="language-rust">"#), "{html}");
        assert!(html.contains("main"));
    }

    #[test]
    fn unknown_language_renders_plain_escaped() {
        let fx = Fixture::new(vec![("a.md", "a", "```brainfuck\n<+>\n```\n")]);
        let (html, _) = fx.render(0);
        assert!(html.contains("&lt;+&gt;"), "{html}");
    }

    #[test]
    fn mermaid_pre_strategy_wraps_source() {
        let mut fx = Fixture::new(vec![("a.md", "a", "```mermaid\ngraph TD; A-->B;\n```\n")]);
        fx.config.mermaid.strategy = MermaidStrategy::PreMermaid;
        let (html, _) = fx.render(0);
        assert!(html.contains(r#"<pre class="mermaid">"#), "{html}");
        assert!(html.contains("A--&gt;B"));
    }

    #[test]
    fn mermaid_iframe_feature_takes_precedence() {
        let mut fx = Fixture::new(vec![("a.md", "a", "```mermaid\ngraph TD;\n```\n")]);
        fx.config.embeds.mermaid = true;
        let (html, _) = fx.render(0);
        assert!(html.contains("embed-mermaid"), "{html}");
        assert!(html.contains("srcdoc="));
    }

    #[test]
    fn bare_markdown_url_gated_by_feature() {
        let mut fx = Fixture::new(vec![("a.md", "a", "https://x.test/readme.md\n")]);
        let (html, _) = fx.render(0);
        assert!(!html.contains("embed-markdown"), "{html}");

        fx.config.embeds.markdown = true;
        let (html, _) = fx.render(0);
        assert!(html.contains("embed-markdown"), "{html}");
    }

    #[test]
    fn mermaid_disabled_highlights_as_code() {
        let mut fx = Fixture::new(vec![("a.md", "a", "```mermaid\ngraph TD;\n```\n")]);
        fx.config.mermaid.enabled = false;
        let (html, _) = fx.render(0);
        assert!(!html.contains(r#"<pre class="mermaid">"#), "{html}");
        assert!(html.contains("graph TD;"));
    }

    #[test]
    fn wiki_embed_missing_media_issue() {
        let fx = Fixture::new(vec![("a.md", "a", "![[ghost.png]]")]);
        let (html, issues) = fx.render(0);
        assert!(html.contains("#broken-link-ghost.png"), "{html}");
        let snapshot = issues.snapshot();
        assert!(matches!(
            &snapshot[0],
            Issue::MissingMedia {
                referenced_from: ReferenceOrigin::Body,
                module,
                ..
            } if module == "obsidian-media"
        ));
    }

    #[test]
    fn external_markdown_image_passes_through() {
        let fx = Fixture::new(vec![("a.md", "a", "![alt](https://x.test/p.png)")]);
        let (html, issues) = fx.render(0);
        assert!(html.contains(r#"<img src="https://x.test/p.png" alt="alt">"#), "{html}");
        assert!(issues.is_empty());
    }

    #[test]
    fn bare_youtube_url_becomes_iframe() {
        let fx = Fixture::new(vec![(
            "a.md",
            "a",
            "Watch this:\n\nhttps://www.youtube.com/watch?v=dQw4w9WgXcQ\n",
        )]);
        let (html, _) = fx.render(0);
        assert!(
            html.contains(r#"src="https://www.youtube.com/embed/dQw4w9WgXcQ""#),
            "{html}"
        );
    }

    #[test]
    fn bare_video_url_respects_feature_toggle() {
        let mut fx = Fixture::new(vec![("a.md", "a", "https://x.test/clip.mp4\n")]);
        let (html, _) = fx.render(0);
        assert!(html.contains("embed-video"), "{html}");

        fx.config.embeds.video = false;
        let (html, _) = fx.render(0);
        assert!(!html.contains("embed-video"), "{html}");
    }

    #[test]
    fn bare_image_url_becomes_img() {
        let fx = Fixture::new(vec![("a.md", "a", "https://x.test/pic.webp\n")]);
        let (html, _) = fx.render(0);
        assert!(html.contains(r#"<img src="https://x.test/pic.webp""#), "{html}");
    }

    #[test]
    fn wiki_syntax_in_inline_code_is_preserved() {
        let fx = Fixture::new(vec![
            ("a.md", "a", "Write a link like `[[B]]` in your note."),
            ("b.md", "b", ""),
        ]);
        let (html, _) = fx.render(0);
        assert!(html.contains("<code>[[B]]</code>"), "{html}");
    }

    #[test]
    fn text_is_escaped() {
        let fx = Fixture::new(vec![("a.md", "a", "a < b & c\n")]);
        let (html, _) = fx.render(0);
        assert!(html.contains("a &lt; b &amp; c"), "{html}");
    }

    #[test]
    fn gfm_table_renders() {
        let fx = Fixture::new(vec![("a.md", "a", "| a | b |\n|---|---|\n| 1 | 2 |\n")]);
        let (html, _) = fx.render(0);
        assert!(html.contains("<table>"), "{html}");
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn nested_callouts_transform_recursively() {
        let body = "> [!note] Outer\n> Outer content.\n>\n> > [!tip] Inner\n> > Inner content.\n";
        let fx = Fixture::new(vec![("a.md", "a", body)]);
        let (html, _) = fx.render(0);
        assert!(html.contains("callout-note"), "{html}");
        assert!(html.contains("callout-tip"), "{html}");
    }

    #[test]
    fn split_link_suffix_variants() {
        assert_eq!(split_link_suffix("page#frag"), ("page", "#frag"));
        assert_eq!(split_link_suffix("page?x=1"), ("page", "?x=1"));
        assert_eq!(split_link_suffix("page"), ("page", ""));
    }
}
