use ammonia::Builder;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::Serialize;
use std::collections::HashSet;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

/// Length, in characters, of an excerpt derived from a post body.
pub const EXCERPT_LENGTH: usize = 54;

const HIGHLIGHT_THEME: &str = "InspiredGitHub";

/// Markdown features switched on for one rendering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extensions {
    /// Tables, footnotes, definition lists and `{#id}` heading attributes.
    pub extra: bool,
    /// Syntax highlighting for fenced and indented code blocks.
    pub highlight: bool,
    /// Anchor every heading and collect a table of contents.
    pub toc: bool,
}

impl Extensions {
    fn options(&self) -> Options {
        if self.extra {
            Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_DEFINITION_LIST
                | Options::ENABLE_HEADING_ATTRIBUTES
        } else {
            Options::empty()
        }
    }
}

/// Used when deriving excerpts at save time. Headings are not anchored.
pub static EXCERPT_EXTENSIONS: Extensions = Extensions {
    extra: true,
    highlight: true,
    toc: false,
};

/// Used when a post is displayed.
pub static DETAIL_EXTENSIONS: Extensions = Extensions {
    extra: true,
    highlight: true,
    toc: true,
};

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);
static SANITIZER: Lazy<Builder<'static>> = Lazy::new(build_sanitizer);
static TAG_STRIPPER: Lazy<Builder<'static>> = Lazy::new(Builder::empty);

fn build_sanitizer() -> Builder<'static> {
    let mut tags = Builder::default().clone_tags();
    tags.insert("pre");
    tags.insert("code");
    tags.insert("span");
    tags.insert("table");
    tags.insert("thead");
    tags.insert("tbody");
    tags.insert("tr");
    tags.insert("th");
    tags.insert("td");
    tags.insert("del");
    tags.insert("sup");
    tags.insert("dl");
    tags.insert("dt");
    tags.insert("dd");

    let mut attrs = Builder::default().clone_tag_attributes();
    attrs.insert("span", ["style"].iter().cloned().collect());
    attrs.insert("pre", ["style"].iter().cloned().collect());
    // heading anchors and footnote targets
    for tag in ["h1", "h2", "h3", "h4", "h5", "h6", "div"] {
        attrs.insert(tag, ["id"].iter().cloned().collect());
    }

    let mut sanitizer = Builder::default();
    sanitizer
        .tags(tags)
        .tag_attributes(attrs)
        .add_allowed_classes("div", &["codehilite", "footnote-definition"])
        .add_allowed_classes("sup", &["footnote-reference", "footnote-definition-label"])
        .link_rel(Some("noopener noreferrer"));
    sanitizer
}

/// One heading in a table of contents, with the headings nested below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    pub anchor: String,
    pub children: Vec<TocEntry>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Rendered {
    pub html: String,
    /// Empty when the document has no headings or TOC generation is off.
    pub toc: Vec<TocEntry>,
}

impl Rendered {
    /// Nested `<ul>` markup for the table of contents, or an empty string.
    pub fn toc_html(&self) -> String {
        if self.toc.is_empty() {
            return String::new();
        }
        let mut out = String::from(r#"<div class="toc">"#);
        push_toc_list(&mut out, &self.toc);
        out.push_str("</div>");
        out
    }
}

fn push_toc_list(out: &mut String, entries: &[TocEntry]) {
    out.push_str("<ul>");
    for entry in entries {
        out.push_str(&format!(
            r##"<li><a href="#{}">{}</a>"##,
            html_escape(&entry.anchor),
            html_escape(&entry.text)
        ));
        if !entry.children.is_empty() {
            push_toc_list(out, &entry.children);
        }
        out.push_str("</li>");
    }
    out.push_str("</ul>");
}

struct PendingHeading<'a> {
    level: HeadingLevel,
    id: Option<CowStr<'a>>,
    classes: Vec<CowStr<'a>>,
    attrs: Vec<(CowStr<'a>, Option<CowStr<'a>>)>,
    text: String,
    events: Vec<Event<'a>>,
}

/// Render Markdown to sanitized HTML.
///
/// With `extensions.toc` set, every heading gets an `id` (its own `{#id}` if
/// given, otherwise a unique slug of its text) and the headings are returned
/// as a nested table of contents.
pub fn render(markdown: &str, extensions: &Extensions) -> Rendered {
    let parser = Parser::new_ext(markdown, extensions.options());

    let mut events: Vec<Event> = Vec::new();
    let mut code: Option<(String, String)> = None;
    let mut heading: Option<PendingHeading> = None;
    let mut anchors = Anchors::default();
    if extensions.toc {
        anchors.reserve_explicit(markdown, extensions.options());
    }
    let mut flat_toc: Vec<TocEntry> = Vec::new();

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) if extensions.highlight => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                code = Some((lang, String::new()));
            }
            Event::End(TagEnd::CodeBlock) if code.is_some() => {
                if let Some((lang, content)) = code.take() {
                    events.push(Event::Html(highlight_code(&content, &lang).into()));
                }
            }
            Event::Text(text) if code.is_some() => {
                if let Some((_, content)) = code.as_mut() {
                    content.push_str(&text);
                }
            }
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) if extensions.toc => {
                heading = Some(PendingHeading {
                    level,
                    id,
                    classes,
                    attrs,
                    text: String::new(),
                    events: Vec::new(),
                });
            }
            Event::End(TagEnd::Heading(_)) if heading.is_some() => {
                if let Some(pending) = heading.take() {
                    let anchor = match &pending.id {
                        Some(id) => id.to_string(),
                        None => anchors.unique(&slugify(&pending.text)),
                    };
                    flat_toc.push(TocEntry {
                        level: heading_level(pending.level),
                        text: pending.text.trim().to_string(),
                        anchor: anchor.clone(),
                        children: Vec::new(),
                    });
                    events.push(Event::Start(Tag::Heading {
                        level: pending.level,
                        id: Some(CowStr::from(anchor)),
                        classes: pending.classes,
                        attrs: pending.attrs,
                    }));
                    events.extend(pending.events);
                    events.push(Event::End(TagEnd::Heading(pending.level)));
                }
            }
            event if heading.is_some() => {
                if let Some(pending) = heading.as_mut() {
                    if let Event::Text(text) | Event::Code(text) = &event {
                        pending.text.push_str(text);
                    }
                    pending.events.push(event);
                }
            }
            _ => events.push(event),
        }
    }

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    Rendered {
        html: SANITIZER.clean(&html_output).to_string(),
        toc: nest_toc(flat_toc),
    }
}

/// Plain-text excerpt of a Markdown body: rendered, stripped of every tag and
/// cut to at most [`EXCERPT_LENGTH`] characters. Character entities stay
/// encoded, so the result is safe to emit as HTML; a cut never splits one.
pub fn generate_excerpt(markdown: &str) -> String {
    let rendered = render(markdown, &EXCERPT_EXTENSIONS);
    let text = strip_tags(&rendered.html);
    truncate_encoded(text.trim(), EXCERPT_LENGTH).to_string()
}

fn truncate_encoded(text: &str, max_chars: usize) -> &str {
    let Some((end, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };
    let cut = &text[..end];
    match cut.rfind('&') {
        Some(amp) if !cut[amp..].contains(';') => &cut[..amp],
        _ => cut,
    }
}

/// Returns `excerpt` untouched unless it is empty, in which case one is
/// derived from `body`.
pub fn ensure_excerpt(excerpt: String, body: &str) -> String {
    if excerpt.is_empty() {
        generate_excerpt(body)
    } else {
        excerpt
    }
}

pub fn strip_tags(html: &str) -> String {
    TAG_STRIPPER.clean(html).to_string()
}

fn highlight_code(code: &str, lang: &str) -> String {
    let syntax = SYNTAX_SET
        .find_syntax_by_token(lang)
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());

    let Some(theme) = THEME_SET.themes.get(HIGHLIGHT_THEME) else {
        return plain_code_block(code);
    };

    match highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme) {
        Ok(html) => {
            // syntect wraps the spans in <pre style="background-color:...;">
            let trimmed = html.trim();
            let inner = trimmed
                .strip_prefix("<pre")
                .and_then(|s| s.split_once('>'))
                .and_then(|(_, rest)| rest.strip_suffix("</pre>"))
                .unwrap_or(trimmed);
            format!(
                r#"<div class="codehilite"><pre><code>{}</code></pre></div>"#,
                inner.trim_start_matches('\n')
            )
        }
        Err(e) => {
            tracing::debug!("Highlighting failed for language '{}': {}", lang, e);
            plain_code_block(code)
        }
    }
}

fn plain_code_block(code: &str) -> String {
    format!(
        r#"<div class="codehilite"><pre><code>{}</code></pre></div>"#,
        html_escape(code)
    )
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Turn headings in document order into a tree: each heading becomes a child
/// of the nearest preceding heading with a smaller level.
fn nest_toc(flat: Vec<TocEntry>) -> Vec<TocEntry> {
    let mut roots: Vec<TocEntry> = Vec::new();
    let mut open: Vec<TocEntry> = Vec::new();

    for entry in flat {
        close_down_to(&mut open, &mut roots, entry.level);
        open.push(entry);
    }
    close_down_to(&mut open, &mut roots, 0);

    roots
}

fn close_down_to(open: &mut Vec<TocEntry>, roots: &mut Vec<TocEntry>, level: u8) {
    while open.last().is_some_and(|top| top.level >= level) {
        let Some(done) = open.pop() else { break };
        match open.last_mut() {
            Some(parent) => parent.children.push(done),
            None => roots.push(done),
        }
    }
}

/// Heading ids already handed out within one document.
#[derive(Default)]
struct Anchors {
    used: HashSet<String>,
}

impl Anchors {
    /// Claim every `{#id}` in the document up front so generated slugs avoid
    /// them wherever they appear. Headings sharing an explicit id keep it.
    fn reserve_explicit(&mut self, markdown: &str, options: Options) {
        for event in Parser::new_ext(markdown, options) {
            if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
                self.used.insert(id.to_string());
            }
        }
    }

    /// `slug`, or `slug_1`, `slug_2`, ... if taken. An empty slug becomes `_1`.
    fn unique(&mut self, slug: &str) -> String {
        let mut candidate = slug.to_string();
        while candidate.is_empty() || self.used.contains(&candidate) {
            candidate = match candidate.rsplit_once('_') {
                Some((stem, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => {
                    let next = n.parse::<u64>().map(|n| n + 1).unwrap_or(1);
                    format!("{}_{}", stem, next)
                }
                _ => format!("{}_1", candidate),
            };
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// URL-safe heading anchor. Non-ASCII text is transliterated.
pub fn slugify(text: &str) -> String {
    slug::slugify(text.trim())
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
