//! HTML extractor for blog posts and crawl links
//!
//! This module parses a fetched listing page into:
//! - Zero or more post drafts (title, content, summary, date, URL)
//! - Pagination links ("older posts", page-numbered listings)
//! - Archive links (date- or label-indexed listings)
//!
//! Every field is located with an ordered selector chain where the first
//! candidate that matches wins; results from different candidates are never
//! merged.

use crate::config::ExtractorConfig;
use crate::state::{CrawlTarget, TargetRole};
use crate::storage::PostDraft;
use crate::text::{extract_date, generate_summary, normalize_whitespace, truncate_chars};
use crate::url::{is_same_origin, resolve_link};
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use url::{Position, Url};

const CONTAINER_SELECTORS: &[&str] = &[
    "div.post",
    "article",
    "div.entry",
    "div[class*=\"post\"]",
    "div.blog-post",
    "div.hentry",
    ".post-outer",
    ".post-body",
];

const TITLE_SELECTORS: &[&str] = &[
    "h1.post-title, h2.post-title, h3.post-title",
    "h1.entry-title, h2.entry-title, h3.entry-title",
    ".post-title a",
    ".entry-title a",
    "h1",
    "h2",
    "h3",
];

const CONTENT_SELECTORS: &[&str] = &[
    ".post-body",
    ".entry-content",
    ".post-content",
    ".content",
    ".post-text",
    ".entry-text",
];

const DATE_SELECTORS: &[&str] = &[
    "time",
    ".published",
    ".post-date",
    ".entry-date",
    ".date",
    "[datetime]",
    ".timestamp",
];

/// Subtrees whose text never counts as content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// Elements rendered as their own line(s)
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre",
    "section", "article", "header", "footer", "table", "tr", "figure", "figcaption", "hr",
];

struct Selectors {
    containers: Vec<Selector>,
    titles: Vec<Selector>,
    contents: Vec<Selector>,
    dates: Vec<Selector>,
    anchors: Vec<Selector>,
    post_links: Vec<Selector>,
}

fn compile(list: &[&str]) -> Vec<Selector> {
    list.iter().filter_map(|s| Selector::parse(s).ok()).collect()
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    containers: compile(CONTAINER_SELECTORS),
    titles: compile(TITLE_SELECTORS),
    contents: compile(CONTENT_SELECTORS),
    dates: compile(DATE_SELECTORS),
    anchors: compile(&["a[href]"]),
    post_links: compile(&["a[rel=\"bookmark\"][href]", "a[href]"]),
});

/// Which part of an anchor a link rule inspects
#[derive(Debug, Clone, Copy)]
enum LinkField {
    Class,
    Text,
    /// Path and query of the resolved URL
    Href,
}

struct LinkRule {
    field: LinkField,
    pattern: Regex,
    role: TargetRole,
}

impl LinkRule {
    fn new(field: LinkField, pattern: &str, role: TargetRole) -> Option<Self> {
        Regex::new(pattern).ok().map(|pattern| Self {
            field,
            pattern,
            role,
        })
    }
}

/// Ordered link rules; pagination rules come first, the first hit classifies
static LINK_RULES: LazyLock<Vec<LinkRule>> = LazyLock::new(|| {
    [
        (LinkField::Class, r"(?i)blog-pager-older-link|older-posts", TargetRole::Pagination),
        (LinkField::Text, r"(?i)older|next|下一页|更多|继续阅读", TargetRole::Pagination),
        (LinkField::Class, r"(?i)page-numbers|pagination", TargetRole::Pagination),
        (LinkField::Href, r"(?i)page|p=|start=|offset=", TargetRole::Pagination),
        (LinkField::Href, r"(?i)archive|\d{4}/\d{2}|\d{4}_\d{2}", TargetRole::Archive),
        (LinkField::Text, r"(?i)\d{4}年|\d{4}/\d{2}|archive", TargetRole::Archive),
        (LinkField::Class, r"(?i)archive|date", TargetRole::Archive),
    ]
    .into_iter()
    .filter_map(|(field, pattern, role)| LinkRule::new(field, pattern, role))
    .collect()
});

/// Result of a selector chain
///
/// Distinguishes "nothing matched" from "matched, but the value was empty".
#[derive(Debug, Clone, PartialEq)]
enum Extracted<T> {
    Found(T),
    Blank,
    Absent,
}

impl<T> Extracted<T> {
    fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Blank | Self::Absent => None,
        }
    }
}

/// Links discovered on a page, split by role
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveredLinks {
    pub pagination: BTreeSet<Url>,
    pub archive: BTreeSet<Url>,
}

impl DiscoveredLinks {
    pub fn len(&self) -> usize {
        self.pagination.len() + self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts the links into frontier targets, pagination first
    pub fn into_targets(self) -> Vec<CrawlTarget> {
        self.pagination
            .into_iter()
            .map(|url| CrawlTarget::new(url, TargetRole::Pagination))
            .chain(
                self.archive
                    .into_iter()
                    .map(|url| CrawlTarget::new(url, TargetRole::Archive)),
            )
            .collect()
    }
}

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub posts: Vec<PostDraft>,
    pub links: DiscoveredLinks,
}

/// Post and link extractor
///
/// Extraction is synchronous: the parsed document is not `Send` and must
/// never live across an await point.
#[derive(Debug, Clone)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Parses a document fetched from `page_url`
    ///
    /// # Example
    ///
    /// ```
    /// use blog_harvester::config::ExtractorConfig;
    /// use blog_harvester::crawler::Extractor;
    /// use url::Url;
    ///
    /// let html = r#"<div class="post"><h2 class="post-title"><a href="/p/1">Hello</a></h2>
    ///   <div class="post-body">A first post with enough words in it to pass the length gate easily.</div></div>"#;
    /// let page = Url::parse("https://blog.example.com/").unwrap();
    /// let extraction = Extractor::new(ExtractorConfig::default()).extract(html, &page);
    /// assert_eq!(extraction.posts[0].title, "Hello");
    /// assert_eq!(extraction.posts[0].url, "https://blog.example.com/p/1");
    /// ```
    pub fn extract(&self, html: &str, page_url: &Url) -> Extraction {
        let document = Html::parse_document(html);

        Extraction {
            posts: self.extract_posts(&document, page_url),
            links: discover_links(&document, page_url),
        }
    }

    fn extract_posts(&self, document: &Html, page_url: &Url) -> Vec<PostDraft> {
        let containers: Vec<ElementRef> = SELECTORS
            .containers
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|matches| !matches.is_empty())
            .unwrap_or_default();

        containers
            .into_iter()
            .enumerate()
            .filter_map(|(idx, container)| self.extract_post(container, idx + 1, page_url))
            .collect()
    }

    fn extract_post(&self, container: ElementRef, index: usize, page_url: &Url) -> Option<PostDraft> {
        let title_match = first_match(container, &SELECTORS.titles, inline_text).found();

        let title = match &title_match {
            Some((_, text)) => truncate_chars(text, self.config.max_title_length),
            None => format!("Untitled {}", index),
        };

        let content = first_match(container, &SELECTORS.contents, block_text)
            .found()
            .map(|(_, text)| text)
            .unwrap_or_else(|| block_text(container));

        if content.chars().count() < self.config.min_content_length {
            tracing::debug!(
                "Dropping '{}' on {}: content shorter than {} chars",
                title,
                page_url,
                self.config.min_content_length
            );
            return None;
        }

        let publish_date = first_match(container, &SELECTORS.dates, date_text)
            .found()
            .and_then(|(_, text)| extract_date(&text));

        let url = post_url(container, title_match.as_ref().map(|(el, _)| *el), page_url);
        let summary = generate_summary(&content, self.config.summary_length);

        Some(PostDraft {
            title,
            content,
            summary,
            url: url.to_string(),
            publish_date,
            source_page: page_url.to_string(),
        })
    }
}

/// Tries candidate selectors in order and returns the first non-blank value
fn first_match<'a, F>(
    scope: ElementRef<'a>,
    candidates: &[Selector],
    read: F,
) -> Extracted<(ElementRef<'a>, String)>
where
    F: Fn(ElementRef<'a>) -> String,
{
    let mut matched = false;

    for selector in candidates {
        for element in scope.select(selector) {
            matched = true;
            let value = read(element);
            if !value.trim().is_empty() {
                return Extracted::Found((element, value));
            }
        }
    }

    if matched {
        Extracted::Blank
    } else {
        Extracted::Absent
    }
}

fn inline_text(element: ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// The `datetime` attribute wins over the element's text
fn date_text(element: ElementRef) -> String {
    match element.value().attr("datetime") {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => inline_text(element),
    }
}

/// Visible text with block elements as line breaks and blank lines dropped
fn block_text(element: ElementRef) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);

    raw.lines()
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef, buf: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    buf.push('\n');
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, buf);
                }
                if block {
                    buf.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Title link, then a bookmark link, then the first link, then the page itself
fn post_url(container: ElementRef, title: Option<ElementRef>, page_url: &Url) -> Url {
    let title_link = title.and_then(|el| {
        if el.value().name() == "a" {
            el.value().attr("href")
        } else {
            SELECTORS
                .anchors
                .iter()
                .find_map(|selector| el.select(selector).next())
                .and_then(|a| a.value().attr("href"))
        }
    });

    title_link
        .and_then(|href| resolve_link(href, page_url))
        .or_else(|| {
            SELECTORS.post_links.iter().find_map(|selector| {
                container
                    .select(selector)
                    .filter_map(|a| a.value().attr("href"))
                    .find_map(|href| resolve_link(href, page_url))
            })
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Collects same-origin pagination and archive links
fn discover_links(document: &Html, page_url: &Url) -> DiscoveredLinks {
    let mut links = DiscoveredLinks::default();

    for selector in &SELECTORS.anchors {
        for anchor in document.select(selector) {
            let Some(url) = anchor
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, page_url))
            else {
                continue;
            };

            if !is_same_origin(&url, page_url) || url == *page_url {
                continue;
            }

            let class = anchor.value().attr("class").unwrap_or("");
            let text = inline_text(anchor);

            match classify_link(class, &text, &url) {
                Some(TargetRole::Pagination) => {
                    tracing::trace!("Pagination link: {}", url);
                    links.pagination.insert(url);
                }
                Some(TargetRole::Archive) => {
                    tracing::trace!("Archive link: {}", url);
                    links.archive.insert(url);
                }
                _ => {}
            }
        }
    }

    links
}

fn classify_link(class: &str, text: &str, url: &Url) -> Option<TargetRole> {
    let href = &url[Position::BeforePath..Position::AfterQuery];

    LINK_RULES
        .iter()
        .find(|rule| {
            let haystack = match rule.field {
                LinkField::Class => class,
                LinkField::Text => text,
                LinkField::Href => href,
            };
            !haystack.is_empty() && rule.pattern.is_match(haystack)
        })
        .map(|rule| rule.role)
}
