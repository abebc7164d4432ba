//! Content extraction
//!
//! Turns a fetched HTML document into cleaned plain text plus title and
//! locale, and collects the document's outbound links. Link collection is
//! independent of extraction: a page whose content is rejected still
//! contributes links to the frontier.

use crate::url::resolve_link;
use html2text::render::text_renderer::TrivialDecorator;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Minimum cleaned text length when none is configured
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 100;

/// Elements whose content never reaches the text output
const SKIPPED_ELEMENTS: &[&str] = &[
    "header", "footer", "script", "style", "noscript", "template", "img", "svg", "picture",
    "video", "audio", "iframe", "object", "canvas", "head",
];

/// Wide enough that paragraphs are never wrapped
const RENDER_WIDTH: usize = 10_000;

/// Lines dropped by the cleaning pass (compared case-insensitively)
const BOILERPLATE_LINES: &[&str] = &[
    "skip to main content",
    "skip to content",
    "skip navigation",
    "advertisement",
    "back to top",
    "print",
    "share",
];

/// Why a page produced no record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("HTML parse failure: {0}")]
    Parse(String),

    #[error("declared language '{0}' is not English")]
    LocaleRejected(String),

    #[error("content too short: {len} < {min} characters")]
    ContentTooShort { len: usize, min: usize },
}

/// Successfully extracted page content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    pub title: String,
    /// Value of `<html lang>`, if declared
    pub locale: Option<String>,
}

/// Everything the engine needs from one HTML document
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Absolute http(s) links in document order (plus any `tel:` hrefs)
    pub links: Vec<String>,
    pub content: Result<ExtractedContent, ExtractError>,
}

/// Parses a document once and runs both link collection and extraction
pub fn parse_page(html: &str, page_url: &Url, min_text_length: usize) -> ParsedPage {
    let mut document = Html::parse_document(html);
    let links = collect_links(&document, page_url);
    let content = extract_from_document(&mut document, min_text_length);
    ParsedPage { links, content }
}

/// Collects a document's links without extracting its content
pub fn extract_links(html: &str, page_url: &Url) -> Vec<String> {
    collect_links(&Html::parse_document(html), page_url)
}

/// Extracts cleaned text, title and locale from raw HTML
///
/// # Example
///
/// ```
/// use harvester::crawler::extract_content;
///
/// let html = r#"<html lang="en"><head><title>Flu</title></head>
///     <body><p>Influenza is a contagious respiratory illness.</p></body></html>"#;
/// let content = extract_content(html, 10).unwrap();
/// assert_eq!(content.title, "Flu");
/// ```
pub fn extract_content(html: &str, min_text_length: usize) -> Result<ExtractedContent, ExtractError> {
    let mut document = Html::parse_document(html);
    extract_from_document(&mut document, min_text_length)
}

fn extract_from_document(
    document: &mut Html,
    min_text_length: usize,
) -> Result<ExtractedContent, ExtractError> {
    let title = extract_title(document)
        .ok_or_else(|| ExtractError::Parse("document has no <title>".to_string()))?;

    let locale = declared_language(document);
    if let Some(lang) = &locale {
        if !is_english(lang) {
            return Err(ExtractError::LocaleRejected(lang.clone()));
        }
    }

    strip_skipped_elements(document);
    let body = select_first(document, "body")
        .map(|body| body.html())
        .ok_or_else(|| ExtractError::Parse("document has no <body>".to_string()))?;

    let text = clean_text(&render_text(&body)?);

    let len = text.chars().count();
    if len < min_text_length {
        return Err(ExtractError::ContentTooShort {
            len,
            min: min_text_length,
        });
    }

    Ok(ExtractedContent {
        text,
        title,
        locale,
    })
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

/// Text of the first `<title>`, trimmed; empty titles are allowed
fn extract_title(document: &Html) -> Option<String> {
    select_first(document, "title").map(|element| {
        element
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    })
}

/// The `lang` attribute of the root element; blank values count as absent
fn declared_language(document: &Html) -> Option<String> {
    document
        .root_element()
        .value()
        .attr("lang")
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
}

/// English is any tag whose primary subtag is `en` (`en`, `en-US`, `EN_gb`)
fn is_english(lang: &str) -> bool {
    lang.split(['-', '_'])
        .next()
        .map(|primary| primary.eq_ignore_ascii_case("en"))
        .unwrap_or(false)
}

fn collect_links(document: &Html, page_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, page_url))
        .collect()
}

/// Removes every skipped element (and its subtree) from the document
fn strip_skipped_elements(document: &mut Html) {
    let Ok(selector) = Selector::parse(&SKIPPED_ELEMENTS.join(", ")) else {
        return;
    };
    let ids: Vec<_> = document.select(&selector).map(|element| element.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Renders body markup as plain text; link targets and emphasis are dropped
fn render_text(body_html: &str) -> Result<String, ExtractError> {
    html2text::config::with_decorator(TrivialDecorator::new())
        .string_from_read(body_html.as_bytes(), RENDER_WIDTH)
        .map_err(|e| ExtractError::Parse(e.to_string()))
}

/// Normalizes whitespace and strips boilerplate lines
///
/// Runs of spaces collapse to one, lines are trimmed, boilerplate lines are
/// dropped and consecutive blank lines collapse to a single paragraph break.
/// Applying it to its own output is a no-op.
pub fn clean_text(text: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for raw_line in text.lines() {
        let line = raw_line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        if is_boilerplate(&line) {
            continue;
        }
        current.push(line);
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs.join("\n\n")
}

fn is_boilerplate(line: &str) -> bool {
    BOILERPLATE_LINES
        .iter()
        .any(|boilerplate| line.eq_ignore_ascii_case(boilerplate))
}
