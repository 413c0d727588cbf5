//! HTML parser for extracting links and the page title
//!
//! Bodies arrive as raw bytes. [`decode_body`] picks a character encoding
//! (declared header, byte-order mark, `<meta>` sniffing, then a UTF-8 /
//! windows-1252 heuristic) and never fails. [`parse_html`] collects the
//! title and every `<a href>` and `<frame src>` target.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Number of leading bytes searched for a `<meta>` charset declaration
const SNIFF_LENGTH: usize = 1024;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title, empty when missing
    pub title: String,

    /// Absolute http(s) links without fragments, in document order
    pub links: Vec<String>,
}

/// Decodes an HTML body to text
///
/// Malformed sequences are replaced rather than rejected.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = detect_encoding(bytes, content_type);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Picks the encoding of a body
pub fn detect_encoding(bytes: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some(encoding) = content_type
        .and_then(charset_parameter)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return encoding;
    }

    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    if let Some(encoding) = sniff_meta_charset(bytes) {
        return encoding;
    }

    if std::str::from_utf8(bytes).is_ok() {
        UTF_8
    } else {
        WINDOWS_1252
    }
}

/// Extracts the `charset=` value of a header or meta content string
fn charset_parameter(value: &str) -> Option<String> {
    let lower = value.to_lowercase();
    let start = lower.find("charset=")? + "charset=".len();
    let label: String = lower[start..]
        .trim_start_matches(['"', '\'', ' '])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        .collect();

    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(SNIFF_LENGTH)];
    let head = String::from_utf8_lossy(head);
    let encoding =
        charset_parameter(&head).and_then(|label| Encoding::for_label(label.as_bytes()))?;

    // A document that could be read as ASCII to find the declaration is not UTF-16
    if encoding == UTF_16LE || encoding == UTF_16BE {
        Some(UTF_8)
    } else {
        Some(encoding)
    }
}

/// Parses HTML content and extracts the title and links
///
/// # Link Extraction Rules
///
/// - Targets come from `<a href>` and `<frameset><frame src>`
/// - Targets starting with `javascript` are skipped
/// - Targets are resolved against `<head><base href>` when present, else `page_url`
/// - Fragments are stripped; only `http` and `https` results are kept
/// - The page's own URL and repeated targets are dropped
///
/// # Example
///
/// ```
/// use site_mapper::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page#top">Link</a></body></html>"#;
/// let parsed = parse_html(html, "http://example.com/");
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links, vec!["http://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, page_url: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let title = extract_title(&document);

    let Ok(page) = Url::parse(page_url) else {
        return ParsedPage {
            title,
            links: Vec::new(),
        };
    };
    let base = extract_base(&document).unwrap_or_else(|| page.clone());

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for target in raw_targets(&document) {
        if let Some(link) = resolve_link(&target, &base) {
            if link != page.as_str() && seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    ParsedPage { title, links }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("head > title") else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Reads `<head><base href>`, trimmed of spaces and slashes
///
/// A base without a scheme is taken as `http://`.
fn extract_base(document: &Html) -> Option<Url> {
    let selector = Selector::parse("head > base[href]").ok()?;
    let href = document.select(&selector).next()?.value().attr("href")?;

    let href = href.trim_matches(|c: char| c == ' ' || c == '/');
    if href.is_empty() {
        return None;
    }

    let lower = href.to_lowercase();
    let absolute = if lower.starts_with("http://") || lower.starts_with("https://") {
        href.to_string()
    } else {
        format!("http://{}", href)
    };

    Url::parse(&absolute).ok()
}

fn raw_targets(document: &Html) -> Vec<String> {
    let mut targets = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        targets.extend(
            document
                .select(&selector)
                .filter_map(|e| e.value().attr("href"))
                .map(String::from),
        );
    }

    if let Ok(selector) = Selector::parse("frameset > frame[src]") {
        targets.extend(
            document
                .select(&selector)
                .filter_map(|e| e.value().attr("src"))
                .map(String::from),
        );
    }

    targets
}

/// Resolves a link target to an absolute http(s) URL without fragment
fn resolve_link(target: &str, base: &Url) -> Option<String> {
    let trimmed = target.trim();
    if trimmed.is_empty() || trimmed.to_lowercase().starts_with("javascript") {
        return None;
    }

    let mut url = base.join(trimmed).ok()?;
    url.set_fragment(None);

    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        _ => None,
    }
}
