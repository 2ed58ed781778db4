//! Link extraction from fetched HTML.

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// Attributes that can carry a navigable reference.
const LINK_ATTRS: &[&str] = &["href", "src", "action", "data", "poster"];

static ATTR_FALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:href|src)\s*=\s*['"]([^'"]+)['"]"#).expect("valid regex")
});

static SEARCH_TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)"target"\s*:\s*"([^"]+)""#).expect("valid regex"));

/// Extract every absolute http(s) URL referenced by link-bearing attributes,
/// resolved against `base_url`.
///
/// Falls back to a permissive attribute-value pattern match when the
/// structured parse yields nothing. Malformed markup degrades to a partial or
/// empty set; this never fails.
pub fn extract_links(html: &str, base_url: &str) -> HashSet<String> {
    let mut urls = HashSet::new();

    let document = Html::parse_document(html);
    let any_element = Selector::parse("*").unwrap();
    for element in document.select(&any_element) {
        for attr in LINK_ATTRS {
            if let Some(value) = element.value().attr(attr)
                && let Some(absolute) = resolve_link(base_url, value)
            {
                urls.insert(absolute);
            }
        }
    }

    if urls.is_empty() {
        debug!("structured parse yielded no links for {base_url}, using pattern fallback");
        for capture in ATTR_FALLBACK_RE.captures_iter(html) {
            if let Some(absolute) = resolve_link(base_url, &capture[1]) {
                urls.insert(absolute);
            }
        }
    }

    urls
}

/// Harvest `"target": "..."` markers embedded in page payloads. These often
/// point at search endpoints that are never linked directly.
pub fn extract_search_targets(html: &str) -> Vec<String> {
    let targets: BTreeSet<String> = SEARCH_TARGET_RE
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect();
    targets.into_iter().collect()
}

/// Resolve a reference against a base URL, keeping only absolute http(s)
/// results. Pseudo-scheme and pure-fragment references are dropped, and the
/// fragment is stripped so it can never create a distinct entity.
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let base_url = Url::parse(base).ok()?;
    let mut resolved = base_url.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}
