//! Heuristic URL classification.
//!
//! Classification is a pure function of the URL's path and filename. It never
//! looks at fetch results, so the same URL string always gets the same kind.

use serde::{Deserialize, Serialize};
use url::Url;

/// Extensions that mark a URL as a static asset.
const ASSET_EXTS: &[&str] = &[
    "js", "css", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "woff", "woff2", "ttf",
    "eot", "map", "mp4", "webm", "mp3", "wav", "pdf", "zip", "gz", "tar", "rar", "7z", "xml",
    "txt", "json",
];

const ASSET_PATH_HINTS: &[&str] = &["/static/", "/assets/", "/images/", "/img/", "/fonts/", "/cdn-cgi/"];
const API_HINTS: &[&str] = &["/api/", "/graphql", "/v1/", "/v2/", "/search", "/query", "/autocomplete"];
const FEED_HINTS: &[&str] = &["/rss", "/atom"];
const ASSET_NAME_HINTS: &[&str] = &[
    "favicon",
    "apple-touch-icon",
    "manifest.json",
    "browserconfig.xml",
    "safari-pinned-tab.svg",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    Page,
    Api,
    Asset,
    Feed,
}

impl UrlKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlKind::Page => "page",
            UrlKind::Api => "api",
            UrlKind::Asset => "asset",
            UrlKind::Feed => "feed",
        }
    }
}

/// Classify a URL by path and filename heuristics.
///
/// Total: unparseable input falls back to `Page` so callers never have to
/// handle a classification failure. The rule order is load-bearing; asset
/// name hints must win over the generic extension rules so that e.g.
/// `manifest.json` is never routed to `Api` by its extension.
pub fn classify_url(url: &str) -> UrlKind {
    let Ok(parsed) = Url::parse(url) else {
        return UrlKind::Page;
    };
    let path = parsed.path().to_lowercase();
    let name = path.rsplit('/').next().unwrap_or("");

    if FEED_HINTS.iter().any(|h| path.ends_with(h)) {
        return UrlKind::Feed;
    }
    if name == "robots.txt" || name == "sitemap.xml" {
        return UrlKind::Page;
    }
    if ASSET_NAME_HINTS.iter().any(|h| name.contains(h)) {
        return UrlKind::Asset;
    }
    if ASSET_PATH_HINTS.iter().any(|h| path.contains(h)) {
        return UrlKind::Asset;
    }

    let ext = match path.rsplit_once('.') {
        Some((_, e)) => e,
        None => "",
    };
    if ext == "xml" || ext == "txt" {
        return UrlKind::Asset;
    }
    if ext == "json" {
        if API_HINTS.iter().any(|h| path.contains(h)) {
            return UrlKind::Api;
        }
        return UrlKind::Asset;
    }
    if ASSET_EXTS.contains(&ext) {
        return UrlKind::Asset;
    }

    if API_HINTS.iter().any(|h| path.contains(h)) {
        return UrlKind::Api;
    }
    UrlKind::Page
}

/// Only pages and APIs contribute to the hierarchical graph.
pub fn should_graph(kind: UrlKind) -> bool {
    matches!(kind, UrlKind::Page | UrlKind::Api)
}

/// Resolve a raw reference against a base URL and normalize it.
///
/// Protocol-relative references inherit the base scheme. The fragment is
/// stripped; a result without a scheme or host is rejected.
pub fn normalize_url(base: &str, raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let candidate = if let Some(rest) = raw.strip_prefix("//") {
        let scheme = Url::parse(base).ok()?.scheme().to_string();
        format!("{}://{}", scheme, rest)
    } else {
        raw.to_string()
    };
    let base_url = Url::parse(base).ok()?;
    let mut resolved = base_url.join(&candidate).ok()?;
    if !resolved.has_host() {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Naive registrable-domain extraction: the last two labels of the host.
/// IP literals pass through unchanged; multi-label public suffixes are out
/// of scope.
pub fn apex_of(host: &str) -> String {
    let host = host.to_lowercase();
    if host.parse::<std::net::IpAddr>().is_ok() {
        return host;
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() >= 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        host
    }
}
