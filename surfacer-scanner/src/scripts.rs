//! Script route extraction.
//!
//! Scripts referenced by a page are fetched (bounded in count and size) and
//! mined for endpoint candidates with four independent pattern families:
//! bare absolute URLs, network-call invocations, absolute-path string
//! literals, and hash-fragment client-side routes. Candidates resolve against
//! the page URL and are partitioned by the URL classifier; hash routes always
//! land in `routes` because they are client-side navigation, not server
//! resources.

use crate::classify::{classify_url, normalize_url, UrlKind};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

static BARE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s'"\\)]+"#).expect("valid regex"));

static NETWORK_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:fetch|axios\.(?:get|post|put|delete)|open)\s*\(\s*['"]([^'"]+)['"]"#)
        .expect("valid regex")
});

// Length-gated so short noise tokens like "/a" don't become routes.
static PATH_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"](/[^'"\s]{3,})['"]"#).expect("valid regex"));

static HASH_ROUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]#(/[^'"\s]+)['"]"#).expect("valid regex"));

/// Limits for the per-page script analysis pass.
#[derive(Debug, Clone)]
pub struct ScriptAnalysisConfig {
    /// Scripts analyzed per page, in document order after filtering.
    pub max_scripts: usize,
    /// Scripts larger than this are skipped outright, never truncated, to
    /// avoid partial-pattern false positives.
    pub max_size_kb: usize,
    pub timeout: Duration,
    pub rate_limit: Duration,
    pub allow: Option<Regex>,
    pub deny: Option<Regex>,
}

impl Default for ScriptAnalysisConfig {
    fn default() -> Self {
        Self {
            max_scripts: 5,
            max_size_kb: 512,
            timeout: Duration::from_secs(10),
            rate_limit: Duration::from_millis(300),
            allow: None,
            deny: None,
        }
    }
}

/// Resolved script candidates, partitioned by classifier output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEndpoints {
    pub routes: BTreeSet<String>,
    pub api: BTreeSet<String>,
    pub assets: BTreeSet<String>,
    pub feeds: BTreeSet<String>,
}

impl ScriptEndpoints {
    pub fn merge(&mut self, other: ScriptEndpoints) {
        self.routes.extend(other.routes);
        self.api.extend(other.api);
        self.assets.extend(other.assets);
        self.feeds.extend(other.feeds);
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.api.is_empty() && self.assets.is_empty() && self.feeds.is_empty()
    }
}

/// Collect absolute http(s) script URLs referenced by `<script src=...>`.
pub fn extract_script_urls(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let script_selector = Selector::parse("script[src]").unwrap();
    let mut urls = BTreeSet::new();

    for element in document.select(&script_selector) {
        if let Some(src) = element.value().attr("src")
            && let Ok(base) = Url::parse(base_url)
            && let Ok(resolved) = base.join(src.trim())
            && (resolved.scheme() == "http" || resolved.scheme() == "https")
        {
            urls.insert(resolved.to_string());
        }
    }

    urls.into_iter().collect()
}

/// Turn a raw in-script candidate into an absolute URL against the page base.
/// Protocol-relative candidates inherit the base scheme; hash routes resolve
/// as the path they navigate to. Anything else that is not absolute or
/// root-relative is rejected as noise.
fn resolve_candidate(raw: &str, base_url: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    if let Some(rest) = raw.strip_prefix("//") {
        let scheme = Url::parse(base_url).ok()?.scheme().to_string();
        return Some(format!("{}://{}", scheme, rest));
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }
    if let Some(route) = raw.strip_prefix("#/") {
        return Url::parse(base_url)
            .ok()?
            .join(&format!("/{}", route))
            .ok()
            .map(|u| u.to_string());
    }
    if raw.starts_with('/') {
        return Url::parse(base_url).ok()?.join(raw).ok().map(|u| u.to_string());
    }
    None
}

/// Mine one script body for endpoint candidates.
pub fn extract_script_endpoints(script: &str, base_url: &str) -> ScriptEndpoints {
    let mut candidates: BTreeSet<String> = BTreeSet::new();
    let mut out = ScriptEndpoints::default();

    for m in BARE_URL_RE.find_iter(script) {
        if let Some(u) = resolve_candidate(m.as_str(), base_url) {
            candidates.insert(u);
        }
    }
    for c in NETWORK_CALL_RE.captures_iter(script) {
        if let Some(u) = resolve_candidate(&c[1], base_url) {
            candidates.insert(u);
        }
    }
    for c in PATH_LITERAL_RE.captures_iter(script) {
        if let Some(u) = resolve_candidate(&c[1], base_url) {
            candidates.insert(u);
        }
    }
    // Hash routes are client-side navigation; they bypass the classifier.
    for c in HASH_ROUTE_RE.captures_iter(script) {
        if let Some(u) = resolve_candidate(&format!("#{}", &c[1]), base_url) {
            out.routes.insert(u);
        }
    }

    for candidate in candidates {
        let Some(normalized) = normalize_url(base_url, &candidate) else {
            continue;
        };
        match classify_url(&normalized) {
            UrlKind::Asset => out.assets.insert(normalized),
            UrlKind::Feed => out.feeds.insert(normalized),
            UrlKind::Api => out.api.insert(normalized),
            // Page-classified candidates were inferred, not observed as
            // hyperlinks, so they are tracked as routes.
            UrlKind::Page => out.routes.insert(normalized),
        };
    }

    out
}

/// Fetch one script body, enforcing the size ceiling.
async fn fetch_script(client: &Client, url: &str, config: &ScriptAnalysisConfig) -> Option<String> {
    let response = match client.get(url).timeout(config.timeout).send().await {
        Ok(r) => r,
        Err(e) => {
            debug!("script fetch failed for {url}: {e}");
            return None;
        }
    };
    if response.status().as_u16() >= 400 {
        debug!("script fetch for {url} returned {}", response.status());
        return None;
    }
    let body = response.text().await.ok()?;
    if body.len() > config.max_size_kb * 1024 {
        debug!("script {url} exceeds {} KiB, skipping", config.max_size_kb);
        return None;
    }
    Some(body)
}

/// Analyze the scripts referenced by a fetched page.
///
/// Returns the merged endpoint buckets plus the script URLs selected for
/// analysis. A script that fails to fetch or busts a limit contributes no
/// endpoints but still counts against the per-page budget.
pub async fn discover_script_routes(
    client: &Client,
    html: &str,
    base_url: &str,
    config: &ScriptAnalysisConfig,
) -> (ScriptEndpoints, Vec<String>) {
    let mut script_urls = extract_script_urls(html, base_url);
    if let Some(allow) = &config.allow {
        script_urls.retain(|u| allow.is_match(u));
    }
    if let Some(deny) = &config.deny {
        script_urls.retain(|u| !deny.is_match(u));
    }
    script_urls.truncate(config.max_scripts);

    let mut endpoints = ScriptEndpoints::default();
    for script_url in &script_urls {
        if let Some(body) = fetch_script(client, script_url, config).await {
            endpoints.merge(extract_script_endpoints(&body, base_url));
        }
        if !config.rate_limit.is_zero() {
            tokio::time::sleep(config.rate_limit).await;
        }
    }

    (endpoints, script_urls)
}
