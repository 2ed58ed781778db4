//! Breadth-first, scope-bounded crawl frontier.
//!
//! One `Crawler` owns the state for exactly one run: frontier queue, visited
//! set, and discovery accumulators all live and die with the instance, so
//! independent hosts can be crawled from isolated instances. Fetches happen
//! one at a time in frontier order with a fixed delay between them; there is
//! no parallel fan-out, which keeps request ordering and rate limiting
//! predictable. No failure in here aborts a run; the worst outcome is a
//! partial discovery result.

use crate::classify::{classify_url, normalize_url, should_graph, UrlKind};
use crate::discovery::{build_query_urls, DiscoveryResult};
use crate::error::{Result, ScanError};
use crate::links::{extract_links, extract_search_targets, resolve_link};
use crate::render::{Renderer, MAX_CAPTURED_REQUESTS};
use crate::scripts::{discover_script_routes, ScriptAnalysisConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Why a dequeued URL was skipped instead of processed. Skips are recorded,
/// not swallowed, so they stay observable and testable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Connection error or timeout.
    RequestFailed,
    /// Response status was 400 or above.
    ErrorStatus(u16),
    /// Neither the declared content type nor the body indicate HTML.
    NotHtml,
    /// A redirect chain left the crawl scope.
    OutOfScope,
}

/// Outcome of one fetch attempt. Never an error; a failed fetch is a skip.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched { final_url: String, body: String },
    Skipped(SkipReason),
}

/// Parameters for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Budget on dequeued URLs; the primary defense against link farms.
    pub max_pages: usize,
    pub max_depth: usize,
    pub timeout: Duration,
    /// Fixed delay between fetches. Zero disables throttling.
    pub rate_limit: Duration,
    pub user_agent: String,
    /// Script analysis limits, or None to disable the pass entirely.
    pub script_analysis: Option<ScriptAnalysisConfig>,
    /// Seed terms for synthetic query URLs.
    pub seed_queries: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 60,
            max_depth: 1,
            timeout: Duration::from_secs(8),
            rate_limit: Duration::from_millis(300),
            user_agent: "Surfacer/0.1 (https://github.com/trapdoorsec/surfacer)".to_string(),
            script_analysis: Some(ScriptAnalysisConfig::default()),
            seed_queries: Vec::new(),
        }
    }
}

pub struct Crawler {
    client: Client,
    apex: String,
    /// `"." + apex`, precomputed for the per-link scope check.
    scope_suffix: String,
    config: CrawlConfig,
    renderer: Option<Arc<dyn Renderer>>,
    skipped: Vec<(String, SkipReason)>,
}

impl Crawler {
    /// Build a crawler for one run against `apex` and its subdomains.
    pub fn new(apex: impl Into<String>, config: CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .connect_timeout(config.timeout / 2)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        let apex = apex.into().to_lowercase();
        Ok(Self {
            client,
            scope_suffix: format!(".{}", apex),
            apex,
            config,
            renderer: None,
            skipped: Vec::new(),
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// URLs that were dequeued but skipped, with their reasons.
    pub fn skipped(&self) -> &[(String, SkipReason)] {
        &self.skipped
    }

    fn in_scope_host(&self, host: &str) -> bool {
        host == self.apex || host.ends_with(&self.scope_suffix)
    }

    fn in_scope_url(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| self.in_scope_host(&h.to_lowercase())))
            .unwrap_or(false)
    }

    /// Run the breadth-first crawl from the given absolute seed URLs.
    ///
    /// Every URL is attempted at most once; there are no retries. The loop
    /// ends when the frontier drains or the page budget is spent.
    pub async fn crawl(&mut self, start_urls: &[String]) -> DiscoveryResult {
        info!("starting crawl of {:?} (apex {})", start_urls, self.apex);

        let mut out = DiscoveryResult::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, usize)> = start_urls
            .iter()
            .map(|u| (u.clone(), 0usize))
            .collect();

        while visited.len() < self.config.max_pages {
            let Some((url, depth)) = queue.pop_front() else {
                break;
            };
            // Marked visited at dequeue, before the fetch, so a slow or
            // failing fetch can never cause duplicate re-processing.
            if !visited.insert(url.clone()) {
                continue;
            }

            let (final_url, body) = match self.fetch_page(&url).await {
                FetchOutcome::Fetched { final_url, body } => (final_url, body),
                FetchOutcome::Skipped(reason) => {
                    debug!("skipping {url}: {reason:?}");
                    self.skipped.push((url, reason));
                    continue;
                }
            };

            out.pages.insert(final_url.clone());
            let mut links = extract_links(&body, &final_url);

            for query_url in build_query_urls(&final_url, &self.config.seed_queries) {
                out.query_urls.insert(query_url.clone());
                out.pages.insert(query_url);
            }

            for target in extract_search_targets(&body) {
                if let Some(candidate) = resolve_link(&final_url, &target)
                    && self.in_scope_url(&candidate)
                {
                    out.pages.insert(candidate);
                }
            }

            if let Some(script_config) = self.config.script_analysis.clone() {
                self.analyze_scripts(&body, &final_url, &script_config, &mut out)
                    .await;
            }

            if let Some(renderer) = self.renderer.clone() {
                match renderer.render(&final_url).await {
                    Ok(rendered) => {
                        if !rendered.html.is_empty() {
                            links.extend(extract_links(&rendered.html, &final_url));
                        }
                        for request in rendered.requests.into_iter().take(MAX_CAPTURED_REQUESTS) {
                            if self.in_scope_url(&request) {
                                out.requests.insert(request);
                            }
                        }
                    }
                    Err(e) => warn!("headless render failed for {final_url}: {e}"),
                }
            }

            for link in links {
                self.route_link(&link, depth, &visited, &mut queue, &mut out);
            }

            if !self.config.rate_limit.is_zero() {
                tokio::time::sleep(self.config.rate_limit).await;
            }
        }

        out.pages_crawled = visited.len();
        out.finalize();
        info!(
            "crawl complete: {} pages visited, {} skipped",
            out.pages_crawled,
            self.skipped.len()
        );
        out
    }

    /// Classify one extracted link and fold it into the discovery buckets,
    /// enqueueing it when it is a page or API within the depth limit.
    fn route_link(
        &self,
        link: &str,
        depth: usize,
        visited: &HashSet<String>,
        queue: &mut VecDeque<(String, usize)>,
        out: &mut DiscoveryResult,
    ) {
        let Ok(parsed) = Url::parse(link) else {
            return;
        };
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return;
        }
        let Some(host) = parsed.host_str().map(|h| h.to_lowercase()) else {
            return;
        };
        // Scope violations are filtered, never recorded: this is the crawl
        // boundary, not an error.
        if !self.in_scope_host(&host) {
            return;
        }

        let kind = classify_url(link);
        match kind {
            UrlKind::Asset => out.assets.insert(link.to_string()),
            UrlKind::Feed => out.feeds.insert(link.to_string()),
            UrlKind::Api => out.api.insert(link.to_string()),
            UrlKind::Page => out.pages.insert(link.to_string()),
        };

        if host != self.apex {
            out.subdomains.insert(host);
        } else if should_graph(kind)
            && let Some(segment) = parsed.path().split('/').find(|s| !s.is_empty())
        {
            out.directories_by_host
                .entry(host)
                .or_default()
                .insert(format!("/{}", segment));
        }

        // Assets and feeds are recorded but never expand the frontier.
        if should_graph(kind) && depth < self.config.max_depth && !visited.contains(link) {
            queue.push_back((link.to_string(), depth + 1));
        }
    }

    async fn analyze_scripts(
        &self,
        body: &str,
        base_url: &str,
        config: &ScriptAnalysisConfig,
        out: &mut DiscoveryResult,
    ) {
        let (endpoints, scripts) =
            discover_script_routes(&self.client, body, base_url, config).await;
        out.js_files.extend(scripts);
        for bucket in [
            (endpoints.routes, &mut out.routes),
            (endpoints.api, &mut out.api),
            (endpoints.feeds, &mut out.feeds),
            (endpoints.assets, &mut out.assets),
        ] {
            let (found, target) = bucket;
            for u in found {
                if self.in_scope_url(&u) {
                    target.insert(u);
                }
            }
        }
    }

    /// Fetch one frontier URL, following redirects.
    async fn fetch_page(&self, url: &str) -> FetchOutcome {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("fetch failed for {url}: {e}");
                return FetchOutcome::Skipped(SkipReason::RequestFailed);
            }
        };

        let status = response.status().as_u16();
        if status >= 400 {
            return FetchOutcome::Skipped(SkipReason::ErrorStatus(status));
        }

        let final_url = response.url().to_string();
        if !self.in_scope_url(&final_url) {
            return FetchOutcome::Skipped(SkipReason::OutOfScope);
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                debug!("body read failed for {url}: {e}");
                return FetchOutcome::Skipped(SkipReason::RequestFailed);
            }
        };

        let html_like = content_type.contains("text/html") || body.to_lowercase().contains("<html");
        if !html_like {
            return FetchOutcome::Skipped(SkipReason::NotHtml);
        }

        let final_url = normalize_url(&final_url, &final_url).unwrap_or(final_url);
        FetchOutcome::Fetched { final_url, body }
    }
}

/// Build seed URLs for a target that may be a bare hostname: both schemes are
/// tried when none is given.
pub fn seed_urls_for(target: &str) -> Result<(String, Vec<String>)> {
    if target.starts_with("http://") || target.starts_with("https://") {
        let parsed = Url::parse(target)
            .map_err(|e| ScanError::InvalidUrl(format!("{target}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ScanError::InvalidUrl(format!("{target}: no host")))?
            .to_lowercase();
        Ok((host, vec![target.to_string()]))
    } else {
        let host = target.trim().trim_end_matches('/').to_lowercase();
        if host.is_empty() {
            return Err(ScanError::InvalidUrl("empty target".to_string()));
        }
        Ok((
            host.clone(),
            vec![format!("https://{host}"), format!("http://{host}")],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as ScanResult;
    use crate::render::{Rendered, Renderer};
    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> CrawlConfig {
        CrawlConfig {
            rate_limit: Duration::ZERO,
            script_analysis: None,
            ..Default::default()
        }
    }

    fn html_page(body_links: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string(format!("<html><body>{}</body></html>", body_links))
    }

    // The mock server binds to 127.0.0.1, so that is the test apex.
    fn test_crawler(config: CrawlConfig) -> Crawler {
        Crawler::new("127.0.0.1", config).unwrap()
    }

    #[test]
    fn test_scope_check_covers_subdomains_only() {
        let crawler = Crawler::new("example.com", test_config()).unwrap();
        assert!(crawler.in_scope_host("example.com"));
        assert!(crawler.in_scope_host("a.b.example.com"));
        assert!(!crawler.in_scope_host("evilexample.com"));
        assert!(!crawler.in_scope_host("example.com.evil.net"));
    }

    #[tokio::test]
    async fn test_depth_zero_records_but_never_follows() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(&format!(
                r#"<a href="{}/about">about</a>
                   <a href="https://other.com/x">ext</a>"#,
                mock_server.uri()
            )))
            .mount(&mock_server)
            .await;

        let mut config = test_config();
        config.max_depth = 0;
        let mut crawler = test_crawler(config);
        let result = crawler.crawl(&[mock_server.uri()]).await;

        // The same-scope link is recorded as a page but never fetched.
        assert!(result.pages.iter().any(|u| u.ends_with("/about")));
        assert_eq!(result.pages_crawled, 1);

        // The out-of-scope link appears in no bucket at all.
        let everything: Vec<&String> = result
            .pages
            .iter()
            .chain(&result.api)
            .chain(&result.assets)
            .chain(&result.feeds)
            .chain(&result.routes)
            .chain(&result.urls)
            .collect();
        assert!(everything.iter().all(|u| !u.contains("other.com")));
    }

    #[tokio::test]
    async fn test_page_budget_bounds_visited() {
        let mock_server = MockServer::start().await;
        let mut links = String::new();
        for i in 1..=5 {
            links.push_str(&format!(r#"<a href="{}/p{}">p</a>"#, mock_server.uri(), i));
        }
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(&links))
            .mount(&mock_server)
            .await;
        for i in 1..=5 {
            Mock::given(method("GET"))
                .and(path(format!("/p{}", i)))
                .respond_with(html_page(""))
                .mount(&mock_server)
                .await;
        }

        let mut config = test_config();
        config.max_pages = 2;
        let mut crawler = test_crawler(config);
        let result = crawler.crawl(&[mock_server.uri()]).await;

        assert_eq!(result.pages_crawled, 2);
    }

    #[tokio::test]
    async fn test_duplicate_seeds_visited_once() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(""))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut crawler = test_crawler(test_config());
        let result = crawler
            .crawl(&[mock_server.uri(), mock_server.uri()])
            .await;

        assert_eq!(result.pages_crawled, 1);
    }

    #[tokio::test]
    async fn test_skip_reasons_are_observable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(&format!(
                r#"<a href="{0}/gone">g</a><a href="{0}/data">d</a>"#,
                mock_server.uri()
            )))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/octet-stream")
                    .set_body_string("binary-ish"),
            )
            .mount(&mock_server)
            .await;

        let mut crawler = test_crawler(test_config());
        crawler.crawl(&[mock_server.uri()]).await;

        let reasons: Vec<&SkipReason> = crawler.skipped().iter().map(|(_, r)| r).collect();
        assert!(reasons.contains(&&SkipReason::ErrorStatus(404)));
        assert!(reasons.contains(&&SkipReason::NotHtml));
    }

    #[tokio::test]
    async fn test_connection_failure_is_skip_not_abort() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(""))
            .mount(&mock_server)
            .await;

        let mut config = test_config();
        config.timeout = Duration::from_secs(2);
        let mut crawler = test_crawler(config);
        // Port 9 (discard) is almost certainly closed; the run must survive.
        let dead = "http://127.0.0.1:9/".to_string();
        let result = crawler.crawl(&[dead.clone(), mock_server.uri()]).await;

        assert_eq!(result.pages_crawled, 2);
        assert!(crawler
            .skipped()
            .iter()
            .any(|(u, r)| u == &dead && *r == SkipReason::RequestFailed));
        assert!(!result.pages.is_empty());
    }

    #[tokio::test]
    async fn test_redirect_records_final_url() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/home"),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/home"))
            .respond_with(html_page(""))
            .mount(&mock_server)
            .await;

        let mut crawler = test_crawler(test_config());
        let result = crawler.crawl(&[mock_server.uri()]).await;

        assert!(result.pages.iter().any(|u| u.ends_with("/home")));
    }

    #[tokio::test]
    async fn test_assets_recorded_never_enqueued() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(&format!(
                r#"<img src="{0}/logo.png"><a href="{0}/feed/rss">r</a>"#,
                mock_server.uri()
            )))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut config = test_config();
        config.max_depth = 3;
        let mut crawler = test_crawler(config);
        let result = crawler.crawl(&[mock_server.uri()]).await;

        assert!(result.assets.iter().any(|u| u.ends_with("/logo.png")));
        assert!(result.feeds.iter().any(|u| u.ends_with("/feed/rss")));
        // Only the root was fetched; asset and feed stayed out of the queue.
        assert_eq!(result.pages_crawled, 1);
    }

    #[tokio::test]
    async fn test_seed_queries_recorded_not_fetched() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(""))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut config = test_config();
        config.seed_queries = vec!["sql".to_string(), "rce".to_string()];
        let mut crawler = test_crawler(config);
        let result = crawler.crawl(&[mock_server.uri()]).await;

        assert_eq!(result.query_urls.len(), 2);
        assert!(result
            .query_urls
            .iter()
            .any(|u| u.ends_with("?query=sql")));
        // Synthetic query URLs join the page set without spending budget.
        assert!(result.query_urls.iter().all(|u| result.pages.contains(u)));
        assert_eq!(result.pages_crawled, 1);
    }

    #[tokio::test]
    async fn test_directories_by_host_first_segment_only() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(&format!(
                r#"<a href="{0}/blog/2024/post">b</a>
                   <a href="{0}/api/v1/users">a</a>
                   <a href="{0}/img/x.png">i</a>"#,
                mock_server.uri()
            )))
            .mount(&mock_server)
            .await;

        let mut config = test_config();
        config.max_depth = 0;
        let mut crawler = test_crawler(config);
        let result = crawler.crawl(&[mock_server.uri()]).await;

        let dirs = result.directories_by_host.get("127.0.0.1").unwrap();
        assert!(dirs.contains("/blog"));
        assert!(dirs.contains("/api"));
        // Assets never contribute to the one-level site map.
        assert!(!dirs.contains("/img"));
    }

    #[tokio::test]
    async fn test_script_analysis_feeds_buckets() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(&format!(
                r#"<script src="{}/app.js"></script>"#,
                mock_server.uri()
            )))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/app.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r##"fetch('/api/v1/things'); go("#/admin/panel");"##,
            ))
            .mount(&mock_server)
            .await;

        let mut config = test_config();
        config.script_analysis = Some(ScriptAnalysisConfig {
            rate_limit: Duration::ZERO,
            ..Default::default()
        });
        let mut crawler = test_crawler(config);
        let result = crawler.crawl(&[mock_server.uri()]).await;

        assert!(result.api.iter().any(|u| u.ends_with("/api/v1/things")));
        assert!(result.routes.iter().any(|u| u.ends_with("/admin/panel")));
        assert!(result.js_files.iter().any(|u| u.ends_with("/app.js")));
        // Inferred routes are part of the graphable url set.
        assert!(result.urls.iter().any(|u| u.ends_with("/admin/panel")));
    }

    struct FakeRenderer {
        html: String,
        requests: Vec<String>,
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn render(&self, _url: &str) -> ScanResult<Rendered> {
            Ok(Rendered {
                html: self.html.clone(),
                requests: self.requests.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_headless_pass_merges_links_and_requests() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(""))
            .mount(&mock_server)
            .await;

        let renderer = FakeRenderer {
            html: format!(
                r#"<html><a href="{}/rendered-only">r</a></html>"#,
                mock_server.uri()
            ),
            requests: vec![
                format!("{}/api/xhr", mock_server.uri()),
                "https://tracker.example.net/beacon".to_string(),
            ],
        };

        let mut config = test_config();
        config.max_depth = 0;
        let mut crawler = test_crawler(config).with_renderer(Arc::new(renderer));
        let result = crawler.crawl(&[mock_server.uri()]).await;

        assert!(result.pages.iter().any(|u| u.ends_with("/rendered-only")));
        assert!(result.requests.iter().any(|u| u.ends_with("/api/xhr")));
        // Observed third-party calls stay out of every bucket.
        assert!(result.requests.iter().all(|u| !u.contains("tracker")));
    }

    #[tokio::test]
    async fn test_scope_invariant_across_all_buckets() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(&format!(
                r#"<a href="{0}/in">i</a>
                   <a href="https://evil.example.org/out">o</a>
                   <img src="https://cdn.example.org/pic.png">
                   <a href="https://dark.example.org/feed/rss">f</a>"#,
                mock_server.uri()
            )))
            .mount(&mock_server)
            .await;

        let mut crawler = test_crawler(test_config());
        let result = crawler.crawl(&[mock_server.uri()]).await;

        let all: Vec<&String> = result
            .pages
            .iter()
            .chain(&result.api)
            .chain(&result.assets)
            .chain(&result.feeds)
            .chain(&result.routes)
            .chain(&result.urls)
            .chain(&result.requests)
            .chain(&result.query_urls)
            .collect();
        for u in all {
            let host = Url::parse(u).unwrap().host_str().unwrap().to_string();
            assert_eq!(host, "127.0.0.1", "out of scope URL leaked: {u}");
        }
    }

    #[test]
    fn test_seed_urls_for_bare_host() {
        let (host, seeds) = seed_urls_for("Example.com").unwrap();
        assert_eq!(host, "example.com");
        assert_eq!(seeds, vec!["https://example.com", "http://example.com"]);
    }

    #[test]
    fn test_seed_urls_for_full_url() {
        let (host, seeds) = seed_urls_for("https://sub.example.com/start").unwrap();
        assert_eq!(host, "sub.example.com");
        assert_eq!(seeds, vec!["https://sub.example.com/start"]);
    }

    #[test]
    fn test_seed_urls_rejects_empty() {
        assert!(seed_urls_for("").is_err());
    }
}
