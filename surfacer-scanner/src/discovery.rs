//! The per-run discovery record.

use crate::classify::normalize_url;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything one crawl run discovered, deduplicated by normalized URL
/// string. Field names are part of the downstream contract; importers key on
/// them. An empty result is a valid, well-formed output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// Count of URLs dequeued and attempted this run.
    pub pages_crawled: usize,
    /// Hostnames under the apex, excluding the apex itself.
    pub subdomains: BTreeSet<String>,
    /// Host -> first-level path segments observed for same-host links; a
    /// coarse one-level site map independent of the full hierarchy.
    pub directories_by_host: BTreeMap<String, BTreeSet<String>>,
    /// The graphable set: pages, API endpoints and inferred routes.
    pub urls: BTreeSet<String>,
    pub pages: BTreeSet<String>,
    pub api: BTreeSet<String>,
    pub feeds: BTreeSet<String>,
    pub assets: BTreeSet<String>,
    /// Paths inferred from script analysis or hash navigation, never directly
    /// observed as hyperlinks.
    pub routes: BTreeSet<String>,
    /// Script URLs that were actually analyzed.
    pub js_files: BTreeSet<String>,
    /// Network calls observed only via headless rendering.
    pub requests: BTreeSet<String>,
    /// Synthetic search URLs built from seed query terms; recorded, never
    /// fetched.
    pub query_urls: BTreeSet<String>,
}

impl DiscoveryResult {
    /// Normalize every URL bucket and derive `urls` as pages, API endpoints
    /// and routes. Safe to call repeatedly; normalization is idempotent.
    pub fn finalize(&mut self) {
        self.pages = normalize_set(&self.pages);
        self.api = normalize_set(&self.api);
        self.feeds = normalize_set(&self.feeds);
        self.assets = normalize_set(&self.assets);
        self.routes = normalize_set(&self.routes);
        self.query_urls = normalize_set(&self.query_urls);
        self.urls = self
            .pages
            .union(&self.routes)
            .cloned()
            .chain(self.api.iter().cloned())
            .collect();
    }
}

fn normalize_set(urls: &BTreeSet<String>) -> BTreeSet<String> {
    urls.iter().filter_map(|u| normalize_url(u, u)).collect()
}

/// Build synthetic query URLs against a fetched page, surfacing likely search
/// endpoints for later out-of-band scanning without spending crawl budget.
pub fn build_query_urls(base_url: &str, seeds: &[String]) -> Vec<String> {
    let mut urls = Vec::new();
    for seed in seeds {
        let seed = seed.trim();
        if seed.is_empty() {
            continue;
        }
        if base_url.contains('?') {
            urls.push(format!("{}&query={}", base_url, seed));
        } else {
            urls.push(format!("{}?query={}", base_url, seed));
        }
    }
    urls
}
