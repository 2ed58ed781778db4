// Report generation from a crawl's discovery result and graph

use crate::model::SiteGraph;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use surfacer_scanner::DiscoveryResult;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// The serialized artifact downstream importers consume: the flat discovery
/// buckets plus the hierarchical graph, under one envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEnvelope {
    pub target: String,
    pub apex: String,
    pub generated_at: i64,
    pub discovered: DiscoveryResult,
    pub graph: SiteGraph,
}

impl ReportEnvelope {
    pub fn new(target: &str, apex: &str, discovered: DiscoveryResult, graph: SiteGraph) -> Self {
        Self {
            target: target.to_string(),
            apex: apex.to_string(),
            generated_at: chrono::Utc::now().timestamp(),
            discovered,
            graph,
        }
    }
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Render a human-readable crawl report, grouped by host.
pub fn generate_discovery_report(envelope: &ReportEnvelope) -> String {
    let d = &envelope.discovered;
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str(&format!("# Target: {} (apex {})\n\n", envelope.target, envelope.apex));
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Pages crawled: {}\n", d.pages_crawled));
    report.push_str(&format!("  Subdomains: {}\n", d.subdomains.len()));
    report.push_str(&format!("  Pages: {}\n", d.pages.len()));
    report.push_str(&format!("  API endpoints: {}\n", d.api.len()));
    report.push_str(&format!("  Inferred routes: {}\n", d.routes.len()));
    report.push_str(&format!("  Assets: {}\n", d.assets.len()));
    report.push_str(&format!("  Feeds: {}\n", d.feeds.len()));
    report.push_str(&format!("  Scripts analyzed: {}\n", d.js_files.len()));
    report.push_str(&format!(
        "  Graph: {} nodes, {} relationships\n",
        envelope.graph.nodes.len(),
        envelope.graph.relationships.len()
    ));
    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    // Group the graphable URLs by host
    let mut by_host: BTreeMap<String, Vec<&String>> = BTreeMap::new();
    for url in &d.urls {
        if let Ok(parsed) = Url::parse(url)
            && let Some(host) = parsed.host_str()
        {
            by_host.entry(host.to_string()).or_default().push(url);
        }
    }

    for (host, urls) in &by_host {
        report.push_str(&format!("## {}\n", host));
        report.push_str(&format!("  {} paths found\n\n", urls.len()));
        for url in urls {
            report.push_str(&format!("  {}\n", extract_url_path(url)));
        }
        report.push('\n');
    }

    if !d.subdomains.is_empty() {
        report.push_str("## Subdomains\n");
        for host in &d.subdomains {
            report.push_str(&format!("  {}\n", host));
        }
        report.push('\n');
    }

    report
}

/// Write any serializable artifact as pretty JSON.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(path, json)
}

/// Load a previously saved JSON artifact.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> std::io::Result<T> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
