//! Hierarchical surface graph assembly.
//!
//! Folds a flat discovery result into a tree: host root, nested directory
//! segments, terminal endpoint leaves, joined by `contains` edges. The merge
//! is monotonic and order independent; building twice from the same input
//! yields an identical node and edge set.

use crate::model::{GraphBuilder, NodeType, SiteGraph};
use surfacer_scanner::apex_of;
use surfacer_scanner::DiscoveryResult;
use url::Url;

/// Extensions that mark a terminal path segment as a concrete endpoint
/// rather than a directory.
const FILE_EXTS: &[&str] = &[
    "html", "htm", "php", "asp", "aspx", "jsp", "js", "css", "png", "jpg", "jpeg", "gif", "svg",
    "ico", "pdf", "xml", "json", "txt", "csv", "zip", "gz", "tar", "rar", "7z", "mp4", "woff",
    "woff2", "ttf", "eot",
];

fn host_node_type(host: &str) -> NodeType {
    if host == apex_of(host) {
        NodeType::Domain
    } else {
        NodeType::Subdomain
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn is_file_segment(segment: &str) -> bool {
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => FILE_EXTS.contains(&ext.to_lowercase().as_str()),
        _ => false,
    }
}

/// Walk path segments under a host, creating the cumulative-prefix node chain
/// and one `contains` edge per step. The terminal segment becomes an
/// `Endpoint` only when asked to classify leaves and it looks file-like.
fn walk_segments(builder: &mut GraphBuilder, host: &str, segments: &[&str], classify_leaf: bool) {
    let mut prev = host.to_string();
    let mut cumulative = String::new();
    for (i, segment) in segments.iter().enumerate() {
        cumulative.push('/');
        cumulative.push_str(segment);
        let value = format!("{}{}", host, cumulative);
        let is_last = i == segments.len() - 1;
        let node_type = if classify_leaf && is_last && is_file_segment(segment) {
            NodeType::Endpoint
        } else {
            NodeType::Directory
        };
        builder.add_node(&value, node_type);
        builder.add_edge(&prev, &value);
        prev = value;
    }
}

/// Build the hierarchical graph from one discovery result.
///
/// Only the graphable `urls` set (pages, API endpoints and inferred routes)
/// and the one-level directory hints contribute structure; assets and feeds
/// stay out of the hierarchy, they clutter the tree without adding navigable
/// paths.
pub fn build_hierarchy(discovered: &DiscoveryResult) -> SiteGraph {
    let mut builder = GraphBuilder::new();

    for host in &discovered.subdomains {
        builder.add_node(host, host_node_type(host));
    }

    // Coarse one-level site map shares the node keyspace with the full walk,
    // so a prefix reachable both ways collapses into a single node.
    for (host, dirs) in &discovered.directories_by_host {
        builder.add_node(host, host_node_type(host));
        for dir in dirs {
            walk_segments(&mut builder, host, &split_segments(dir), false);
        }
    }

    for raw in &discovered.urls {
        let Ok(parsed) = Url::parse(raw) else {
            continue;
        };
        let Some(host) = parsed.host_str().map(|h| h.to_lowercase()) else {
            continue;
        };
        builder.add_node(&host, host_node_type(&host));

        let segments = split_segments(parsed.path());
        if segments.is_empty() {
            // A bare host with a query string still yields exactly one
            // synthetic leaf so the query surface stays visible.
            if let Some(query) = parsed.query()
                && !query.is_empty()
            {
                let leaf = format!("{}/?{}", host, query);
                builder.add_node(&leaf, NodeType::Endpoint);
                builder.add_edge(&host, &leaf);
            }
            continue;
        }
        walk_segments(&mut builder, &host, &segments, true);
    }

    builder.finish()
}

/// Build the tree for a single URL, without a discovery result.
///
/// Same key construction as the full hierarchy so outputs can be merged by
/// identity. Terminal typing follows the canonical rule (extensioned leaf is
/// an `Endpoint`); the legacy `file` label is intentionally not produced.
pub fn url_to_tree(url: &str) -> SiteGraph {
    let normalized = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url.trim())
    };

    let mut builder = GraphBuilder::new();
    if let Ok(parsed) = Url::parse(&normalized)
        && let Some(host) = parsed.host_str().map(|h| h.to_lowercase())
    {
        builder.add_node(&host, host_node_type(&host));
        walk_segments(&mut builder, &host, &split_segments(parsed.path()), true);
    }
    builder.finish()
}
