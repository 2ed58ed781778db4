//! Vulnerability finding attachment.
//!
//! Findings from an external scan are attached to graph nodes after the
//! build: by exact host for host nodes, and by longest matching path prefix
//! for path nodes. Attachment is additive and idempotent; it never changes
//! node identity or the edge set.

use crate::model::SiteGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Identifier of the check that produced this finding.
    pub template: String,
    pub name: String,
    pub severity: String,
    /// The URL the finding matched at.
    pub url: String,
}

/// Findings keyed by node identity, stored beside the graph rather than
/// inside it so repeated annotation passes cannot disturb the node set.
pub type NodeAnnotations = BTreeMap<String, Vec<Finding>>;

/// Reduce a matched URL to the `host/path` form node identities use.
fn normalize_matched(matched: &str) -> Option<String> {
    let candidate = if matched.starts_with("http://") || matched.starts_with("https://") {
        matched.to_string()
    } else {
        format!("http://{}", matched.trim())
    };
    let parsed = Url::parse(&candidate).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let path = parsed.path().trim_end_matches('/');
    if path.is_empty() {
        Some(host)
    } else {
        Some(format!("{}{}", host, path))
    }
}

/// True when `value` is a whole-segment prefix of `normalized`.
fn is_path_prefix(normalized: &str, value: &str) -> bool {
    normalized == value
        || (normalized.starts_with(value) && normalized.as_bytes().get(value.len()) == Some(&b'/'))
}

fn push_unique(annotations: &mut NodeAnnotations, node_id: &str, finding: &Finding) {
    let entries = annotations.entry(node_id.to_string()).or_default();
    let already = entries
        .iter()
        .any(|f| f.template == finding.template && f.url == finding.url);
    if !already {
        entries.push(finding.clone());
    }
}

/// Attach findings to the graph's nodes.
///
/// Each finding lands on its exact-host node (when present) and on the
/// longest path node whose value is a whole-segment prefix of the matched
/// URL. Findings with the same template and URL are merged, so re-running
/// the pass over the same input changes nothing.
pub fn attach_findings(
    annotations: &mut NodeAnnotations,
    graph: &SiteGraph,
    findings: &[Finding],
) {
    for finding in findings {
        let Some(normalized) = normalize_matched(&finding.url) else {
            debug!("unmatchable finding URL: {}", finding.url);
            continue;
        };
        let host = normalized.split('/').next().unwrap_or(&normalized);

        if graph.node(host).is_some() {
            push_unique(annotations, host, finding);
        }

        let best_path = graph
            .nodes
            .iter()
            .filter(|n| n.id.contains('/') && is_path_prefix(&normalized, &n.id))
            .max_by_key(|n| n.id.len());
        if let Some(node) = best_path {
            push_unique(annotations, &node.id, finding);
        }
    }
}
