//! Optional headless-render seam.
//!
//! A renderer loads a page in a real browser engine and reports the rendered
//! DOM plus the network calls it observed, which static extraction cannot
//! see. The crawler treats any implementation as best-effort; a render
//! failure only costs that page its augmented discovery.

use crate::error::Result;
use async_trait::async_trait;

/// Ceiling on captured network requests per rendered page.
pub const MAX_CAPTURED_REQUESTS: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct Rendered {
    /// The post-render DOM serialization, empty if unavailable.
    pub html: String,
    /// Absolute URLs of network calls observed during the load.
    pub requests: Vec<String>,
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<Rendered>;
}
