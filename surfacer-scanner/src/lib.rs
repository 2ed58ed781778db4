pub mod classify;
pub mod crawler;
pub mod discovery;
pub mod error;
pub mod links;
pub mod render;
pub mod scripts;

pub use classify::{apex_of, classify_url, normalize_url, should_graph, UrlKind};
pub use crawler::{seed_urls_for, CrawlConfig, Crawler, FetchOutcome, SkipReason};
pub use discovery::DiscoveryResult;
pub use error::ScanError;
pub use render::{Rendered, Renderer};
pub use scripts::{ScriptAnalysisConfig, ScriptEndpoints};
