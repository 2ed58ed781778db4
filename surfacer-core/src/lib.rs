pub mod annotate;
pub mod map;
pub mod model;
pub mod report;

pub use annotate::{attach_findings, Finding, NodeAnnotations};
pub use map::{build_hierarchy, url_to_tree};
pub use model::{Edge, EdgeType, GraphBuilder, Node, NodeType, SiteGraph};
pub use report::{
    extract_url_path, generate_discovery_report, load_json, save_json, ReportEnvelope,
    ReportFormat,
};

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
                      ____
   _______  ______  / __/___ _________  _____
  / ___/ / / / __/ / /_/ __ `/ ___/ _ \/ ___/
 (__  ) /_/ / /   / __/ /_/ / /__/  __/ /
/____/\__,_/_/   /_/  \__,_/\___/\___/_/
"#;
    println!("{}", banner.cyan());
    println!(
        "{} {}",
        "surfacer".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("{}\n", "web surface discovery and mapping".dimmed());
}
