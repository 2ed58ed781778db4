use anyhow::{anyhow, Context};
use clap::ArgMatches;
use commands::command_argument_builder;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use surfacer_core::{
    attach_findings, build_hierarchy, generate_discovery_report, load_json, print_banner,
    save_json, url_to_tree, Finding, NodeAnnotations, ReportEnvelope, ReportFormat, SiteGraph,
};
use surfacer_scanner::{
    apex_of, seed_urls_for, CrawlConfig, Crawler, DiscoveryResult, ScriptAnalysisConfig,
};

mod commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return Ok(());
    }

    match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command, quiet).await,
        Some(("map", primary_command)) => handle_map(primary_command),
        Some(("tree", primary_command)) => handle_tree(primary_command),
        Some(("annotate", primary_command)) => handle_annotate(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let target = sub_matches
        .get_one::<String>("TARGET")
        .ok_or_else(|| anyhow!("missing target"))?;
    let format = report_format(sub_matches)?;
    let output = sub_matches.get_one::<PathBuf>("output");

    let script_analysis = script_config(sub_matches)?;
    let mut config = CrawlConfig {
        max_pages: *sub_matches.get_one::<usize>("max-pages").unwrap_or(&60),
        max_depth: *sub_matches.get_one::<usize>("depth").unwrap_or(&1),
        timeout: Duration::from_secs(*sub_matches.get_one::<u64>("timeout").unwrap_or(&8)),
        rate_limit: Duration::from_millis(
            *sub_matches.get_one::<u64>("rate-limit-ms").unwrap_or(&300),
        ),
        script_analysis: Some(script_analysis),
        ..CrawlConfig::default()
    };
    if let Some(terms) = sub_matches.get_one::<String>("seed-queries") {
        config.seed_queries = terms
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }

    if sub_matches.get_flag("headless") && !quiet {
        println!("Note: no headless renderer is bundled; crawling without browser rendering.\n");
    }

    let (host, start_urls) = seed_urls_for(target)?;
    let apex = apex_of(&host);

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .context("invalid spinner template")?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Crawling {} (apex {})", target, apex));
        pb
    };

    let mut crawler = Crawler::new(&apex, config)?;
    let discovered = crawler.crawl(&start_urls).await;
    spinner.finish_and_clear();

    if !quiet && !crawler.skipped().is_empty() {
        println!("Skipped {} URLs:", crawler.skipped().len());
        for (url, reason) in crawler.skipped() {
            println!("  {:?} {}", reason, url);
        }
        println!();
    }

    let graph = build_hierarchy(&discovered);
    let envelope = ReportEnvelope::new(target, &apex, discovered, graph);

    match format {
        ReportFormat::Text => write_or_print(output, &generate_discovery_report(&envelope)),
        ReportFormat::Json => match output {
            Some(path) => {
                save_json(&expand_path(path), &envelope)?;
                if !quiet {
                    println!("Saved crawl artifact to {}", path.display());
                }
                Ok(())
            }
            None => {
                println!("{}", serde_json::to_string_pretty(&envelope)?);
                Ok(())
            }
        },
    }
}

fn handle_map(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let input = sub_matches
        .get_one::<PathBuf>("input")
        .ok_or_else(|| anyhow!("missing input path"))?;
    let output = sub_matches.get_one::<PathBuf>("output");

    let discovered = load_discovery(&expand_path(input))
        .with_context(|| format!("failed to load {}", input.display()))?;
    let graph = build_hierarchy(&discovered);
    write_or_print(output, &serde_json::to_string_pretty(&graph)?)
}

fn handle_tree(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let urls: Vec<&String> = sub_matches
        .get_many::<String>("URLS")
        .map(|vals| vals.collect())
        .unwrap_or_default();
    let format = report_format(sub_matches)?;

    for url in urls {
        let tree = url_to_tree(url);
        match format {
            ReportFormat::Text => print!("{}", render_tree_text(&tree)),
            ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&tree)?),
        }
    }
    Ok(())
}

fn handle_annotate(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let graph_path = sub_matches
        .get_one::<PathBuf>("graph")
        .ok_or_else(|| anyhow!("missing graph path"))?;
    let findings_path = sub_matches
        .get_one::<PathBuf>("findings")
        .ok_or_else(|| anyhow!("missing findings path"))?;
    let output = sub_matches.get_one::<PathBuf>("output");

    let graph = load_graph(&expand_path(graph_path))
        .with_context(|| format!("failed to load {}", graph_path.display()))?;
    let findings: Vec<Finding> = load_json(&expand_path(findings_path))
        .with_context(|| format!("failed to load {}", findings_path.display()))?;

    let mut annotations = NodeAnnotations::new();
    attach_findings(&mut annotations, &graph, &findings);
    write_or_print(output, &serde_json::to_string_pretty(&annotations)?)
}

fn report_format(sub_matches: &ArgMatches) -> anyhow::Result<ReportFormat> {
    let raw = sub_matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    ReportFormat::from_str(raw).ok_or_else(|| anyhow!("unsupported format: {}", raw))
}

fn script_config(sub_matches: &ArgMatches) -> anyhow::Result<ScriptAnalysisConfig> {
    let mut script = ScriptAnalysisConfig {
        max_scripts: *sub_matches.get_one::<usize>("max-js").unwrap_or(&5),
        max_size_kb: *sub_matches.get_one::<usize>("max-js-size-kb").unwrap_or(&512),
        ..ScriptAnalysisConfig::default()
    };
    if let Some(pattern) = sub_matches.get_one::<String>("js-allow") {
        script.allow = Some(Regex::new(pattern).context("invalid --js-allow pattern")?);
    }
    if let Some(pattern) = sub_matches.get_one::<String>("js-deny") {
        script.deny = Some(Regex::new(pattern).context("invalid --js-deny pattern")?);
    }
    Ok(script)
}

/// Accept either a full crawl artifact or a bare discovery result.
fn load_discovery(path: &Path) -> anyhow::Result<DiscoveryResult> {
    if let Ok(envelope) = load_json::<ReportEnvelope>(path) {
        return Ok(envelope.discovered);
    }
    Ok(load_json::<DiscoveryResult>(path)?)
}

/// Accept either a full crawl artifact or a bare graph.
fn load_graph(path: &Path) -> anyhow::Result<SiteGraph> {
    if let Ok(envelope) = load_json::<ReportEnvelope>(path) {
        return Ok(envelope.graph);
    }
    Ok(load_json::<SiteGraph>(path)?)
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

fn write_or_print(output: Option<&PathBuf>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let expanded = expand_path(path);
            fs::write(&expanded, content)
                .with_context(|| format!("failed to write {}", expanded.display()))?;
            Ok(())
        }
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

/// Indented text rendering of a containment tree.
fn render_tree_text(graph: &SiteGraph) -> String {
    let mut out = String::new();
    let roots: Vec<&str> = graph
        .nodes
        .iter()
        .filter(|n| !graph.relationships.iter().any(|e| e.target == n.id))
        .map(|n| n.id.as_str())
        .collect();
    for root in roots {
        render_subtree(graph, root, 0, &mut out);
    }
    out
}

fn render_subtree(graph: &SiteGraph, id: &str, depth: usize, out: &mut String) {
    if let Some(node) = graph.node(id) {
        let label = node.id.rsplit('/').next().unwrap_or(&node.id);
        out.push_str(&format!(
            "{}{} [{}]\n",
            "  ".repeat(depth),
            if depth == 0 { node.id.as_str() } else { label },
            node.node_type.as_str()
        ));
    }
    for edge in graph.relationships.iter().filter(|e| e.source == id) {
        render_subtree(graph, &edge.target, depth + 1, out);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
