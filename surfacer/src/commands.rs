use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("surfacer")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("surfacer")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a target and assemble its surface map. Discovers pages, API \
                endpoints, scripts and inferred routes within the target's apex scope.",
                )
                .arg(
                    arg!([TARGET])
                        .required(true)
                        .help("The URL or bare host to crawl"),
                )
                .arg(
                    arg!(--"max-pages" <NUM>)
                        .required(false)
                        .help("Maximum number of pages to fetch")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("60"),
                )
                .arg(
                    arg!(-d --"depth" <NUM>)
                        .required(false)
                        .help("Maximum link-following depth from the seeds")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("8"),
                )
                .arg(
                    arg!(--"rate-limit-ms" <MILLIS>)
                        .required(false)
                        .help("Pause between page fetches in milliseconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("300"),
                )
                .arg(
                    arg!(--"max-js" <NUM>)
                        .required(false)
                        .help("Maximum number of scripts to analyze per page")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(--"max-js-size-kb" <KB>)
                        .required(false)
                        .help("Skip scripts larger than this size")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("512"),
                )
                .arg(
                    arg!(--"js-allow" <REGEX>)
                        .required(false)
                        .help("Only analyze script URLs matching this pattern"),
                )
                .arg(
                    arg!(--"js-deny" <REGEX>)
                        .required(false)
                        .help("Never analyze script URLs matching this pattern"),
                )
                .arg(
                    arg!(--"seed-queries" <TERMS>)
                        .required(false)
                        .help("Comma-separated terms used to seed query-string URLs"),
                )
                .arg(
                    arg!(--"headless")
                        .required(false)
                        .help("Render pages in a headless browser before extraction (requires an external renderer)")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save the result to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("map")
                .about("Rebuild the hierarchical graph from a previously saved crawl artifact")
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(true)
                        .help("Path to a crawl artifact produced by `crawl --format json`")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save the graph JSON to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            command!("tree")
                .about("Print the containment tree for one or more URLs without crawling")
                .arg(
                    arg!(<URLS>)
                        .required(true)
                        .num_args(1..)
                        .help("URLs or bare hosts to expand into trees"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("annotate")
                .about(
                    "Attach external scan findings to a saved surface graph. Each finding \
                lands on its host node and the deepest matching path node.",
                )
                .arg(
                    arg!(-g --"graph" <PATH>)
                        .required(true)
                        .help("Path to a crawl artifact or bare graph JSON")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-F --"findings" <PATH>)
                        .required(true)
                        .help("Path to a JSON array of findings")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save the annotations JSON to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
