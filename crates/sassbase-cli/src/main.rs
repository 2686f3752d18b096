#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use sassbase_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sassbase")]
#[command(author, version, about = "Resolve, rebase and inspect Sass import graphs", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Resolve a specifier to the stylesheet it names
    Resolve {
        /// Specifier as written in a stylesheet (e.g. "./partials/nav", "~bootstrap/scss/mixins")
        specifier: String,

        /// Stylesheet containing the specifier (defaults to the working directory)
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Resolve as an @import rather than @use/@forward
        #[arg(long)]
        import: bool,
    },

    /// Load a stylesheet with its url() references rebased
    Load {
        /// Stylesheet to load
        file: PathBuf,

        /// Entry stylesheet that anchors rebasing (defaults to the configured entry, then FILE)
        #[arg(long, value_name = "FILE")]
        entry: Option<PathBuf>,

        /// Write the rebased content here instead of stdout
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the import graph reachable from an entry stylesheet
    Graph {
        /// Entry stylesheet
        entry: PathBuf,
    },

    /// Resolve every entry stylesheet under a directory and report problems
    Check {
        /// Directory to scan (defaults to the working directory)
        dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Resolve {
            specifier,
            from,
            import,
        }) => {
            let span = tracing::info_span!("resolve", cmd = "resolve", cwd = %cwd.display());
            let _guard = span.enter();
            commands::resolve::run(&config, &specifier, from.as_deref(), import, cli.json)
        }
        Some(Commands::Load {
            file,
            entry,
            output,
        }) => {
            let span = tracing::info_span!("load", cmd = "load", cwd = %cwd.display());
            let _guard = span.enter();
            commands::load::run(
                &config,
                &file,
                entry.as_deref(),
                output.as_deref(),
                cli.json,
            )
        }
        Some(Commands::Graph { entry }) => {
            let span = tracing::info_span!("graph", cmd = "graph", cwd = %cwd.display());
            let _guard = span.enter();
            commands::graph::run(&config, &entry, cli.json)
        }
        Some(Commands::Check { dir }) => {
            let span = tracing::info_span!("check", cmd = "check", cwd = %cwd.display());
            let _guard = span.enter();
            commands::check::run(&config, dir.as_deref(), cli.json)
        }
    }
}
