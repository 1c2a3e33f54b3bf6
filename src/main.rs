//! pagedrift: detect content drift between repeated observations of web pages

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pagedrift::config::Config;
use std::path::PathBuf;

use commands::check::{CheckArgs, OutputFormat};
use commands::{init_config, robots_check, run_check};

#[derive(Parser)]
#[command(name = "pagedrift")]
#[command(about = "Check whether web pages serve stable content across repeated fetches")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "pagedrift.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch each URL twice and classify the drift between observations
    Check {
        /// URLs to check
        urls: Vec<String>,

        /// File with one URL per line (`#` starts a comment)
        #[arg(short = 'f', long)]
        urls_file: Option<PathBuf>,

        /// Render pages in a headless browser instead of plain HTTP
        #[arg(long)]
        headless: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write the JSON report (url -> verdict) to this file
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Write an allow-list of matching URLs to this file
        #[arg(short, long)]
        whitelist: Option<PathBuf>,

        /// Directory for raw and canonical artifacts
        #[arg(long)]
        artifact_dir: Option<PathBuf>,

        /// Do not consult robots.txt
        #[arg(long)]
        no_robots: bool,

        /// Number of URLs checked in parallel
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Check whether robots.txt allows fetching a URL
    Robots {
        /// URL to check
        url: String,

        /// User agent to match (defaults to the configured one)
        #[arg(short, long)]
        user_agent: Option<String>,
    },

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `init` must work even when an existing config is broken
    if let Commands::Init { path, force } = &cli.command {
        Config::default().logging.init(cli.verbose)?;
        return init_config(path, *force);
    }

    let config = Config::load_or_default(&cli.config)?;
    config.logging.init(cli.verbose)?;

    match cli.command {
        Commands::Check {
            urls,
            urls_file,
            headless,
            format,
            report,
            whitelist,
            artifact_dir,
            no_robots,
            concurrency,
        } => {
            run_check(
                config,
                CheckArgs {
                    urls,
                    urls_file,
                    headless,
                    format,
                    report,
                    whitelist,
                    artifact_dir,
                    no_robots,
                    concurrency,
                },
            )
            .await
        }
        Commands::Robots { url, user_agent } => robots_check(config, url, user_agent).await,
        Commands::Init { .. } => Ok(()),
    }
}
