use anyhow::{Context, Result};
use clap::ValueEnum;
use pagedrift::{
    config::Config,
    drift::{CheckStats, DriftChecker, Whitelist},
    types::DriftReport,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Command-line options for `check`
pub struct CheckArgs {
    pub urls: Vec<String>,
    pub urls_file: Option<PathBuf>,
    pub headless: bool,
    pub format: OutputFormat,
    pub report: Option<PathBuf>,
    pub whitelist: Option<PathBuf>,
    pub artifact_dir: Option<PathBuf>,
    pub no_robots: bool,
    pub concurrency: Option<usize>,
}

pub async fn run_check(mut config: Config, args: CheckArgs) -> Result<()> {
    let mut urls = args.urls;
    if let Some(path) = &args.urls_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read URL list '{}'", path.display()))?;
        urls.extend(parse_url_list(&content));
    }
    if urls.is_empty() {
        anyhow::bail!("No URLs provided");
    }

    // Command-line flags take precedence over the config file
    if args.headless {
        config.check.headless = true;
    }
    if let Some(dir) = args.artifact_dir {
        config.artifacts.dir = dir;
    }
    if args.no_robots {
        config.robots.enabled = false;
    }
    if let Some(concurrency) = args.concurrency {
        config.check.concurrency = concurrency;
    }
    config.validate()?;

    let checker = DriftChecker::from_config(&config)?;
    let report = checker.run(&urls).await;
    let stats = CheckStats::from_report(&report);
    info!(
        "Checked {} URLs: {} match, {} drifted, {} failed, {} disallowed",
        stats.total,
        stats.matched,
        stats.drifted(),
        stats.failed_first + stats.failed_second,
        stats.disallowed
    );

    if let Some(path) = &args.report {
        write_report(&report, path)?;
        info!("Report written to {}", path.display());
    }

    if let Some(path) = &args.whitelist {
        let whitelist = Whitelist::from_report(&report);
        whitelist.write(path)?;
        info!("Whitelist with {} entries written to {}", whitelist.len(), path.display());
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_summary(&report, &stats),
    }

    Ok(())
}

/// One URL per line; blank lines and `#` comments are skipped
fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| strip_comment(line).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// A `#` starts a comment only at line start or after whitespace, so URL
/// fragments survive
fn strip_comment(line: &str) -> &str {
    let mut after_space = true;
    for (i, c) in line.char_indices() {
        if c == '#' && after_space {
            return &line[..i];
        }
        after_space = c.is_whitespace();
    }
    line
}

fn write_report(report: &DriftReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report '{}'", path.display()))
}

fn print_summary(report: &DriftReport, stats: &CheckStats) {
    println!("\nDrift Check Results");
    println!("===================");
    for entry in &report.entries {
        let ratio = entry
            .comparison
            .as_ref()
            .and_then(|c| c.similarity_ratio)
            .map(|r| format!(" (ratio {:.3})", r))
            .unwrap_or_default();
        println!("  {:<22} {}{}", entry.verdict.to_string(), entry.url, ratio);
    }
    println!();
    println!("Total:       {}", stats.total);
    println!("Match:       {}", stats.matched);
    println!("Similar:     {}", stats.similar);
    println!("Mismatch:    {}", stats.mismatched);
    println!("Failed:      {}", stats.failed_first + stats.failed_second);
    if stats.disallowed > 0 {
        println!("Disallowed:  {}", stats.disallowed);
    }
}
