// Copyright 2026 Newsreel Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use newsreel::browser::chromium::{find_chromium, ChromiumSession};
use newsreel::browser::{BrowserSession, Timeouts};
use newsreel::config::{CookiePolicy, RunConfig, WorkItem};
use newsreel::dates;
use newsreel::extract::ArticleExtractor;
use newsreel::pipeline::{NavigationPipeline, Selectors};
use newsreel::sink::CsvSink;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "newsreel",
    about = "Newsreel — search a news site and extract article metadata into a tabular report",
    version
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a search and write one report row per article
    Run {
        /// News section the section filter must match (e.g. "Business")
        #[arg(long)]
        section: Option<String>,

        /// Phrase typed into the search box and counted per article
        #[arg(long)]
        phrase: Option<String>,

        /// Calendar months the date filter covers, including the current one
        #[arg(long)]
        months: Option<u32>,

        /// JSON work item supplying news_section / search_phrase / months
        #[arg(long)]
        work_item: Option<PathBuf>,

        /// Site entry page
        #[arg(long, default_value = "https://nytimes.com")]
        url: String,

        /// Directory receiving the report and downloaded images
        #[arg(long, default_value = "output")]
        output: PathBuf,

        /// Whether a missing consent banner aborts the run
        #[arg(long, value_enum, default_value = "tolerated")]
        cookie_banner: CookiePolicy,
    },
    /// Check that a usable Chromium binary can be found
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "newsreel=debug"
    } else {
        "newsreel=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().expect("directive is valid")),
        )
        .init();

    let result = match cli.command {
        Commands::Run {
            section,
            phrase,
            months,
            work_item,
            url,
            output,
            cookie_banner,
        } => run(section, phrase, months, work_item, url, output, cookie_banner).await,
        Commands::Doctor => doctor(),
    };

    if let Err(e) = result {
        error!("{e:#} — bot execution failed");
        std::process::exit(1);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run(
    section: Option<String>,
    phrase: Option<String>,
    months: Option<u32>,
    work_item: Option<PathBuf>,
    url: String,
    output: PathBuf,
    cookie_banner: CookiePolicy,
) -> Result<()> {
    let item = work_item.map(|p| WorkItem::load(&p)).transpose()?;
    let config = RunConfig::resolve(item, section, phrase, months, url, output, cookie_banner)?;

    let window = dates::search_window(config.months, Local::now().date_naive());
    info!(
        section = %config.section,
        phrase = %config.search_phrase,
        start = %window.start_mdy(),
        end = %window.end_mdy(),
        "starting run"
    );

    let session = Arc::new(ChromiumSession::launch().await?);
    let timeouts = Timeouts::default();
    let selectors = Selectors::default();

    let mut pipeline = NavigationPipeline::new(
        session.clone() as Arc<dyn BrowserSession>,
        selectors.clone(),
        timeouts.clone(),
    );
    pipeline.run(&config, &window).await?;

    let sink = CsvSink::new(config.output_dir.join("news.csv"));
    let mut extractor = ArticleExtractor::new(
        session.clone() as Arc<dyn BrowserSession>,
        selectors,
        timeouts,
        config.output_dir.join("images"),
    );

    let rows = extractor.run(&config.search_phrase, &sink).await;
    // Dispatched image downloads must settle before the process exits,
    // whether or not extraction succeeded.
    extractor.finish().await;
    let rows = rows?;

    info!(rows, report = %sink.path().display(), "run complete");
    session.shutdown().await?;
    Ok(())
}

fn doctor() -> Result<()> {
    match find_chromium() {
        Some(path) => {
            println!("Chromium: {}", path.display());
            Ok(())
        }
        None => anyhow::bail!(
            "Chromium not found. Install google-chrome or chromium, or set NEWSREEL_BROWSER."
        ),
    }
}
