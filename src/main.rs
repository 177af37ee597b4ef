mod crawl;
mod discover;
mod event;
mod parser;
mod pipeline;
mod renderer;
mod settings;

use std::io::Read;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use event::EventRecord;
use renderer::ChromeRenderer;
use settings::Settings;

#[derive(Parser)]
#[command(name = "luma_events", about = "Luma event scraper (headless browser or crawl markdown)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render calendar pages in headless Chromium and extract events
    Scrape {
        /// Site-relative calendar slugs; topic pages like "ai" are expanded
        #[arg(default_value = "london")]
        targets: Vec<String>,
    },
    /// Extract events from a saved crawl markdown file ("-" reads stdin)
    Parse {
        path: String,
    },
    /// Fetch a calendar as markdown via spider.cloud and extract events
    Crawl {
        #[arg(default_value = crawl::DEFAULT_CALENDAR_URL)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load();

    let events = match cli.command {
        Commands::Scrape { targets } => {
            let renderer = ChromeRenderer::new(&settings);
            pipeline::run(&renderer, &settings, &targets).await?
        }
        Commands::Parse { path } => {
            let markdown = read_input(&path)?;
            from_markdown(&markdown, &settings)
        }
        Commands::Crawl { url } => {
            let markdown = crawl::fetch_markdown(&url).await?;
            from_markdown(&markdown, &settings)
        }
    };

    print_report(&events);

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(())
}

fn from_markdown(markdown: &str, settings: &Settings) -> Vec<EventRecord> {
    let raw = parser::markdown::extract(markdown, settings.fallback_year);
    let total = raw.len();
    let events = parser::dedup::finalize(raw);
    info!("Kept {} of {} parsed events", events.len(), total);
    events
}

fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read markdown from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
}

fn print_report(events: &[EventRecord]) {
    let rule = "=".repeat(60);
    println!("\n{}", rule);
    println!("TOTAL: {} unique events", events.len());
    println!("{}\n", rule);

    for (i, event) in events.iter().enumerate() {
        println!("{}. {}\n", i + 1, event);
    }

    println!("{}", rule);
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
