use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::{info, warn};

pub const DEFAULT_CALENDAR_URL: &str = "https://luma.com/thehackcollective?k=c";

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

/// Fetch a page as markdown through spider.cloud, retrying transient failures.
pub async fn fetch_markdown(url: &str) -> Result<String> {
    let api_key = std::env::var("SPIDER_API_KEY")
        .map_err(|_| anyhow!("SPIDER_API_KEY environment variable must be set"))?;
    let spider = Spider::new(Some(api_key))
        .map_err(|e| anyhow!("Failed to create Spider client: {}", e))?;

    let mut attempt = 0;
    loop {
        let start = Instant::now();
        match scrape_once(&spider, url).await {
            Ok(markdown) => {
                info!(
                    "Crawled {} ({} chars in {}ms)",
                    url,
                    markdown.len(),
                    start.elapsed().as_millis()
                );
                return Ok(markdown);
            }
            Err(e) if attempt < MAX_RETRIES && is_transient(&e) => {
                let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                warn!(
                    "Crawl of {} failed (attempt {}/{}), backing off {:.1}s: {}",
                    url,
                    attempt + 1,
                    MAX_RETRIES,
                    backoff.as_secs_f64(),
                    e
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn scrape_once(spider: &Spider, url: &str) -> Result<String> {
    // Image references stay in: they carry event thumbnails.
    let params = RequestParams {
        return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Markdown)),
        ..Default::default()
    };

    let response = spider
        .scrape_url(url, Some(params), "application/json")
        .await
        .map_err(|e| anyhow!("Spider scrape failed: {}", e))?;

    markdown_from_response(response).ok_or_else(|| anyhow!("No content in spider response"))
}

/// The API answers with `[{"content": "...", "status": 200, ...}]`, sometimes JSON-encoded twice.
fn markdown_from_response(value: serde_json::Value) -> Option<String> {
    let parsed: serde_json::Value = match value.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(value.clone()),
        None => value,
    };

    parsed
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
}

fn is_transient(err: &anyhow::Error) -> bool {
    let msg = err.to_string();
    msg.contains("429")
        || msg.contains("rate")
        || msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
}
