use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::discover;
use crate::event::EventRecord;
use crate::parser;
use crate::renderer::{RenderError, Renderer};
use crate::settings::Settings;

/// Expand discovery pages into their calendars; other targets pass through.
pub async fn resolve_targets<R: Renderer + ?Sized>(
    renderer: &R,
    settings: &Settings,
    targets: &[String],
) -> Result<Vec<String>> {
    let mut calendars = Vec::new();

    for target in targets {
        if !discover::is_discover_page(target) {
            calendars.push(target.clone());
            continue;
        }

        info!("[{}] is a discover page, finding calendars...", target);
        let url = settings.page_url(target);
        match renderer.render(&url, settings.discover_scroll_count).await {
            Ok(page) => {
                let found = discover::calendar_slugs(&page.html, settings.discover_cap);
                info!("{}: found {} calendars: {:?}", page.url, found.len(), found);
                calendars.extend(found);
            }
            Err(e) => skip_or_fail(e)?,
        }
    }

    Ok(calendars)
}

/// Render and extract each calendar in turn. Failed pages contribute nothing.
pub async fn scrape_calendars<R: Renderer + ?Sized>(
    renderer: &R,
    settings: &Settings,
    calendars: &[String],
) -> Result<Vec<EventRecord>> {
    let pb = ProgressBar::new(calendars.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut all = Vec::new();
    for cal in calendars {
        pb.set_message(cal.clone());
        let url = settings.page_url(cal);
        match renderer.render(&url, settings.scroll_count).await {
            Ok(page) => {
                let events = parser::extract_rendered(&page.html, &settings.base_url);
                info!("{}: found {} raw events", page.url, events.len());
                all.extend(events);
            }
            Err(e) => {
                if let Err(fatal) = skip_or_fail(e) {
                    pb.abandon();
                    return Err(fatal);
                }
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(all)
}

/// Full browser run: resolve, scrape, dedupe and sort.
pub async fn run<R: Renderer + ?Sized>(
    renderer: &R,
    settings: &Settings,
    targets: &[String],
) -> Result<Vec<EventRecord>> {
    let calendars = resolve_targets(renderer, settings, targets).await?;
    let raw = scrape_calendars(renderer, settings, &calendars).await?;
    let total = raw.len();
    let events = parser::dedup::finalize(raw);
    info!("Kept {} of {} raw events", events.len(), total);
    Ok(events)
}

fn skip_or_fail(err: RenderError) -> Result<()> {
    if err.is_fatal() {
        return Err(err.into());
    }
    warn!("Skipping page: {}", err);
    Ok(())
}
