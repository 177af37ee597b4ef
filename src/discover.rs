use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Topic pages that list calendars rather than events.
const DISCOVER_PAGES: &[&str] = &[
    "tech", "crypto", "ai", "design", "music", "sports", "food", "wellness",
];
const NON_CALENDAR: &[&str] = &["evt-", "signin", "pricing", "create", "discover", "?"];

pub fn is_discover_page(target: &str) -> bool {
    DISCOVER_PAGES.contains(&target.to_lowercase().as_str())
}

/// Calendar slugs linked from a discovery page, in page order, at most `cap`.
pub fn calendar_slugs(html: &str, cap: usize) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();

    let slugs: Vec<String> = doc
        .select(&LINK_SEL)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| is_calendar_href(href))
        .map(|href| &href[1..])
        .filter(|slug| seen.insert(*slug))
        // Topic maps and nested paths are not calendars.
        .filter(|slug| !slug.starts_with("category/") && !slug.contains('/'))
        .take(cap)
        .map(str::to_string)
        .collect();
    slugs
}

fn is_calendar_href(href: &str) -> bool {
    href.starts_with('/')
        && href.len() > 2
        && href.len() < 50
        && !NON_CALENDAR.iter().any(|m| href.contains(m))
}
