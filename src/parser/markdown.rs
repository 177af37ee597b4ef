use std::sync::LazyLock;

use regex::Regex;

use crate::event::{Category, EventRecord, Source};

static DATE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) (\d+)(?:, (\d{4}))?").unwrap()
});
static EVENT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(https://luma\.com/([^)]+)\)").unwrap());
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[.*?\]\((https://images\.lumacdn\.com[^)]+)\)").unwrap()
});
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d{1,2}:\d{2}\s*(AM|PM)").unwrap());

const EVENT_HOST: &str = "https://luma.com";
const IMAGE_LOOKBEHIND: usize = 2;
const IMAGE_LOOKAHEAD: usize = 5;
const DETAIL_LOOKAHEAD: usize = 15;

/// Recurring venues, checked in this order. A window can mention several.
const VENUES: &[(&[&str], &str)] = &[
    (&["Encode Hub"], "Encode Hub"),
    (&["City & Guilds Building"], "City & Guilds Building"),
    (&["UCL BaseKX"], "UCL BaseKX"),
    (&["London, England"], "London, England"),
    (&["London", "England"], "London, England"),
    (&["Hammersmith International Centre"], "Hammersmith International Centre"),
    (&["Techspace Goswell Road"], "Techspace Goswell Road"),
    (
        &["The Ministry"],
        "The Ministry, Borough | Workspace & Members' Club | South London",
    ),
    (&["Manchester, England"], "Manchester, England"),
    (&["London (Register"], "London (Register to see actual location)"),
];

/// Parse crawl-service markdown of a Luma calendar into events.
///
/// Every event link inherits the most recent date header above it. Time,
/// venue and category are looked up in the lines that follow the link; the
/// first time and venue win, the last category keyword wins.
pub fn extract(markdown: &str, fallback_year: u16) -> Vec<EventRecord> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut events = Vec::new();
    let mut current_date: Option<String> = None;

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();

        if let Some(caps) = DATE_HEADER_RE.captures(line) {
            let year = caps.get(3).map_or_else(|| fallback_year.to_string(), |y| y.as_str().to_string());
            current_date = Some(format!("{} {}, {}", full_month(&caps[1]), &caps[2], year));
            continue;
        }

        let Some(caps) = EVENT_LINK_RE.captures(line) else { continue };
        let name = caps[1].trim();
        let slug = caps[2].trim();
        if slug.to_lowercase().contains("map") || name.chars().count() < 3 {
            continue;
        }

        let mut event = EventRecord::new(name, format!("{}/{}", EVENT_HOST, slug), Source::Markdown);
        event.date = current_date.clone();
        event.image_url = find_image(&lines, i);

        let end = (i + DETAIL_LOOKAHEAD).min(lines.len());
        let mut category = None;
        for j in i + 1..end {
            let next = lines[j].trim();

            if event.time.is_none() {
                event.time = TIME_RE.find(next).map(|m| m.as_str().to_string());
            }
            if event.location.is_none() {
                event.location = match_venue(&lines, i, j);
            }
            if let Some(found) = category_keyword(next) {
                category = Some(found);
            }
        }

        event.category = Some(category.unwrap_or_else(|| {
            if name.to_lowercase().contains("hackathon") {
                Category::Hackathon
            } else {
                Category::NonHackathon
            }
        }));
        events.push(event);
    }

    events
}

fn full_month(abbr: &str) -> &'static str {
    match abbr {
        "Jan" => "January",
        "Feb" => "February",
        "Mar" => "March",
        "Apr" => "April",
        "May" => "May",
        "Jun" => "June",
        "Jul" => "July",
        "Aug" => "August",
        "Sep" => "September",
        "Oct" => "October",
        "Nov" => "November",
        _ => "December",
    }
}

fn find_image(lines: &[&str], i: usize) -> Option<String> {
    let start = i.saturating_sub(IMAGE_LOOKBEHIND);
    let end = (i + IMAGE_LOOKAHEAD).min(lines.len());
    lines[start..end]
        .iter()
        .find_map(|l| IMAGE_RE.captures(l).map(|c| c[1].to_string()))
}

/// Venue for the lines around `j`, never reaching above the link line `i`.
fn match_venue(lines: &[&str], i: usize, j: usize) -> Option<String> {
    let start = i.max(j.saturating_sub(2));
    let end = (j + 3).min(lines.len());
    let window = lines[start..end]
        .iter()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join(" ");

    VENUES
        .iter()
        .find(|(needles, _)| needles.iter().all(|n| window.contains(n)))
        .map(|(_, venue)| venue.to_string())
}

fn category_keyword(line: &str) -> Option<Category> {
    if line.contains("Non-Hackathon") || (line.contains("Non") && line.contains("Hackathon")) {
        Some(Category::NonHackathon)
    } else if line.contains("Hackathon") {
        Some(Category::Hackathon)
    } else {
        None
    }
}

// ── Tests ──
