use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::absolutize;
use crate::event::{EventRecord, Source};

static CARD_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[class*="event"], [class*="card"], a[href^="/"]"#).unwrap()
});
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"h1, h2, h3, h4, [class*="title"], [class*="name"]"#).unwrap()
});
static DATE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[class*="date"], [class*="time"], time"#).unwrap());
static LOCATION_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[class*="location"], [class*="address"], [class*="venue"]"#).unwrap()
});

const NAV_MARKERS: &[&str] = &["signin", "pricing", "create", "discover"];
const MIN_TITLE: usize = 3;
const MAX_TITLE: usize = 200;

/// Card-shaped elements pointing at site-relative pages, one record per href.
pub fn extract(doc: &Html, base_url: &str) -> Vec<EventRecord> {
    let mut seen = HashSet::new();
    let mut events = Vec::new();

    for card in doc.select(&CARD_SEL) {
        let Some(href) = card.value().attr("href") else { continue };
        if !is_event_href(href) {
            continue;
        }

        // A blank title element still counts as the title.
        let title = match card.select(&TITLE_SEL).next() {
            Some(t) => trimmed_text(t),
            None => own_first_line(card),
        };
        let len = title.chars().count();
        if !(MIN_TITLE..=MAX_TITLE).contains(&len) {
            continue;
        }

        if !seen.insert(href) {
            continue;
        }

        let mut event = EventRecord::new(title, absolutize(base_url, href), Source::Dom);
        event.date = first_text(card, &DATE_SEL);
        event.location = first_text(card, &LOCATION_SEL);
        events.push(event);
    }

    events
}

fn is_event_href(href: &str) -> bool {
    href.starts_with('/') && href != "/" && !NAV_MARKERS.iter().any(|m| href.contains(m))
}

/// Trimmed text of the first matching descendant; empty text counts as missing.
fn first_text(el: ElementRef, sel: &Selector) -> Option<String> {
    let text = trimmed_text(el.select(sel).next()?);
    (!text.is_empty()).then_some(text)
}

fn trimmed_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn own_first_line(el: ElementRef) -> String {
    let text = el.text().collect::<String>();
    text.trim().split('\n').next().unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://lu.ma";

    fn run(body: &str) -> Vec<EventRecord> {
        let doc = Html::parse_document(&format!("<html><body>{}</body></html>", body));
        extract(&doc, BASE)
    }

    #[test]
    fn card_with_labeled_fields() {
        let events = run(r#"
            <a class="event-card" href="/evt-abc123">
              <h3>Rust London Meetup</h3>
              <div class="event-date">Thu, Dec 4</div>
              <div class="venue-line">Encode Hub</div>
            </a>"#);
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.name, "Rust London Meetup");
        assert_eq!(e.date.as_deref(), Some("Thu, Dec 4"));
        assert_eq!(e.location.as_deref(), Some("Encode Hub"));
        assert_eq!(e.url, "https://lu.ma/evt-abc123");
        assert!(e.time.is_none());
    }

    #[test]
    fn navigation_links_rejected() {
        let events = run(r#"
            <a href="/signin">Sign in now</a>
            <a href="/pricing">Pricing plans</a>
            <a href="/create">Create event</a>
            <a href="/discover">Discover events</a>
            <a href="/">Home page</a>
            <a class="card" href="https://example.com/x">External card</a>
            <div class="event-row">No link here</div>"#);
        assert!(events.is_empty());
    }

    #[test]
    fn falls_back_to_first_line_of_text() {
        let events = run("<a href=\"/evt-1\">Founders Breakfast\nsecond line</a>");
        assert_eq!(events[0].name, "Founders Breakfast");
    }

    #[test]
    fn blank_title_element_rejects_card() {
        let events = run(r#"<a href="/evt-1"><h3> </h3>Some Card Text</a>"#);
        assert!(events.is_empty());
    }

    #[test]
    fn title_bounds() {
        let long = "x".repeat(201);
        let body = format!(r#"<a href="/evt-1">ab</a><a href="/evt-2">{}</a><a href="/evt-3">Fine</a>"#, long);
        let events = run(&body);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].url, "https://lu.ma/evt-3");
    }

    #[test]
    fn first_seen_href_wins() {
        let events = run(r#"
            <div class="event-card" href="/evt-dup"><h2>First Copy</h2></div>
            <a href="/evt-dup"><h2>Second Copy</h2></a>"#);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "First Copy");
    }

    #[test]
    fn empty_date_is_none() {
        let events = run(r#"<a href="/evt-7"><h4>Quiet Evening</h4><time>  </time></a>"#);
        assert!(events[0].date.is_none());
    }

    #[test]
    fn fixture_page() {
        let html = std::fs::read_to_string("tests/fixtures/calendar.html").unwrap();
        let doc = Html::parse_document(&html);
        let events = extract(&doc, BASE);
        let urls: Vec<&str> = events.iter().map(|e| e.url.as_str()).collect();
        assert!(urls.contains(&"https://lu.ma/evt-dom1"));
        assert!(!urls.iter().any(|u| u.contains("signin")));
        let unique: HashSet<_> = urls.iter().collect();
        assert_eq!(unique.len(), urls.len());
    }
}
