pub mod dedup;
pub mod dom;
pub mod markdown;
pub mod structured;

use scraper::Html;

use crate::event::EventRecord;

/// Two extraction passes over one rendered page: embedded JSON, then DOM heuristics.
pub fn extract_rendered(html: &str, base_url: &str) -> Vec<EventRecord> {
    let doc = Html::parse_document(html);
    let mut events = Vec::new();
    if let Some(state) = structured::embedded_state(&doc) {
        events.extend(structured::extract(&state, base_url));
    }
    events.extend(dom::extract(&doc, base_url));
    events
}

/// Join a site-relative path onto the base URL.
pub fn absolutize(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
