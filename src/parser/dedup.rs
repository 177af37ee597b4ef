use std::collections::HashSet;

use chrono::NaiveDate;

use crate::event::EventRecord;

const BLOCKED: &[&str] = &["signin", "pricing", "create", "?k=t", "?k=c"];
const EVENT_MARKER: &str = "/evt-";
const DATE_FORMAT: &str = "%B %d, %Y";

/// Drop duplicates and non-event links, keeping the first record per URL.
///
/// Calendar and listing pages often survive extraction; a record is only
/// kept if its URL carries the event marker or it has both a date and a time.
pub fn dedupe(events: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::new();

    for event in events {
        let key = event.dedup_key();
        if key.is_empty() || seen.contains(key) || BLOCKED.iter().any(|b| key.contains(b)) {
            continue;
        }
        if !key.contains(EVENT_MARKER) && !(event.date.is_some() && event.time.is_some()) {
            continue;
        }
        seen.insert(key.to_string());
        unique.push(event);
    }

    unique
}

/// Stable sort by calendar date; unparseable dates go last in input order.
pub fn sort_by_date(events: &mut [EventRecord]) {
    events.sort_by_key(|e| parse_date(e).unwrap_or(NaiveDate::MAX));
}

fn parse_date(event: &EventRecord) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(event.date.as_deref()?.trim(), DATE_FORMAT).ok()
}

/// Dedupe then sort.
pub fn finalize(events: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut events = dedupe(events);
    sort_by_date(&mut events);
    events
}

// ── Tests ──
