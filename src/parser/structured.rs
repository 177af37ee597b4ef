use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

use super::absolutize;
use crate::event::{EventRecord, Source};

static NEXT_DATA_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script#__NEXT_DATA__").unwrap());

const MAX_DEPTH: usize = 15;
const EVENT_MARKERS: &[&str] = &["start_at", "event_start", "start_time", "date"];
const START_FIELDS: &[&str] = &["start_at", "event_start", "start_time"];
const COLLECTION_FIELDS: &[&str] = &["featured_items", "items", "data", "results"];
const ID_FIELDS: &[&str] = &["api_id", "id", "slug", "url"];
const UNNAMED: &str = "Unknown Event";

/// Pull the Next.js application-state payload out of a rendered page.
pub fn embedded_state(doc: &Html) -> Option<Value> {
    let script = doc.select(&NEXT_DATA_SEL).next()?;
    let raw: String = script.text().collect();
    match serde_json::from_str(raw.trim()) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("Unreadable __NEXT_DATA__ payload: {}", e);
            None
        }
    }
}

/// Walk an embedded JSON payload and collect every event-shaped object.
pub fn extract(data: &Value, base_url: &str) -> Vec<EventRecord> {
    let mut events = Vec::new();
    walk(data, 0, base_url, &mut events);
    events
}

fn walk(node: &Value, depth: usize, base_url: &str, out: &mut Vec<EventRecord>) {
    if depth > MAX_DEPTH {
        return;
    }

    match node {
        Value::Object(obj) => {
            if obj.contains_key("name") && EVENT_MARKERS.iter().any(|k| obj.contains_key(*k)) {
                push_event(obj, base_url, out);
            }

            // Listing payloads: {"events": [{...}, {"event": {...}}]}
            if let Some(Value::Array(items)) = obj.get("events") {
                for item in items {
                    let Value::Object(entry) = item else { continue };
                    match entry.get("event") {
                        Some(Value::Object(inner)) => push_event(inner, base_url, out),
                        Some(_) => {}
                        None => push_event(entry, base_url, out),
                    }
                }
            }

            for key in COLLECTION_FIELDS {
                if let Some(Value::Array(items)) = obj.get(*key) {
                    for item in items {
                        walk(item, depth + 1, base_url, out);
                    }
                }
            }

            for value in obj.values() {
                walk(value, depth + 1, base_url, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, depth + 1, base_url, out);
            }
        }
        _ => {}
    }
}

fn push_event(obj: &Map<String, Value>, base_url: &str, out: &mut Vec<EventRecord>) {
    if let Some(event) = to_event(obj, base_url) {
        if event.name.chars().count() > 3 {
            out.push(event);
        }
    }
}

/// Convert one event object. `None` when no identifier yields a URL.
pub fn to_event(obj: &Map<String, Value>, base_url: &str) -> Option<EventRecord> {
    let url = event_url(obj, base_url)?;
    let name = non_empty_str(obj.get("name")).unwrap_or(UNNAMED);

    let mut event = EventRecord::new(name, url, Source::NextData);

    if let Some(start) = START_FIELDS.iter().find_map(|k| present(obj.get(*k))) {
        match start.as_str().and_then(parse_timestamp) {
            Some(ts) => {
                event.date = Some(ts.format("%B %d, %Y").to_string());
                event.time = Some(ts.format("%I:%M %p").to_string());
            }
            None => {
                event.date = Some(match start {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
            }
        }
    }

    event.location = location(obj);
    Some(event)
}

fn location(obj: &Map<String, Value>) -> Option<String> {
    let geo = obj.get("geo_address_info").and_then(Value::as_object);
    geo.and_then(|g| non_empty_str(g.get("full_address")))
        .or_else(|| geo.and_then(|g| non_empty_str(g.get("address"))))
        .or_else(|| non_empty_str(obj.get("location")))
        .or_else(|| non_empty_str(obj.get("address")))
        .map(str::to_string)
}

fn event_url(obj: &Map<String, Value>, base_url: &str) -> Option<String> {
    let id = ID_FIELDS.iter().find_map(|k| match present(obj.get(*k))? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })?;

    if id.starts_with("http") {
        Some(id)
    } else {
        Some(absolutize(base_url, &id))
    }
}

/// ISO-8601 in the forms Luma emits: RFC 3339, naive datetime, or a bare date.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Treat null and empty strings as missing.
fn present(value: Option<&Value>) -> Option<&Value> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        v => Some(v),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    present(value)?.as_str().map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://lu.ma";

    #[test]
    fn launch_party_with_geo_address() {
        let data = json!({
            "name": "Launch Party",
            "start_at": "2025-12-05T18:00:00Z",
            "geo_address_info": {"full_address": "123 Main St"},
            "api_id": "evt-launch"
        });
        let events = extract(&data, BASE);
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.date.as_deref(), Some("December 05, 2025"));
        assert_eq!(e.time.as_deref(), Some("06:00 PM"));
        assert_eq!(e.location.as_deref(), Some("123 Main St"));
        assert_eq!(e.url, "https://lu.ma/evt-launch");
        assert_eq!(e.source, Source::NextData);
    }

    #[test]
    fn keeps_wall_time_of_offset() {
        let obj = json!({"name": "Late Talk", "start_at": "2025-03-01T21:30:00+01:00", "id": "evt-x"});
        let e = to_event(obj.as_object().unwrap(), BASE).unwrap();
        assert_eq!(e.date.as_deref(), Some("March 01, 2025"));
        assert_eq!(e.time.as_deref(), Some("09:30 PM"));
    }

    #[test]
    fn unparseable_start_falls_back_to_raw() {
        let obj = json!({"name": "Someday Meetup", "start_time": "next tuesday", "slug": "someday"});
        let e = to_event(obj.as_object().unwrap(), BASE).unwrap();
        assert_eq!(e.date.as_deref(), Some("next tuesday"));
        assert!(e.time.is_none());
    }

    #[test]
    fn location_priority() {
        let geo_address = json!({
            "name": "A", "id": "a",
            "geo_address_info": {"address": "Geo Street"},
            "location": "Flat Location"
        });
        let flat = json!({"name": "B", "id": "b", "location": "Flat Location", "address": "Addr"});
        let addr = json!({"name": "C", "id": "c", "address": "Addr"});
        assert_eq!(to_event(geo_address.as_object().unwrap(), BASE).unwrap().location.as_deref(), Some("Geo Street"));
        assert_eq!(to_event(flat.as_object().unwrap(), BASE).unwrap().location.as_deref(), Some("Flat Location"));
        assert_eq!(to_event(addr.as_object().unwrap(), BASE).unwrap().location.as_deref(), Some("Addr"));
    }

    #[test]
    fn absolute_ids_used_verbatim() {
        let obj = json!({"name": "Offsite", "url": "https://example.com/e/1"});
        let e = to_event(obj.as_object().unwrap(), BASE).unwrap();
        assert_eq!(e.url, "https://example.com/e/1");
    }

    #[test]
    fn missing_id_yields_nothing() {
        let obj = json!({"name": "Ghost", "start_at": "2025-01-01T10:00:00Z"});
        assert!(to_event(obj.as_object().unwrap(), BASE).is_none());
    }

    #[test]
    fn events_array_unwraps_inner_event() {
        let data = json!({
            "props": {"events": [
                {"event": {"name": "Wrapped One", "api_id": "evt-1"}},
                {"name": "Bare Two", "api_id": "evt-2"},
                "not an object"
            ]}
        });
        let events = extract(&data, BASE);
        let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Wrapped One", "Bare Two"]);
    }

    #[test]
    fn short_names_dropped() {
        let data = json!({"items": [{"name": "Abc", "start_at": "2025-01-01", "id": "x"}]});
        assert!(extract(&data, BASE).is_empty());
    }

    #[test]
    fn unnamed_event_gets_placeholder() {
        let data = json!({"events": [{"api_id": "evt-9", "start_at": "2025-02-02"}]});
        let events = extract(&data, BASE);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Unknown Event");
        assert_eq!(events[0].time.as_deref(), Some("12:00 AM"));
    }

    #[test]
    fn deep_nesting_terminates_at_cutoff() {
        let shallow = json!({"name": "Shallow Event", "start_at": "2025-06-01T10:00:00Z", "id": "evt-s"});
        let mut deep = json!({"name": "Buried Event", "start_at": "2025-06-02T10:00:00Z", "id": "evt-d"});
        for _ in 0..200 {
            deep = json!({ "child": deep });
        }
        let data = json!({ "top": shallow, "nested": deep });
        let events = extract(&data, BASE);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Shallow Event");
    }

    #[test]
    fn event_at_depth_limit_is_found() {
        // Root is depth 0; the event object sits at depth 15.
        let mut data = json!({"name": "Edge Event", "start_at": "2025-06-02T10:00:00Z", "id": "evt-e"});
        for _ in 0..15 {
            data = json!({ "child": data });
        }
        assert_eq!(extract(&data, BASE).len(), 1);

        let wrapped = json!({ "child": data });
        assert!(extract(&wrapped, BASE).is_empty());
    }

    #[test]
    fn reads_next_data_script() {
        let html = r#"<html><body><script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"name":"x"}}}</script></body></html>"#;
        let doc = Html::parse_document(html);
        let state = embedded_state(&doc).unwrap();
        assert_eq!(state["props"]["pageProps"]["name"], "x");
    }

    #[test]
    fn malformed_next_data_is_ignored() {
        let doc = Html::parse_document(r#"<script id="__NEXT_DATA__">{not json</script>"#);
        assert!(embedded_state(&doc).is_none());
    }
}
