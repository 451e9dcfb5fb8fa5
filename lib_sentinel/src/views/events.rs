//! # Events Table
//!
//! Client-side filtering, paging and the per-day severity chart of the
//! security events page.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::api::types::SecurityEventRecord;

/// Table filters. Empty or `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Case-insensitive substring matched against every text column.
    pub search: String,
    pub severity: Option<String>,
    pub event_type: Option<String>,
}

impl EventFilter {
    pub fn search(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Default::default()
        }
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn matches(&self, event: &SecurityEventRecord) -> bool {
        let needle = self.search.trim().to_lowercase();
        let matches_search = needle.is_empty()
            || [
                event.id.as_str(),
                event.event_type.as_str(),
                event.severity.as_str(),
                event.description.as_str(),
                event.created_at.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));

        matches_search
            && selected(&self.severity, &event.severity)
            && selected(&self.event_type, &event.event_type)
    }

    pub fn apply<'a>(&self, events: &'a [SecurityEventRecord]) -> Vec<&'a SecurityEventRecord> {
        events.iter().filter(|event| self.matches(event)).collect()
    }
}

/// `None`, empty and `"all"` select everything.
fn selected(choice: &Option<String>, value: &str) -> bool {
    match choice.as_deref() {
        None | Some("") => true,
        Some(choice) if choice.eq_ignore_ascii_case("all") => true,
        Some(choice) => choice.eq_ignore_ascii_case(value),
    }
}

/// The zero-based `page` of `items`. Out-of-range pages are empty.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    if per_page == 0 {
        return &[];
    }
    let start = page.saturating_mul(per_page).min(items.len());
    let end = start.saturating_add(per_page).min(items.len());
    &items[start..end]
}

/// Number of pages needed for `total` items.
pub fn page_count(total: usize, per_page: usize) -> usize {
    if per_page == 0 {
        0
    } else {
        total.div_ceil(per_page)
    }
}

/// One bar group of the severity chart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeverityBucket {
    /// `MM/dd`.
    pub date: String,
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

/// Counts events per day and severity. Days appear in first-seen order.
///
/// Events with an unparseable `created_at` or an unknown severity are skipped.
pub fn severity_by_day(events: &[SecurityEventRecord]) -> Vec<SeverityBucket> {
    let mut buckets: Vec<SeverityBucket> = Vec::new();

    for event in events {
        let Some(date) = parse_timestamp(&event.created_at) else {
            log::debug!("Skipping event {} with timestamp '{}'", event.id, event.created_at);
            continue;
        };
        let day = date.format("%m/%d").to_string();

        let index = match buckets.iter().position(|bucket| bucket.date == day) {
            Some(index) => index,
            None => {
                buckets.push(SeverityBucket {
                    date: day,
                    ..Default::default()
                });
                buckets.len() - 1
            }
        };
        let bucket = &mut buckets[index];
        match event.severity.to_ascii_lowercase().as_str() {
            "low" => bucket.low += 1,
            "medium" => bucket.medium += 1,
            "high" => bucket.high += 1,
            other => log::trace!("Severity '{}' is not charted", other),
        }
    }

    buckets
}

/// `yyyy-MM-dd HH:mm:ss`, or the raw text when it does not parse.
pub fn format_timestamp(created_at: &str) -> String {
    parse_timestamp(created_at)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| created_at.to_string())
}

/// RFC 3339 timestamps are normalised to UTC; naive ones are taken as they are.
fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc).naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn record(id: &str, kind: &str, severity: &str, description: &str, created_at: &str) -> SecurityEventRecord {
        SecurityEventRecord {
            id: id.to_string(),
            event_type: kind.to_string(),
            severity: severity.to_string(),
            description: description.to_string(),
            created_at: created_at.to_string(),
            event_metadata: Map::new(),
        }
    }

    fn sample() -> Vec<SecurityEventRecord> {
        vec![
            record("1", "Authentication", "high", "Multiple failed login attempts detected", "2024-01-20T14:30:00"),
            record("2", "Network", "medium", "Unusual outbound traffic pattern detected", "2024-01-20T14:25:00"),
            record("3", "System", "low", "System update completed successfully", "2024-01-19T14:20:00Z"),
            record("4", "Malware", "high", "Potential malware activity detected", "2024-01-21T09:00:00+00:00"),
            record("5", "Firewall", "medium", "Port scan attempt blocked", "not a date"),
        ]
    }

    #[test]
    fn search_is_case_insensitive_across_columns() {
        let events = sample();
        let ids = |filter: &EventFilter| -> Vec<String> {
            filter.apply(&events).iter().map(|e| e.id.clone()).collect()
        };

        assert_eq!(ids(&EventFilter::search("DETECTED")), vec!["1", "2", "4"]);
        assert_eq!(ids(&EventFilter::search("network")), vec!["2"]);
        assert_eq!(ids(&EventFilter::search("2024-01-19")), vec!["3"]);
        assert_eq!(ids(&EventFilter::default()).len(), 5);
    }

    #[test]
    fn severity_and_type_filters_combine_with_search() {
        let events = sample();
        let filter = EventFilter::search("detected").with_severity("High");
        let ids: Vec<_> = filter.apply(&events).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);

        let filter = EventFilter::default()
            .with_severity("all")
            .with_event_type("firewall");
        let ids: Vec<_> = filter.apply(&events).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["5"]);
    }

    #[test]
    fn pagination() {
        let items: Vec<u32> = (1..=23).collect();
        assert_eq!(paginate(&items, 0, 10), &items[0..10]);
        assert_eq!(paginate(&items, 2, 10), &[21, 22, 23]);
        assert!(paginate(&items, 3, 10).is_empty());
        assert!(paginate(&items, 0, 0).is_empty());
        assert_eq!(page_count(23, 10), 3);
        assert_eq!(page_count(0, 10), 0);
    }

    #[test]
    fn chart_groups_by_day_in_first_seen_order() {
        let buckets = severity_by_day(&sample());
        assert_eq!(
            buckets,
            vec![
                SeverityBucket { date: "01/20".to_string(), low: 0, medium: 1, high: 1 },
                SeverityBucket { date: "01/19".to_string(), low: 1, medium: 0, high: 0 },
                SeverityBucket { date: "01/21".to_string(), low: 0, medium: 0, high: 1 },
            ]
        );
    }

    #[test]
    fn timestamps_format_for_the_table() {
        assert_eq!(format_timestamp("2024-01-20T14:30:00"), "2024-01-20 14:30:00");
        assert_eq!(format_timestamp("2024-01-20T14:30:00.250Z"), "2024-01-20 14:30:00");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
