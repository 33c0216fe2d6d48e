// src/ingest/mod.rs
pub mod config;
pub mod http;
pub mod providers;
pub mod scheduler;
pub mod sync;
pub mod types;
pub mod user_agents;
pub mod walker;
pub mod writer;

pub use sync::{Harvester, RunReport, SourceReport};
pub use types::{CanonicalPosting, Page, PageToken, SourceAdapter, UNKNOWN};
pub use walker::{PageWalker, StopReason, WalkOutcome};
pub use writer::{DedupWriter, WriteCounts};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("harvest_pages_total", "Provider pages fetched.");
        describe_counter!(
            "harvest_postings_new_total",
            "Postings inserted as new records."
        );
        describe_counter!(
            "harvest_postings_existing_total",
            "Postings skipped because the URL was already stored."
        );
        describe_counter!(
            "harvest_postings_failed_total",
            "Postings that could not be looked up or written."
        );
        describe_counter!(
            "harvest_source_errors_total",
            "Source pipelines that ended with an error."
        );
        describe_histogram!(
            "harvest_source_duration_ms",
            "Wall-clock time per source in milliseconds."
        );
        describe_gauge!("harvest_last_run_ts", "Unix ts when the last run finished.");
        describe_counter!("harvest_runs_total", "Scheduled runs started.");
        describe_counter!(
            "harvest_runs_skipped_total",
            "Scheduler ticks skipped while a run was in progress."
        );
    });
}

/// Clean a short text field: decode entities, collapse whitespace, trim.
/// Blank input becomes [`UNKNOWN`].
pub fn clean_field(s: Option<&str>) -> String {
    let Some(raw) = s else {
        return UNKNOWN.to_string();
    };
    let decoded = html_escape::decode_html_entities(raw);

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static regex"));
    let out = re_ws.replace_all(&decoded, " ");
    let out = out.trim();

    if out.is_empty() {
        UNKNOWN.to_string()
    } else {
        out.to_string()
    }
}

/// Like [`clean_field`] but keeps the body's markup and line structure.
pub fn clean_description(s: Option<&str>) -> String {
    match s.map(str::trim) {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Parse a provider date. Unparsable or missing input falls back to `now`.
pub fn parse_posted_at(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return ndt.and_utc();
        }
    }
    // Amazon: "March 3, 2025"
    for fmt in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(ndt) = d.and_hms_opt(0, 0, 0) {
                return ndt.and_utc();
            }
        }
    }

    tracing::debug!(raw = s, "unparsable posting date, using now");
    now
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn clean_field_decodes_and_collapses() {
        assert_eq!(
            clean_field(Some("  Software&nbsp;Dev   Engineer &amp; Lead \n")),
            "Software Dev Engineer & Lead"
        );
        assert_eq!(clean_field(Some("   ")), UNKNOWN);
        assert_eq!(clean_field(None), UNKNOWN);
    }

    #[test]
    fn description_keeps_markup() {
        assert_eq!(
            clean_description(Some(" <p>Build things</p>\n<ul><li>Rust</li></ul> ")),
            "<p>Build things</p>\n<ul><li>Rust</li></ul>"
        );
        assert_eq!(clean_description(Some("")), UNKNOWN);
    }

    #[test]
    fn parses_known_date_shapes() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let expect = Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap();

        assert_eq!(parse_posted_at(Some("2025-03-03T00:00:00+00:00"), now), expect);
        assert_eq!(parse_posted_at(Some("2025-03-03T00:00:00Z"), now), expect);
        assert_eq!(parse_posted_at(Some("2025-03-03T00:00:00"), now), expect);
        assert_eq!(parse_posted_at(Some("2025-03-03"), now), expect);
        assert_eq!(parse_posted_at(Some("March 3, 2025"), now), expect);
        assert_eq!(parse_posted_at(Some("March 03, 2025"), now), expect);
    }

    #[test]
    fn offset_is_normalized_to_utc() {
        let now = Utc::now();
        let got = parse_posted_at(Some("2025-03-03T05:30:00+05:30"), now);
        assert_eq!(got, Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn garbage_dates_fall_back_to_now() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_posted_at(Some("yesterday-ish"), now), now);
        assert_eq!(parse_posted_at(Some(""), now), now);
        assert_eq!(parse_posted_at(None, now), now);
    }
}
