// src/store/query.rs
use serde::{Deserialize, Serialize};

use super::StoredPosting;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

fn default_page() -> u32 {
    1
}
fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Recognized read filters.
///
/// - `company`, `location`: case-insensitive substring
/// - `search`: case-insensitive substring on title OR company OR description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            company: None,
            location: None,
            search: None,
        }
    }
}

impl JobQuery {
    /// Clamp paging and drop blank filters.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, MAX_LIMIT);
        for f in [&mut self.company, &mut self.location, &mut self.search] {
            *f = f.take().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        }
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    pub fn matches(&self, p: &StoredPosting) -> bool {
        let contains = |hay: &str, needle: &str| hay.to_lowercase().contains(&needle.to_lowercase());

        if let Some(c) = &self.company {
            if !contains(&p.company, c) {
                return false;
            }
        }
        if let Some(l) = &self.location {
            if !contains(&p.location, l) {
                return false;
            }
        }
        if let Some(s) = &self.search {
            if !(contains(&p.title, s) || contains(&p.company, s) || contains(&p.description, s)) {
                return false;
            }
        }
        true
    }
}

/// One page of results plus pagination totals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub jobs: Vec<StoredPosting>,
}

impl JobPage {
    pub fn new(query: &JobQuery, total: u64, jobs: Vec<StoredPosting>) -> Self {
        Self {
            total,
            page: query.page,
            limit: query.limit,
            total_pages: total.div_ceil(u64::from(query.limit.max(1))),
            jobs,
        }
    }

    /// Requested page lies past the last one while results exist.
    pub fn is_out_of_range(&self) -> bool {
        self.total > 0 && u64::from(self.page) > self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn posting(title: &str, company: &str, location: &str, desc: &str) -> StoredPosting {
        StoredPosting {
            id: Uuid::new_v4(),
            title: title.into(),
            company: company.into(),
            location: location.into(),
            description: desc.into(),
            posted_at: Utc::now(),
            source_url: format!("https://example.test/{title}"),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn normalized_clamps_and_drops_blank_filters() {
        let q = JobQuery {
            page: 0,
            limit: 500,
            company: Some("  ".into()),
            location: Some(" Hyderabad ".into()),
            search: None,
        }
        .normalized();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, MAX_LIMIT);
        assert_eq!(q.company, None);
        assert_eq!(q.location.as_deref(), Some("Hyderabad"));
    }

    #[test]
    fn filters_are_case_insensitive_substrings() {
        let p = posting("Senior Rust Engineer", "Amazon", "Bengaluru, KA, IND", "Build infra");
        let q = JobQuery {
            company: Some("amaz".into()),
            location: Some("bengaluru".into()),
            ..JobQuery::default()
        };
        assert!(q.matches(&p));

        let q = JobQuery {
            company: Some("micro".into()),
            ..JobQuery::default()
        };
        assert!(!q.matches(&p));
    }

    #[test]
    fn search_ors_title_company_and_description() {
        let p = posting("Data Scientist", "Microsoft", "Redmond", "Work on RUST tooling");
        for needle in ["scient", "MICROSOFT", "rust"] {
            let q = JobQuery {
                search: Some(needle.into()),
                ..JobQuery::default()
            };
            assert!(q.matches(&p), "search `{needle}` should match");
        }
        let q = JobQuery {
            search: Some("redmond".into()),
            ..JobQuery::default()
        };
        assert!(!q.matches(&p), "location is not part of free-text search");
    }

    #[test]
    fn page_math() {
        let q = JobQuery {
            page: 3,
            limit: 10,
            ..JobQuery::default()
        };
        assert_eq!(q.offset(), 20);
        let page = JobPage::new(&q, 21, vec![]);
        assert_eq!(page.total_pages, 3);
        assert!(!page.is_out_of_range());

        let q4 = JobQuery { page: 4, ..q };
        assert!(JobPage::new(&q4, 21, vec![]).is_out_of_range());
        assert!(!JobPage::new(&q4, 0, vec![]).is_out_of_range());
    }
}
