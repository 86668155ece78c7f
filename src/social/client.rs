use super::models::SearchResponse;
use crate::error::{CatalogError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::time::Duration as StdDuration;

const BASE_URL: &str = "https://api.twitter.com/2";
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Maximum posts requested per search.
const MAX_RESULTS: u32 = 10;

/// How far back the recent-search endpoint can see.
pub const LOOKBACK: Duration = Duration::days(7);

/// Offset from the start of the last known air date to the start of the
/// search window. Announcements for that episode are posted before its
/// broadcast, so anything earlier is already accounted for.
pub const ANNOUNCE_OFFSET: Duration = Duration::hours(22);

/// The parts of the announcement search query.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    /// The host account whose announcements are searched.
    pub host_handle: String,
    /// The show account, which the host mentions and which posts itself.
    pub show_handle: String,
    /// Phrases that mark a host post as an announcement.
    pub trigger_phrases: Vec<String>,
    /// Keyword that marks a show-account post as an announcement.
    pub show_keyword: String,
}

impl QuerySpec {
    /// Renders the boolean search expression: announcements by the host that
    /// mention the show, or posts by the show itself, carrying a link and
    /// excluding replies and reposts.
    pub fn render(&self) -> String {
        let phrases = self
            .trigger_phrases
            .iter()
            .map(|p| format!("\"{}\"", p))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!(
            "((from:{host} ({phrases}) @{show}) OR (from:{show} \"{keyword}\")) has:links -is:reply -is:retweet",
            host = self.host_handle,
            show = self.show_handle,
            phrases = phrases,
            keyword = self.show_keyword,
        )
    }
}

/// Computes the lower bound of the search window for updates after the
/// episode that aired on `since`.
///
/// The bound is clamped to the lookback limit of the search endpoint.
/// Returns `None` if the bound lies in the future, meaning there is nothing
/// to search for yet.
pub fn search_start(since: NaiveDate, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let midnight = since.and_hms_opt(0, 0, 0)?.and_utc();
    let start = (midnight + ANNOUNCE_OFFSET).max(now - LOOKBACK);
    (start <= now).then_some(start)
}

/// Client for the recent-search endpoint.
pub struct SearchClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SearchClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: BASE_URL.to_string(),
            token,
        }
    }

    /// Searches recent posts matching `query` created at or after `start`,
    /// with link and mention annotations and mentioned-user profiles.
    pub async fn search_recent(&self, query: &str, start: DateTime<Utc>) -> Result<SearchResponse> {
        let url = format!("{}/tweets/search/recent", self.base_url);
        let start_time = start.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let max_results = MAX_RESULTS.to_string();

        tracing::debug!(query, start_time = %start_time, "Searching recent posts");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("query", query),
                ("start_time", start_time.as_str()),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "created_at,entities,author_id"),
                ("user.fields", "description,url,entities"),
                ("expansions", "entities.mentions.username"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| CatalogError::Parse(format!("search reply: {}", e)))?;
        tracing::info!(count = parsed.data.len(), "Fetched posts");
        Ok(parsed)
    }
}
