//! Read access to the published episode index.
//!
//! The site publishes JSON views of the episode log: the latest episode,
//! one file per episode, and the full list.

use crate::episode::{Episode, Label, Link};
use crate::error::{CatalogError, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An episode as the site publishes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEpisode {
    pub episode: Label,
    pub air_date: NaiveDate,
    pub season: Option<u32>,
    #[serde(default)]
    pub guest_names: Vec<String>,
    #[serde(default)]
    pub topics: String,
    #[serde(default)]
    pub summary: String,
    #[serde(rename = "crowdcastURL", default)]
    pub crowdcast_url: String,
    #[serde(rename = "youTubeURL", default)]
    pub youtube_url: String,
    #[serde(rename = "acastURL", default)]
    pub acast_url: String,
    #[serde(rename = "audioFileURL", default)]
    pub audio_file_url: String,
    #[serde(default)]
    pub special: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub detail: String,
}

impl From<SiteEpisode> for Episode {
    fn from(s: SiteEpisode) -> Self {
        let mut ep = Episode::new(s.episode, s.air_date);
        ep.season = s.season;
        ep.guests = s.guest_names;
        ep.topics = s.topics;
        ep.summary = s.summary;
        ep.crowdcast_url = s.crowdcast_url;
        ep.youtube_url = s.youtube_url;
        ep.acast_url = s.acast_url;
        ep.audio_file_url = s.audio_file_url;
        ep.special = s.special;
        ep.tags = s.tags;
        ep.links = s.links;
        ep.detail = s.detail;
        ep
    }
}

#[derive(Debug, Deserialize)]
struct LatestReply {
    latest: Option<SiteEpisode>,
}

#[derive(Debug, Deserialize)]
struct EpisodeReply {
    episode: Option<SiteEpisode>,
}

#[derive(Debug, Deserialize)]
struct EpisodesReply {
    #[serde(default)]
    episodes: Vec<SiteEpisode>,
}

/// Client for the site's JSON endpoints.
pub struct SiteClient {
    client: reqwest::Client,
    base_url: String,
}

impl SiteClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(url));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CatalogError::Parse(format!("{}: {}", url, e)))
    }

    /// Fetches the most recent episode in the log.
    pub async fn latest_episode(&self) -> Result<Episode> {
        let reply: LatestReply = self.get_json("latest.json").await?;
        reply
            .latest
            .map(Episode::from)
            .ok_or_else(|| CatalogError::NotFound("latest episode".to_string()))
    }

    /// Fetches one episode by label.
    pub async fn episode(&self, label: &str) -> Result<Episode> {
        let reply: EpisodeReply = self.get_json(&format!("episode/{}.json", label)).await?;
        reply
            .episode
            .map(Episode::from)
            .ok_or_else(|| CatalogError::NotFound(format!("episode {}", label)))
    }

    /// Fetches every episode in the log.
    pub async fn all_episodes(&self) -> Result<Vec<Episode>> {
        let reply: EpisodesReply = self.get_json("episodes.json").await?;
        log::info!("Loaded {} episodes from {}", reply.episodes.len(), self.base_url);
        Ok(reply.episodes.into_iter().map(Episode::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_episode_decodes_numeric_and_textual_labels() {
        let reply: EpisodesReply = serde_json::from_str(
            r#"{"episodes": [
                {"episode": 101, "airDate": "2020-12-02", "guestNames": ["Alice"],
                 "youTubeURL": "https://www.youtube.com/watch?v=a", "acastURL": "https://shows.acast.com/x/episodes/101"},
                {"episode": "holiday-special", "airDate": "2020-12-25", "special": true}
            ]}"#,
        )
        .unwrap();
        let eps: Vec<Episode> = reply.episodes.into_iter().map(Episode::from).collect();

        assert_eq!(eps[0].episode, Label::Numeric(101.0));
        assert_eq!(eps[0].guests, vec!["Alice"]);
        assert_eq!(eps[0].acast_url, "https://shows.acast.com/x/episodes/101");
        assert_eq!(eps[1].episode, Label::Textual("holiday-special".into()));
        assert_eq!(eps[1].episode.number(), -1.0);
        assert!(eps[1].special);
    }

    #[test]
    fn test_latest_reply_decodes() {
        let reply: LatestReply =
            serde_json::from_str(r#"{"latest": {"episode": 250, "airDate": "2021-06-30"}}"#).unwrap();
        let ep = Episode::from(reply.latest.unwrap());
        assert_eq!(ep.episode.as_whole(), Some(250));
        assert_eq!(ep.date, NaiveDate::from_ymd_opt(2021, 6, 30).unwrap());
    }
}
