//! Video metadata lookups.

use crate::error::{CatalogError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Metadata about a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    #[serde(skip)]
    pub id: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Option<VideoInfo>,
}

/// Client for the video metadata API.
pub struct VideoClient {
    client: reqwest::Client,
    api_key: String,
}

impl VideoClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key,
        }
    }

    /// Fetches metadata for video `id`. Returns `Ok(None)` if no such video
    /// is listed.
    pub async fn video_info(&self, id: &str) -> Result<Option<VideoInfo>> {
        let response = self
            .client
            .get(VIDEOS_URL)
            .header("Accept", "application/json")
            .query(&[("id", id), ("key", self.api_key.as_str()), ("part", "snippet")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let info = parse_video_list(id, &body)?;
        tracing::info!(id, found = info.is_some(), "Fetched video metadata");
        Ok(info)
    }
}

/// Picks the snippet for `id` out of a video list reply.
fn parse_video_list(id: &str, body: &str) -> Result<Option<VideoInfo>> {
    let msg: VideoListResponse = serde_json::from_str(body)
        .map_err(|e| CatalogError::Parse(format!("video list reply: {}", e)))?;
    Ok(msg
        .items
        .into_iter()
        .find(|item| item.id == id)
        .and_then(|item| item.snippet)
        .map(|mut info| {
            info.id = id.to_string();
            info
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_list_finds_matching_item() {
        let body = r#"{
            "items": [
                {"id": "other", "snippet": {"title": "Wrong"}},
                {"id": "nphZCMuhgUU", "snippet": {
                    "publishedAt": "2020-12-02T22:00:00Z",
                    "channelId": "UC123",
                    "channelTitle": "In Lieu of Fun",
                    "title": "Episode 101",
                    "description": "It's cheese night!"
                }}
            ]
        }"#;
        let info = parse_video_list("nphZCMuhgUU", body).unwrap().unwrap();
        assert_eq!(info.id, "nphZCMuhgUU");
        assert_eq!(info.title, "Episode 101");
        assert_eq!(info.channel_title, "In Lieu of Fun");
        assert_eq!(info.description, "It's cheese night!");
        assert!(info.published_at.is_some());
    }

    #[test]
    fn test_parse_video_list_missing_id_is_none() {
        assert!(parse_video_list("abc", r#"{"items": []}"#).unwrap().is_none());
        assert!(parse_video_list("abc", r#"{}"#).unwrap().is_none());
    }

    #[test]
    fn test_parse_video_list_garbage_is_error() {
        let err = parse_video_list("abc", "<html>").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }
}
