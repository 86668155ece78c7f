//! Caption tracks for episode videos.

use crate::error::{CatalogError, Result};
use crate::links;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CAPTIONS_NEEDLE: &str = "\"captions\":";

/// A caption track offered on the watch page.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub url: String,
    #[serde(rename = "languageCode", default)]
    pub lang: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct CaptionsBlob {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    renderer: Option<TrackList>,
}

#[derive(Debug, Deserialize)]
struct TrackList {
    #[serde(rename = "captionTracks", default)]
    tracks: Vec<CaptionTrack>,
}

/// One timed line of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    pub start_sec: f64,
    pub duration_sec: f64,
    pub text: String,
}

/// The full caption text of a video.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    #[serde(rename = "videoID")]
    pub video_id: String,
    #[serde(rename = "captionsURL")]
    pub captions_url: String,
    pub captions: Vec<Caption>,
}

/// Finds the caption track URL in the text of a watch page.
///
/// English is preferred; otherwise the first track wins. Returns `Ok(None)`
/// if the video exists but has no captions.
pub fn find_caption_url(video_id: &str, page: &str) -> Result<Option<String>> {
    let Some(pos) = page.find(CAPTIONS_NEEDLE) else {
        if page.contains(r#"class="g-recaptcha""#) {
            return Err(CatalogError::RateLimited);
        }
        if !page.contains("playabilityStatus") {
            return Err(CatalogError::NotFound(format!("video ID {:?}", video_id)));
        }
        return Ok(None);
    };

    // The blob is followed by the rest of the page; decode one value only.
    let rest = &page[pos + CAPTIONS_NEEDLE.len()..];
    let blob: CaptionsBlob = serde_json::Deserializer::from_str(rest)
        .into_iter::<CaptionsBlob>()
        .next()
        .ok_or_else(|| CatalogError::Parse("empty captions blob".to_string()))??;

    let tracks = blob.renderer.map(|r| r.tracks).unwrap_or_default();
    let pick = tracks
        .iter()
        .find(|t| t.lang == "en")
        .or_else(|| tracks.first())
        .map(|t| t.url.clone());
    Ok(pick)
}

/// Parses a caption XML document.
pub fn parse_transcript_xml(xml: &str) -> Result<Vec<Caption>> {
    let mut reader = Reader::from_str(xml);
    let mut captions = Vec::new();
    let mut current: Option<Caption> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"text" => {
                let mut cap = Caption {
                    start_sec: 0.0,
                    duration_sec: 0.0,
                    text: String::new(),
                };
                for attr in e.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    let value = attr.unescape_value()?;
                    match attr.key.as_ref() {
                        b"start" => cap.start_sec = parse_seconds(&value)?,
                        b"dur" => cap.duration_sec = parse_seconds(&value)?,
                        _ => {}
                    }
                }
                current = Some(cap);
            }
            Event::Text(t) => {
                if let Some(cap) = current.as_mut() {
                    cap.text.push_str(&t.unescape()?);
                }
            }
            Event::End(e) if e.name().as_ref() == b"text" => {
                if let Some(mut cap) = current.take() {
                    // Caption text arrives entity-encoded inside the XML.
                    cap.text = decode_html(&cap.text);
                    captions.push(cap);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(captions)
}

fn parse_seconds(s: &str) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|_| CatalogError::Parse(format!("invalid caption time {:?}", s)))
}

fn decode_html(s: &str) -> String {
    quick_xml::escape::unescape(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

/// Client for caption discovery and download.
pub struct CaptionClient {
    client: reqwest::Client,
}

impl Default for CaptionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Http {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response.text().await?)
    }

    /// Returns the caption track URL for `video_id`, or `Ok(None)` if the
    /// video has no captions.
    pub async fn caption_url(&self, video_id: &str) -> Result<Option<String>> {
        let page = self.fetch_text(links::watch_url(video_id).as_str()).await?;
        let url = find_caption_url(video_id, &page)?;
        tracing::info!(video_id, found = url.is_some(), "Checked watch page for captions");
        Ok(url)
    }

    /// Downloads and parses the caption track at `url`.
    pub async fn transcript(&self, video_id: &str, url: &str) -> Result<Transcript> {
        let xml = self.fetch_text(url).await?;
        let captions = parse_transcript_xml(&xml)?;
        tracing::info!(video_id, count = captions.len(), "Downloaded captions");
        Ok(Transcript {
            video_id: video_id.to_string(),
            captions_url: url.to_string(),
            captions,
        })
    }
}
