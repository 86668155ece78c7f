//! The audio feed for the show.
//!
//! Entries are read with `feed_rs`. A second pass over the raw XML picks up
//! the host-specific extension fields (`acast:*`, `itunes:subtitle`,
//! `itunes:duration`) that the feed model does not carry.

use crate::error::{CatalogError, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::{ElementRef, Html};
use serde::{Serialize, Serializer};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const AUDIO_MIME: &str = "audio/mpeg";
const SHOW_PAGE_BASE: &str = "https://shows.acast.com";

/// Metadata about one audio recording, distilled from the feed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioEpisode {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subtitle: String,
    /// Plain-text description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Landing page for the episode.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub page_link: String,
    /// The audio file itself.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file_link: String,
    /// Links embedded in the description.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub desc_links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(
        rename = "durationSec",
        serialize_with = "duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Duration>,
    #[serde(rename = "rawDescription", skip_serializing_if = "String::is_empty")]
    pub raw_description: String,
}

fn duration_secs<S: Serializer>(d: &Option<Duration>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_u64(d.as_secs()),
        None => s.serialize_none(),
    }
}

/// Fetches and parses the audio feed at `url`.
pub async fn load_audio_feed(url: &str) -> Result<Vec<AudioEpisode>> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default();

    log::info!("Fetching audio feed from: {}", url);
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CatalogError::Http {
            status: status.as_u16(),
            message: body,
        });
    }
    let body = response.text().await?;
    let eps = parse_audio_feed(&body)?;
    tracing::info!(count = eps.len(), "Parsed audio feed");
    Ok(eps)
}

/// Parses the text of an audio feed.
pub fn parse_audio_feed(body: &str) -> Result<Vec<AudioEpisode>> {
    let feed = feed_rs::parser::parse(body.as_bytes())?;
    let extras = scan_extensions(body)?;
    if extras.items.len() != feed.entries.len() {
        log::warn!(
            "Feed has {} entries but {} items; ignoring extension fields",
            feed.entries.len(),
            extras.items.len()
        );
    }
    let aligned = extras.items.len() == feed.entries.len();

    let mut eps = Vec::with_capacity(feed.entries.len());
    for (i, entry) in feed.entries.into_iter().enumerate() {
        let extra = if aligned { extras.items.get(i) } else { None };

        let raw = entry.summary.map(|s| s.content).unwrap_or_default();
        let flat = flatten_html(&raw);
        let mut ep = AudioEpisode {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            description: flat.text,
            desc_links: flat.links,
            raw_description: raw,
            published: entry.published,
            ..Default::default()
        };

        ep.page_link = entry
            .links
            .iter()
            .find(|l| l.media_type.as_deref() != Some(AUDIO_MIME))
            .map(|l| l.href.clone())
            .unwrap_or_default();

        // The item link is not always the real landing page; prefer the
        // page named by the host extension.
        if let Some(x) = extra {
            if !x.episode_url.is_empty() && !extras.show_url.is_empty() {
                ep.page_link = format!("{}/{}/episodes/{}", SHOW_PAGE_BASE, extras.show_url, x.episode_url);
            }
            ep.subtitle = x.subtitle.clone();
        }

        let audio = entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .find(|c| {
                c.content_type
                    .as_ref()
                    .map_or(false, |t| t.to_string() == AUDIO_MIME)
            });
        ep.file_link = audio
            .and_then(|c| c.url.as_ref())
            .map(|u| u.to_string())
            .or_else(|| {
                entry
                    .links
                    .iter()
                    .find(|l| l.media_type.as_deref() == Some(AUDIO_MIME))
                    .map(|l| l.href.clone())
            })
            .unwrap_or_default();

        ep.duration = audio
            .and_then(|c| c.duration)
            .or_else(|| entry.media.iter().find_map(|m| m.duration))
            .or_else(|| {
                let raw = extra.map(|x| x.duration.as_str()).unwrap_or("");
                if raw.is_empty() {
                    return None;
                }
                match parse_audio_duration(raw) {
                    Ok(d) => Some(d),
                    Err(e) => {
                        log::warn!("Bad duration for {:?}: {}", ep.title, e);
                        None
                    }
                }
            });

        eps.push(ep);
    }
    Ok(eps)
}

#[derive(Debug, Default)]
struct ItemExtras {
    episode_url: String,
    subtitle: String,
    duration: String,
}

#[derive(Debug, Default)]
struct FeedExtras {
    show_url: String,
    items: Vec<ItemExtras>,
}

fn scan_extensions(body: &str) -> Result<FeedExtras> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut extras = FeedExtras::default();
    let mut item: Option<ItemExtras> = None;
    let mut field: Option<Vec<u8>> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if name == b"item" {
                    item = Some(ItemExtras::default());
                }
                field = Some(name);
            }
            Event::End(e) => {
                if e.name().as_ref() == b"item" {
                    if let Some(done) = item.take() {
                        extras.items.push(done);
                    }
                }
                field = None;
            }
            Event::Text(t) => {
                if let Some(name) = field.as_deref() {
                    if is_tracked(name) {
                        let value = t.unescape()?.into_owned();
                        assign_extra(&mut extras, item.as_mut(), name, value);
                    }
                }
            }
            Event::CData(c) => {
                if let Some(name) = field.as_deref() {
                    if is_tracked(name) {
                        let value = String::from_utf8_lossy(&c).into_owned();
                        assign_extra(&mut extras, item.as_mut(), name, value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(extras)
}

fn is_tracked(name: &[u8]) -> bool {
    matches!(
        name,
        b"acast:showUrl" | b"acast:episodeUrl" | b"itunes:subtitle" | b"itunes:duration"
    )
}

fn assign_extra(extras: &mut FeedExtras, item: Option<&mut ItemExtras>, name: &[u8], value: String) {
    let value = value.trim().to_string();
    match (item, name) {
        (None, b"acast:showUrl") => extras.show_url = value,
        (Some(it), b"acast:episodeUrl") => it.episode_url = value,
        (Some(it), b"itunes:subtitle") => it.subtitle = value,
        (Some(it), b"itunes:duration") => it.duration = value,
        _ => {}
    }
}

/// Parses a duration of the form `[[HH:]MM:]SS`.
pub fn parse_audio_duration(s: &str) -> Result<Duration> {
    const UNITS: [u64; 3] = [1, 60, 3600];
    let mut secs = 0u64;
    for (part, unit) in s.trim().rsplitn(3, ':').zip(UNITS) {
        let n: u64 = part
            .parse()
            .map_err(|_| CatalogError::Parse(format!("invalid duration {:?}", s)))?;
        secs += n * unit;
    }
    Ok(Duration::from_secs(secs))
}

/// Text and links recovered from an HTML fragment.
#[derive(Debug, Default, PartialEq)]
pub struct FlatText {
    pub text: String,
    pub links: Vec<String>,
}

/// Flattens an HTML description to plain text.
///
/// Closing a top-level paragraph ends a line, as does a break inside a
/// paragraph. A break outside any paragraph marks the start of the host's
/// boilerplate, and everything after it is dropped. Anchor targets are
/// collected in order.
pub fn flatten_html(s: &str) -> FlatText {
    let fragment = Html::parse_fragment(s);
    let mut flat = FlatText::default();
    flat.walk(fragment.root_element(), false);

    flat.text = flat
        .text
        .trim()
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    flat
}

impl FlatText {
    /// Appends the contents of `el`. Returns false once the boilerplate
    /// cutoff is reached.
    fn walk(&mut self, el: ElementRef<'_>, in_para: bool) -> bool {
        for node in el.children() {
            if let Some(text) = node.value().as_text() {
                self.text.push_str(text);
                continue;
            }
            let Some(child) = ElementRef::wrap(node) else {
                continue;
            };
            match child.value().name() {
                "br" if !in_para => return false,
                "br" => self.text.push('\n'),
                "p" => {
                    if !self.walk(child, true) {
                        return false;
                    }
                    if !in_para {
                        self.text.push('\n');
                    }
                }
                name => {
                    if name == "a" {
                        if let Some(href) = child.value().attr("href") {
                            self.links.push(href.to_string());
                        }
                    }
                    if !self.walk(child, in_para) {
                        return false;
                    }
                }
            }
        }
        true
    }
}
