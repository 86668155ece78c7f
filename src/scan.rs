//! Cross-referencing the audio feed against the episode log.
//!
//! Publication dates on the audio host differ from air dates and its episode
//! numbers are assigned by hand, so audio entries cannot be matched to
//! episodes automatically. Instead every recorded landing page is crossed
//! off and the leftovers are reported for a human to file.

use crate::episode::Episode;
use crate::error::{CatalogError, Result};
use crate::feed::AudioEpisode;
use std::collections::HashSet;
use std::fmt::Write as _;

/// Episodes that have no audio landing page recorded.
pub fn missing_audio(eps: &[Episode]) -> Vec<&Episode> {
    eps.iter().filter(|ep| ep.acast_url.is_empty()).collect()
}

/// Audio entries whose landing page is not recorded on any episode, in
/// feed order.
pub fn unrecorded_audio<'a>(audio: &'a [AudioEpisode], eps: &[Episode]) -> Vec<&'a AudioEpisode> {
    let recorded: HashSet<&str> = eps.iter().map(|ep| ep.acast_url.as_str()).collect();
    audio
        .iter()
        .filter(|a| !recorded.contains(a.page_link.as_str()))
        .collect()
}

/// Renders the leftovers as front-matter lines ready to paste into episode
/// files. Having nothing to report is an error.
pub fn render_leftovers(leftovers: &[&AudioEpisode]) -> Result<String> {
    if leftovers.is_empty() {
        return Err(CatalogError::NotFound("no audio episodes require updating".to_string()));
    }
    let mut out = String::new();
    for a in leftovers {
        let when = a
            .published
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        log::info!("{} {:?}", when, a.title);
        let _ = writeln!(out, "acast: {}", a.page_link);
        if !a.file_link.is_empty() {
            let _ = writeln!(out, "audio-file: {}", a.file_link);
        }
    }
    Ok(out)
}
