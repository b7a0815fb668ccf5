//! Defines [`Track`], the immutable description of one queue entry.

use std::time::Duration;

use serde::Deserialize;

use crate::commands::music::utils::format_duration;
use crate::commands::music::utils::music_manager::{MusicError, MusicResult};

const UNKNOWN_TITLE: &str = "Unknown Track";

/// One playable queue entry. Nothing in the queue core looks inside `source_ref`;
/// it is handed back to the player when the track's turn comes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    title: String,
    duration: Duration,
    source_ref: String,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        duration: Duration,
        source_ref: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            UNKNOWN_TITLE.to_string()
        } else {
            title
        };

        Self {
            title,
            duration: Duration::from_secs(duration.as_secs()),
            source_ref: source_ref.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    pub fn formatted_duration(&self) -> String {
        format_duration(self.duration)
    }

    /// Builds a track from the output of `yt-dlp -j`. Searches print one JSON
    /// document per line; the first one wins.
    pub fn from_ytdlp_json(output: &str) -> MusicResult<Track> {
        let line = output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| MusicError::InvalidTrack("No results found".to_string()))?;

        let info: YtDlpInfo = serde_json::from_str(line).map_err(|e| {
            MusicError::InvalidTrack(format!("Failed to parse video metadata: {}", e))
        })?;

        let source_ref = info
            .webpage_url
            .or(info.original_url)
            .ok_or_else(|| MusicError::InvalidTrack("Result has no playable URL".to_string()))?;

        // Live streams report no duration.
        let duration = info
            .duration
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| Duration::from_secs(secs.round() as u64))
            .unwrap_or_default();

        Ok(Track::new(info.title.unwrap_or_default(), duration, source_ref))
    }
}

/// The subset of `yt-dlp --dump-json` we care about.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    original_url: Option<String>,
}
