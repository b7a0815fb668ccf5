//! Resolves queries into [`Track`]s with the `yt-dlp` command-line tool.

use serenity::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{AudioSource, Track, TrackResolver};
use crate::commands::music::utils::music_manager::{MusicError, MusicResult};
use crate::commands::music::utils::notifier::excerpt;

/// Resolves URLs directly and anything else through a YouTube search.
pub struct YtDlpResolver {
    program: String,
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// What to hand to `yt-dlp`: URLs as-is, everything else as a single-result search.
    pub fn target_for(query: &str) -> String {
        let query = query.trim();
        if AudioSource::is_url(query) {
            query.to_string()
        } else {
            format!("ytsearch1:{}", query)
        }
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> MusicResult<Track> {
        if query.trim().is_empty() {
            return Err(MusicError::InvalidTrack("Empty query".to_string()));
        }

        let target = Self::target_for(query);
        info!("Resolving track with yt-dlp: {}", target);

        let output = Command::new(&self.program)
            .args([
                "-j",            // Output as JSON
                "--no-playlist", // Don't process playlists
                target.as_str(),
            ])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MusicError::InvalidTrack(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp exited with {} for {}: {}", output.status, target, stderr.trim());
            return Err(MusicError::InvalidTrack(excerpt(stderr.trim())));
        }

        let track = Track::from_ytdlp_json(&String::from_utf8_lossy(&output.stdout))?;
        debug!("Resolved {} to {:?}", target, track);
        Ok(track)
    }
}
