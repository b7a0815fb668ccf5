//! Track resolution: turning the text of a `/play` request into a [`Track`].

/// Submodule defining the immutable [`Track`] value.
pub mod track;
/// Submodule implementing [`TrackResolver`] on top of `yt-dlp`.
pub mod youtube;

use serenity::async_trait;
use url::Url;

use crate::commands::music::utils::music_manager::MusicResult;

pub use track::Track;
pub use youtube::YtDlpResolver;

/// Turns a user query or URL into a playable [`Track`].
///
/// Implementations report any failure as [`MusicError::InvalidTrack`].
///
/// [`MusicError::InvalidTrack`]: crate::commands::music::utils::music_manager::MusicError::InvalidTrack
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> MusicResult<Track>;
}

/// A utility struct providing general helper functions related to audio sources.
pub struct AudioSource;

impl AudioSource {
    /// Checks whether the input is an http(s) URL. Does not check that anything lives there.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }
}
