use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serenity::all::{ChannelId, CreateMessage, Http};
use serenity::async_trait;

use super::{embedded_messages, format_duration};
use crate::Error;
use crate::commands::music::audio_sources::Track;

/// Longest error text shown to users.
pub const ERROR_EXCERPT_LEN: usize = 200;

/// Cut a message down to [`ERROR_EXCERPT_LEN`] characters.
pub fn excerpt(message: &str) -> String {
    message.chars().take(ERROR_EXCERPT_LEN).collect()
}

/// A queue-wide announcement, sent to the guild's reply channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    SongStarted { title: String, duration: Duration },
    SongAdded { title: String },
    Error { message: String },
}

impl QueueEvent {
    pub fn song_started(track: &Track) -> Self {
        Self::SongStarted {
            title: track.title().to_string(),
            duration: track.duration(),
        }
    }

    pub fn song_added(track: &Track) -> Self {
        Self::SongAdded {
            title: track.title().to_string(),
        }
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Self::Error {
            message: excerpt(&message.to_string()),
        }
    }
}

impl fmt::Display for QueueEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SongStarted { title, duration } => write!(
                f,
                "▶️ Now playing: **{}** - {}",
                embedded_messages::escape_markdown(title),
                format_duration(*duration)
            ),
            Self::SongAdded { title } => {
                write!(f, "➕ Added: **{}**", embedded_messages::escape_markdown(title))
            }
            Self::Error { message } => write!(f, "⚠️ Error: {}", message),
        }
    }
}

/// Delivers [`QueueEvent`]s. Delivery is best effort: the queue logs failures and
/// carries on.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    async fn notify(&self, channel: ChannelId, event: &QueueEvent) -> Result<(), Error>;
}

/// Posts events as embeds in a Discord text channel.
pub struct ChannelNotifier {
    http: Arc<Http>,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl EventNotifier for ChannelNotifier {
    async fn notify(&self, channel: ChannelId, event: &QueueEvent) -> Result<(), Error> {
        let message = CreateMessage::new().embed(embedded_messages::queue_event(event));
        channel.send_message(&self.http, message).await?;
        Ok(())
    }
}
