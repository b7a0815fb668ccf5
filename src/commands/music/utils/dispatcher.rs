//! Maps validated command intents onto queue operations.

use std::fmt;
use std::sync::Arc;

use serenity::all::{ChannelId, GuildId};
use tracing::{debug, info};

use super::embedded_messages;
use super::music_manager::{MusicError, MusicResult, QueueRegistry};
use super::queue_manager::{EnqueueOutcome, QueueSnapshot};
use crate::commands::music::audio_sources::TrackResolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Play { query: String },
    Skip,
    Stop,
    Queue,
    Pause,
    Resume,
    Volume { percent: i64 },
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play { .. } => "play",
            Self::Skip => "skip",
            Self::Stop => "stop",
            Self::Queue => "queue",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Volume { .. } => "volume",
        }
    }
}

/// A command that already passed the platform's own validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandIntent {
    pub kind: CommandKind,
    pub guild_id: GuildId,
    /// Only consulted for `play`.
    pub invoker_voice_channel: Option<ChannelId>,
    pub reply_channel: ChannelId,
}

/// The direct reply to the invoker, as opposed to queue-wide notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgement {
    Started { title: String },
    Queued { title: String, position: usize },
    Skipped,
    Stopped,
    Queue(QueueSnapshot),
    Paused,
    Resumed,
    Volume(u8),
}

impl fmt::Display for Acknowledgement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { title } => write!(
                f,
                "🎶 Now playing: **{}**",
                embedded_messages::escape_markdown(title)
            ),
            Self::Queued { title, position } => write!(
                f,
                "🎶 Queued **{}** at position #{}",
                embedded_messages::escape_markdown(title),
                position
            ),
            Self::Skipped => f.write_str("⏭️ Skipped the current song!"),
            Self::Stopped => f.write_str("⏹️ Music stopped and queue cleared!"),
            Self::Queue(snapshot) => f.write_str(&embedded_messages::queue_listing(snapshot)),
            Self::Paused => f.write_str("⏸️ Music paused!"),
            Self::Resumed => f.write_str("▶️ Music resumed!"),
            Self::Volume(percent) => write!(f, "🔊 Volume set to **{}%**", percent),
        }
    }
}

pub struct CommandDispatcher {
    registry: Arc<QueueRegistry>,
    resolver: Arc<dyn TrackResolver>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<QueueRegistry>, resolver: Arc<dyn TrackResolver>) -> Self {
        Self { registry, resolver }
    }

    pub async fn dispatch(&self, intent: CommandIntent) -> MusicResult<Acknowledgement> {
        let CommandIntent {
            kind,
            guild_id,
            invoker_voice_channel,
            reply_channel,
        } = intent;
        debug!("Dispatching {} for guild {}", kind.name(), guild_id);

        match kind {
            CommandKind::Play { query } => {
                let voice_channel = invoker_voice_channel.ok_or(MusicError::NoVoiceChannel)?;
                let track = self.resolver.resolve(&query).await.map_err(|e| match e {
                    MusicError::InvalidTrack(_) => e,
                    other => MusicError::InvalidTrack(other.to_string()),
                })?;
                let title = track.title().to_string();
                info!("Resolved '{}' to '{}' for guild {}", query, title, guild_id);

                let outcome = self
                    .registry
                    .enqueue(guild_id, reply_channel, voice_channel, track)
                    .await?;
                Ok(match outcome {
                    EnqueueOutcome::Started => Acknowledgement::Started { title },
                    EnqueueOutcome::Queued { position } => Acknowledgement::Queued { title, position },
                })
            }
            CommandKind::Skip => {
                self.registry.skip(guild_id, reply_channel).await?;
                Ok(Acknowledgement::Skipped)
            }
            CommandKind::Stop => {
                self.registry.stop(guild_id, reply_channel).await?;
                Ok(Acknowledgement::Stopped)
            }
            CommandKind::Queue => {
                let snapshot = self.registry.snapshot(guild_id, reply_channel).await?;
                Ok(Acknowledgement::Queue(snapshot))
            }
            CommandKind::Pause => {
                self.registry.pause(guild_id, reply_channel).await?;
                Ok(Acknowledgement::Paused)
            }
            CommandKind::Resume => {
                self.registry.resume(guild_id, reply_channel).await?;
                Ok(Acknowledgement::Resumed)
            }
            CommandKind::Volume { percent } => {
                let volume = self
                    .registry
                    .set_volume(guild_id, reply_channel, percent)
                    .await?;
                Ok(Acknowledgement::Volume(volume))
            }
        }
    }
}
