use serenity::all::GuildId;
use serenity::async_trait;
use songbird::tracks::PlayMode;
use tracing::{debug, error};

use super::session::{SessionEventSender, SessionId};

/// Event handler for when a track ends, whether it finished or was stopped
pub struct TrackEndNotifier {
    guild_id: GuildId,
    session_id: SessionId,
    events: SessionEventSender,
}

impl TrackEndNotifier {
    pub fn new(guild_id: GuildId, session_id: SessionId, events: SessionEventSender) -> Self {
        Self {
            guild_id,
            session_id,
            events,
        }
    }
}

#[async_trait]
impl songbird::EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(_) = ctx {
            debug!("{} ended in guild {}", self.session_id, self.guild_id);
            self.events.ended(self.guild_id, self.session_id);
        }
        None
    }
}

/// Event handler for when songbird gives up on a track
pub struct TrackErrorNotifier {
    guild_id: GuildId,
    session_id: SessionId,
    events: SessionEventSender,
}

impl TrackErrorNotifier {
    pub fn new(guild_id: GuildId, session_id: SessionId, events: SessionEventSender) -> Self {
        Self {
            guild_id,
            session_id,
            events,
        }
    }
}

#[async_trait]
impl songbird::EventHandler for TrackErrorNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            let message = tracks
                .iter()
                .find_map(|(state, _)| match &state.playing {
                    PlayMode::Errored(e) => Some(e.to_string()),
                    _ => None,
                })
                .unwrap_or_else(|| "Track playback failed".to_string());

            error!("{} failed in guild {}: {}", self.session_id, self.guild_id, message);
            self.events.errored(self.guild_id, self.session_id, message);
        }
        None
    }
}
