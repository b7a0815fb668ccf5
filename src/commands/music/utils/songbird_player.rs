use std::sync::Arc;

use reqwest::Client as HttpClient;
use serenity::all::GuildId;
use serenity::async_trait;
use songbird::id::ChannelId as VoiceChannelId;
use songbird::input::YoutubeDl;
use songbird::tracks::{ControlError, Track as SongbirdTrack, TrackHandle};
use songbird::{Event, Songbird, TrackEvent};
use tracing::{debug, info, warn};

use super::event_handlers::{TrackEndNotifier, TrackErrorNotifier};
use super::music_manager::{MusicError, MusicResult};
use super::session::{PlaybackSession, SessionFactory, SessionRequest};

/// Convert a volume percentage into songbird's linear gain.
pub fn gain(percent: u8) -> f32 {
    f32::from(percent) / 100.0
}

/// Opens sessions by streaming tracks through yt-dlp into a songbird call.
pub struct SongbirdPlayer {
    songbird: Arc<Songbird>,
    http: HttpClient,
    program: &'static str,
}

impl SongbirdPlayer {
    pub fn new(songbird: Arc<Songbird>, http: HttpClient, program: &'static str) -> Self {
        Self {
            songbird,
            http,
            program,
        }
    }
}

#[async_trait]
impl SessionFactory for SongbirdPlayer {
    async fn open(&self, request: SessionRequest) -> MusicResult<Box<dyn PlaybackSession>> {
        let SessionRequest {
            guild_id,
            voice_channel,
            track,
            volume,
            session_id,
            events,
        } = request;

        let existing = self.songbird.get(guild_id);
        let in_place = match &existing {
            Some(call) => {
                let current = call.lock().await.current_channel();
                voice_channel.is_none_or(|channel_id| current == Some(VoiceChannelId::from(channel_id)))
            }
            None => false,
        };

        let call = match existing {
            Some(call) if in_place => call,
            _ => {
                let channel_id = voice_channel.ok_or_else(|| {
                    MusicError::SessionError("No voice channel to join".to_string())
                })?;
                // Joining again moves a call that lingers in another channel.
                info!("Joining voice channel {} in guild {}", channel_id, guild_id);
                self.songbird
                    .join(guild_id, channel_id)
                    .await
                    .map_err(|e| MusicError::SessionError(format!("Failed to join voice channel: {}", e)))?
            }
        };

        let input = YoutubeDl::new_ytdl_like(
            self.program,
            self.http.clone(),
            track.source_ref().to_string(),
        );
        let handle = {
            let mut handler = call.lock().await;
            handler.play(SongbirdTrack::new(input.into()).volume(gain(volume)))
        };
        debug!("Started {} for '{}' in guild {}", session_id, track.title(), guild_id);

        let end = handle.add_event(
            Event::Track(TrackEvent::End),
            TrackEndNotifier::new(guild_id, session_id, events.clone()),
        );
        let error = handle.add_event(
            Event::Track(TrackEvent::Error),
            TrackErrorNotifier::new(guild_id, session_id, events),
        );

        if let Err(e) = end.and(error) {
            // Without its handlers the queue would never hear about this track again.
            let _ = handle.stop();
            return Err(session_error(e));
        }

        Ok(Box::new(SongbirdSession { handle }))
    }

    async fn release(&self, guild_id: GuildId) -> MusicResult<()> {
        if self.songbird.get(guild_id).is_none() {
            debug!("Not connected to voice in guild {}", guild_id);
            return Ok(());
        }

        self.songbird
            .remove(guild_id)
            .await
            .map_err(|e| MusicError::SessionError(format!("Failed to leave voice channel: {}", e)))?;
        info!("Left voice channel in guild {}", guild_id);
        Ok(())
    }
}

/// A single songbird track.
pub struct SongbirdSession {
    handle: TrackHandle,
}

#[async_trait]
impl PlaybackSession for SongbirdSession {
    async fn pause(&self) -> MusicResult<()> {
        self.handle.pause().map_err(session_error)
    }

    async fn resume(&self) -> MusicResult<()> {
        self.handle.play().map_err(session_error)
    }

    async fn set_volume(&self, percent: u8) -> MusicResult<()> {
        self.handle.set_volume(gain(percent)).map_err(session_error)
    }

    async fn stop(&self) -> MusicResult<()> {
        match self.handle.stop() {
            Ok(()) | Err(ControlError::Finished) => Ok(()),
            Err(e) => {
                warn!("Track {} refused to stop: {}", self.handle.uuid(), e);
                Err(session_error(e))
            }
        }
    }
}

fn session_error(e: ControlError) -> MusicError {
    MusicError::SessionError(e.to_string())
}
