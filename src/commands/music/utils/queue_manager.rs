//! The per-guild queue and its playback state machine.
//!
//! ```text
//! Idle --enqueue--> Playing <--pause/resume--> Paused
//!   ^                  |                          |
//!   +--skip/end (last)-+--------------------------+
//!                      |
//!                    stop --> Stopped (retired, removed from the registry)
//! ```
//!
//! A `GuildQueue` is only ever reached through its registry mutex, so each
//! method below runs to completion, awaits included, before the next one starts.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serenity::all::{ChannelId, GuildId};
use tracing::{debug, error, info, warn};

use super::music_manager::{MusicError, MusicResult};
use super::notifier::{EventNotifier, QueueEvent};
use super::session::{PlaybackSession, SessionEventSender, SessionFactory, SessionId, SessionRequest};
use crate::commands::music::audio_sources::Track;

pub const DEFAULT_VOLUME: u8 = 100;
pub const MIN_VOLUME: i64 = 1;
pub const MAX_VOLUME: i64 = 100;

/// Range check for volume requests, done before any queue is looked at.
pub fn validate_volume(percent: i64) -> MusicResult<u8> {
    if (MIN_VOLUME..=MAX_VOLUME).contains(&percent) {
        Ok(percent as u8)
    } else {
        Err(MusicError::InvalidVolume(percent))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Collaborators shared by every queue of one registry.
#[derive(Clone)]
pub struct QueueContext {
    pub player: Arc<dyn SessionFactory>,
    pub notifier: Arc<dyn EventNotifier>,
    pub events: SessionEventSender,
    /// Bound on opening/stopping a session and on sending a notification.
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The queue was idle; this track is now playing.
    Started,
    /// Appended behind the current track at this position (1 = next up).
    Queued { position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipOutcome {
    pub skipped: Track,
    pub now_playing: Option<Track>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAdvance {
    /// The event belonged to a session that is no longer live.
    Stale,
    Advanced(Track),
    /// The last track ended; the queue is idle.
    Drained,
}

/// Read-only copy of a queue, safe to hold after the lock is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub guild_id: GuildId,
    pub tracks: Vec<Track>,
    pub state: PlaybackState,
    pub volume: u8,
    pub reply_channel: Option<ChannelId>,
}

struct LiveSession {
    id: SessionId,
    handle: Box<dyn PlaybackSession>,
}

pub struct GuildQueue {
    guild_id: GuildId,
    tracks: VecDeque<Track>,
    state: PlaybackState,
    volume: u8,
    session: Option<LiveSession>,
    reply_channel: Option<ChannelId>,
    voice_channel: Option<ChannelId>,
    context: QueueContext,
}

impl GuildQueue {
    pub fn new(guild_id: GuildId, context: QueueContext) -> Self {
        Self {
            guild_id,
            tracks: VecDeque::new(),
            state: PlaybackState::Idle,
            volume: DEFAULT_VOLUME,
            session: None,
            reply_channel: None,
            voice_channel: None,
            context,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn tracks(&self) -> impl ExactSizeIterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.id)
    }

    /// A stopped queue is finished for good; the registry drops it.
    pub fn is_retired(&self) -> bool {
        self.state == PlaybackState::Stopped
    }

    pub fn set_reply_channel(&mut self, channel: ChannelId) {
        if self.reply_channel != Some(channel) {
            debug!("Reply channel for guild {} is now {}", self.guild_id, channel);
            self.reply_channel = Some(channel);
        }
    }

    /// The queue plays wherever the member who started it from idle is.
    pub fn set_voice_channel(&mut self, channel: ChannelId) {
        if self.state == PlaybackState::Idle && self.voice_channel != Some(channel) {
            debug!("Voice channel for guild {} is now {}", self.guild_id, channel);
            self.voice_channel = Some(channel);
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            guild_id: self.guild_id,
            tracks: self.tracks.iter().cloned().collect(),
            state: self.state,
            volume: self.volume,
            reply_channel: self.reply_channel,
        }
    }

    /// Append a track, starting playback if the queue was idle.
    pub async fn enqueue(&mut self, track: Track) -> MusicResult<EnqueueOutcome> {
        if self.is_retired() {
            return Err(MusicError::EmptyQueue);
        }

        info!("Queueing '{}' for guild {}", track.title(), self.guild_id);
        let event = QueueEvent::song_added(&track);
        self.tracks.push_back(track);

        let outcome = if self.state == PlaybackState::Idle {
            self.play_current().await?;
            EnqueueOutcome::Started
        } else {
            self.notify(event).await;
            EnqueueOutcome::Queued {
                position: self.tracks.len() - 1,
            }
        };

        self.check_invariants();
        Ok(outcome)
    }

    /// Drop the current track and move on to the next one.
    pub async fn skip(&mut self) -> MusicResult<SkipOutcome> {
        if !self.is_active() {
            return Err(MusicError::EmptyQueue);
        }

        self.close_session().await;
        let skipped = self.tracks.pop_front().ok_or(MusicError::EmptyQueue)?;
        info!("Skipped '{}' in guild {}", skipped.title(), self.guild_id);

        let now_playing = self.advance().await?;
        self.check_invariants();
        Ok(SkipOutcome {
            skipped,
            now_playing,
        })
    }

    /// Close the session, clear the queue and retire it.
    pub async fn stop(&mut self) -> MusicResult<()> {
        if matches!(self.state, PlaybackState::Idle | PlaybackState::Stopped) {
            return Err(MusicError::EmptyQueue);
        }

        self.close_session().await;
        self.tracks.clear();
        self.state = PlaybackState::Stopped;
        info!("Stopped playback in guild {}", self.guild_id);

        match tokio::time::timeout(self.context.timeout, self.context.player.release(self.guild_id)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to leave voice channel in guild {}: {}", self.guild_id, e),
            Err(_) => warn!("Timed out leaving voice channel in guild {}", self.guild_id),
        }

        self.check_invariants();
        Ok(())
    }

    pub async fn pause(&mut self) -> MusicResult<()> {
        match self.state {
            PlaybackState::Playing => {}
            PlaybackState::Paused => return Err(MusicError::AlreadyPaused),
            PlaybackState::Idle | PlaybackState::Stopped => return Err(MusicError::EmptyQueue),
        }

        let result = match &self.session {
            Some(session) => session.handle.pause().await,
            None => Err(MusicError::SessionError("No live session".to_string())),
        };
        if let Err(e) = result {
            return Err(self.fail(e).await);
        }

        self.state = PlaybackState::Paused;
        info!("Paused playback in guild {}", self.guild_id);
        self.check_invariants();
        Ok(())
    }

    pub async fn resume(&mut self) -> MusicResult<()> {
        match self.state {
            PlaybackState::Paused => {}
            PlaybackState::Playing => return Err(MusicError::NotPaused),
            PlaybackState::Idle | PlaybackState::Stopped => return Err(MusicError::EmptyQueue),
        }

        let result = match &self.session {
            Some(session) => session.handle.resume().await,
            None => Err(MusicError::SessionError("No live session".to_string())),
        };
        if let Err(e) = result {
            return Err(self.fail(e).await);
        }

        self.state = PlaybackState::Playing;
        info!("Resumed playback in guild {}", self.guild_id);
        self.check_invariants();
        Ok(())
    }

    /// Remember the volume for this queue and apply it to the live session, if any.
    pub async fn set_volume(&mut self, volume: u8) -> MusicResult<u8> {
        if self.is_retired() {
            return Err(MusicError::EmptyQueue);
        }

        self.volume = volume;
        let result = match &self.session {
            Some(session) => session.handle.set_volume(volume).await,
            None => Ok(()),
        };
        if let Err(e) = result {
            return Err(self.fail(e).await);
        }

        info!("Volume for guild {} set to {}%", self.guild_id, volume);
        self.check_invariants();
        Ok(volume)
    }

    /// The live session finished on its own.
    pub async fn on_session_ended(&mut self, session_id: SessionId) -> MusicResult<SessionAdvance> {
        if self.session_id() != Some(session_id) {
            debug!(
                "Ignoring end of stale {} in guild {} (live: {:?})",
                session_id,
                self.guild_id,
                self.session_id()
            );
            return Ok(SessionAdvance::Stale);
        }

        // Already over; nothing to stop.
        self.session = None;
        if let Some(finished) = self.tracks.pop_front() {
            info!("Finished '{}' in guild {}", finished.title(), self.guild_id);
        }

        let advance = match self.advance().await? {
            Some(track) => SessionAdvance::Advanced(track),
            None => SessionAdvance::Drained,
        };
        self.check_invariants();
        Ok(advance)
    }

    /// The live session failed; returns whether the event applied.
    pub async fn on_session_error(&mut self, session_id: SessionId, message: &str) -> bool {
        if self.session_id() != Some(session_id) {
            debug!(
                "Ignoring error from stale {} in guild {}: {}",
                session_id, self.guild_id, message
            );
            return false;
        }

        self.fail(MusicError::SessionError(message.to_string())).await;
        true
    }

    /// Finalise a queue that drained by itself so the registry can drop it.
    pub fn retire(&mut self) {
        if self.state == PlaybackState::Idle {
            debug!("Retiring idle queue for guild {}", self.guild_id);
            self.state = PlaybackState::Stopped;
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.state, PlaybackState::Playing | PlaybackState::Paused)
    }

    /// Start whatever is now at the front, or go idle if nothing is left.
    async fn advance(&mut self) -> MusicResult<Option<Track>> {
        match self.tracks.front().cloned() {
            Some(next) => {
                self.play_current().await?;
                Ok(Some(next))
            }
            None => {
                self.state = PlaybackState::Idle;
                info!("Queue for guild {} is now empty", self.guild_id);
                Ok(None)
            }
        }
    }

    /// Open a session for the track at index 0 and announce it.
    async fn play_current(&mut self) -> MusicResult<()> {
        let Some(track) = self.tracks.front().cloned() else {
            self.state = PlaybackState::Idle;
            return Ok(());
        };

        let session_id = SessionId::next();
        let request = SessionRequest {
            guild_id: self.guild_id,
            voice_channel: self.voice_channel,
            track: track.clone(),
            volume: self.volume,
            session_id,
            events: self.context.events.clone(),
        };

        let opened = tokio::time::timeout(self.context.timeout, self.context.player.open(request))
            .await
            .unwrap_or_else(|_| {
                Err(MusicError::SessionError(format!(
                    "Timed out after {} opening a session",
                    humantime::format_duration(self.context.timeout)
                )))
            });

        match opened {
            Ok(handle) => {
                self.session = Some(LiveSession {
                    id: session_id,
                    handle,
                });
                self.state = PlaybackState::Playing;
                info!(
                    "Now playing '{}' in guild {} ({})",
                    track.title(),
                    self.guild_id,
                    session_id
                );
                self.notify(QueueEvent::song_started(&track)).await;
                Ok(())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Stop and forget the live session. Stopping is best effort.
    async fn close_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match tokio::time::timeout(self.context.timeout, session.handle.stop()).await {
            Ok(Ok(())) => debug!("Closed {} in guild {}", session.id, self.guild_id),
            Ok(Err(e)) => warn!("Failed to stop {} in guild {}: {}", session.id, self.guild_id, e),
            Err(_) => warn!("Timed out stopping {} in guild {}", session.id, self.guild_id),
        }
    }

    /// Collaborator failure: close everything, go idle, tell the channel.
    async fn fail(&mut self, cause: MusicError) -> MusicError {
        let error = match cause {
            MusicError::SessionError(_) => cause,
            other => MusicError::SessionError(other.to_string()),
        };
        error!("Session failure in guild {}: {}", self.guild_id, error);

        self.close_session().await;
        self.tracks.clear();
        self.state = PlaybackState::Idle;
        self.notify(QueueEvent::error(&error)).await;

        self.check_invariants();
        error
    }

    async fn notify(&self, event: QueueEvent) {
        let Some(channel) = self.reply_channel else {
            debug!("No reply channel for guild {}, dropping {:?}", self.guild_id, event);
            return;
        };

        match tokio::time::timeout(self.context.timeout, self.context.notifier.notify(channel, &event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to notify channel {}: {}", channel, e),
            Err(_) => warn!("Timed out notifying channel {}", channel),
        }
    }

    fn check_invariants(&self) {
        debug_assert_eq!(self.session.is_some(), self.is_active());
        debug_assert_eq!(!self.tracks.is_empty(), self.is_active());
        debug_assert!((MIN_VOLUME..=MAX_VOLUME).contains(&i64::from(self.volume)));
    }
}

impl fmt::Debug for GuildQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuildQueue")
            .field("guild_id", &self.guild_id)
            .field("tracks", &self.tracks)
            .field("state", &self.state)
            .field("volume", &self.volume)
            .field("session", &self.session_id())
            .field("reply_channel", &self.reply_channel)
            .finish()
    }
}
