//! The seam between the queue and whatever actually streams audio.
//!
//! A [`SessionFactory`] opens one [`PlaybackSession`] per track. Sessions report
//! back through a [`SessionEventSender`] rather than calling into the queue, so
//! their events are handled in the same per-guild order as user commands.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::channel::mpsc;
use serenity::all::{ChannelId, GuildId};
use serenity::async_trait;
use tracing::debug;

use super::music_manager::MusicResult;
use crate::commands::music::audio_sources::Track;

/// Identifies one opened session. Events tagged with an id that is no longer the
/// queue's live session are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventKind {
    /// The track finished or was stopped.
    Ended,
    /// The transport gave up on the track.
    Errored(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub guild_id: GuildId,
    pub session_id: SessionId,
    pub kind: SessionEventKind,
}

pub type SessionEventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Cloneable handle sessions use to report back to the registry.
#[derive(Clone, Debug)]
pub struct SessionEventSender(mpsc::UnboundedSender<SessionEvent>);

impl SessionEventSender {
    pub fn channel() -> (Self, SessionEventReceiver) {
        let (sender, receiver) = mpsc::unbounded();
        (Self(sender), receiver)
    }

    pub fn ended(&self, guild_id: GuildId, session_id: SessionId) {
        self.send(SessionEvent {
            guild_id,
            session_id,
            kind: SessionEventKind::Ended,
        });
    }

    pub fn errored(&self, guild_id: GuildId, session_id: SessionId, message: impl Into<String>) {
        self.send(SessionEvent {
            guild_id,
            session_id,
            kind: SessionEventKind::Errored(message.into()),
        });
    }

    fn send(&self, event: SessionEvent) {
        if let Err(e) = self.0.unbounded_send(event) {
            debug!("Dropping session event, registry is gone: {:?}", e.into_inner());
        }
    }
}

/// Everything a [`SessionFactory`] needs to start streaming one track.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub guild_id: GuildId,
    /// Voice channel of the last `/play` invoker.
    pub voice_channel: Option<ChannelId>,
    pub track: Track,
    /// Percent, 1..=100.
    pub volume: u8,
    pub session_id: SessionId,
    pub events: SessionEventSender,
}

/// One live audio stream. Failures surface as `MusicError::SessionError`.
#[async_trait]
pub trait PlaybackSession: Send + Sync {
    async fn pause(&self) -> MusicResult<()>;

    async fn resume(&self) -> MusicResult<()>;

    async fn set_volume(&self, percent: u8) -> MusicResult<()>;

    async fn stop(&self) -> MusicResult<()>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, request: SessionRequest) -> MusicResult<Box<dyn PlaybackSession>>;

    /// Drop the guild's voice connection once its queue is stopped.
    async fn release(&self, guild_id: GuildId) -> MusicResult<()>;
}
