use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::StreamExt;
use serenity::all::{ChannelId, GuildId};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::notifier::EventNotifier;
use super::queue_manager::{
    EnqueueOutcome, GuildQueue, QueueContext, QueueSnapshot, SessionAdvance, SkipOutcome,
    validate_volume,
};
use super::session::{SessionEvent, SessionEventKind, SessionEventReceiver, SessionEventSender, SessionFactory, SessionId};
use crate::commands::music::audio_sources::Track;

/// Errors that can occur during music operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("User is not in a voice channel")]
    NoVoiceChannel,

    #[error("The queue is empty")]
    EmptyQueue,

    #[error("Volume must be between 1 and 100, got {0}")]
    InvalidVolume(i64),

    #[error("Playback is already paused")]
    AlreadyPaused,

    #[error("Playback is not paused")]
    NotPaused,

    #[error("Could not resolve track: {0}")]
    InvalidTrack(String),

    #[error("Session error: {0}")]
    SessionError(String),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

type SharedQueue = Arc<Mutex<GuildQueue>>;

/// Owns every guild's [`GuildQueue`].
///
/// Each queue sits behind its own async mutex, held for the whole of an
/// operation, so commands and session events for one guild run strictly one
/// after another while different guilds never wait on each other. The map only
/// ever holds the lock of its shard for the lookup itself.
pub struct QueueRegistry {
    queues: DashMap<GuildId, SharedQueue>,
    context: QueueContext,
}

impl QueueRegistry {
    /// Create the registry and spawn the task that feeds session events back in.
    /// Must be called from within a tokio runtime.
    pub fn new(
        player: Arc<dyn SessionFactory>,
        notifier: Arc<dyn EventNotifier>,
        timeout: Duration,
    ) -> Arc<Self> {
        let (events, receiver) = SessionEventSender::channel();
        let registry = Arc::new(Self {
            queues: DashMap::new(),
            context: QueueContext {
                player,
                notifier,
                events,
                timeout,
            },
        });

        tokio::spawn(Self::pump_session_events(
            Arc::downgrade(&registry),
            receiver,
        ));

        registry
    }

    /// Look up a guild's queue without creating one
    pub fn get(&self, guild_id: GuildId) -> Option<SharedQueue> {
        self.queues.get(&guild_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the guild's queue, creating a default one if needed, and whether it
    /// was created by this call.
    pub fn get_or_create(&self, guild_id: GuildId) -> (SharedQueue, bool) {
        match self.queues.entry(guild_id) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                debug!("Creating queue for guild {}", guild_id);
                let queue = Arc::new(Mutex::new(GuildQueue::new(
                    guild_id,
                    self.context.clone(),
                )));
                entry.insert(Arc::clone(&queue));
                (queue, true)
            }
        }
    }

    /// Drop a guild's queue, whatever state it is in
    pub fn remove(&self, guild_id: GuildId) {
        if self.queues.remove(&guild_id).is_some() {
            info!("Removed queue for guild {}", guild_id);
        }
    }

    /// Whether the guild has a live queue
    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.queues.contains_key(&guild_id)
    }

    /// Whether no guild has a queue
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Queue a resolved track, creating the guild's queue on first use.
    pub async fn enqueue(
        &self,
        guild_id: GuildId,
        reply_channel: ChannelId,
        voice_channel: ChannelId,
        track: Track,
    ) -> MusicResult<EnqueueOutcome> {
        loop {
            let (queue, created) = self.get_or_create(guild_id);
            let mut guard = Arc::clone(&queue).lock_owned().await;

            // Stopped while we were waiting; start over with a fresh queue.
            if guard.is_retired() {
                self.remove_if_current(guild_id, &queue);
                continue;
            }

            guard.set_reply_channel(reply_channel);
            guard.set_voice_channel(voice_channel);

            let result = guard.enqueue(track).await;
            // A queue exists only once something was successfully queued.
            if result.is_err() && created && guard.is_empty() {
                guard.retire();
            }
            self.prune(guild_id, &queue, &guard);
            return result;
        }
    }

    /// Skip the current track of a guild
    pub async fn skip(&self, guild_id: GuildId, reply_channel: ChannelId) -> MusicResult<SkipOutcome> {
        let (queue, mut guard) = self.lock_existing(guild_id, reply_channel).await?;
        let result = guard.skip().await;
        self.prune(guild_id, &queue, &guard);
        result
    }

    /// Stop playback and drop the guild's queue
    pub async fn stop(&self, guild_id: GuildId, reply_channel: ChannelId) -> MusicResult<()> {
        let (queue, mut guard) = self.lock_existing(guild_id, reply_channel).await?;
        let result = guard.stop().await;
        self.prune(guild_id, &queue, &guard);
        result
    }

    /// Pause the guild's current track
    pub async fn pause(&self, guild_id: GuildId, reply_channel: ChannelId) -> MusicResult<()> {
        let (queue, mut guard) = self.lock_existing(guild_id, reply_channel).await?;
        let result = guard.pause().await;
        self.prune(guild_id, &queue, &guard);
        result
    }

    /// Resume the guild's paused track
    pub async fn resume(&self, guild_id: GuildId, reply_channel: ChannelId) -> MusicResult<()> {
        let (queue, mut guard) = self.lock_existing(guild_id, reply_channel).await?;
        let result = guard.resume().await;
        self.prune(guild_id, &queue, &guard);
        result
    }

    /// The range check happens before the queue is even looked up.
    pub async fn set_volume(
        &self,
        guild_id: GuildId,
        reply_channel: ChannelId,
        percent: i64,
    ) -> MusicResult<u8> {
        let volume = validate_volume(percent)?;
        let (queue, mut guard) = self.lock_existing(guild_id, reply_channel).await?;
        let result = guard.set_volume(volume).await;
        self.prune(guild_id, &queue, &guard);
        result
    }

    /// Copy of the guild's queue for display
    pub async fn snapshot(&self, guild_id: GuildId, reply_channel: ChannelId) -> MusicResult<QueueSnapshot> {
        let (_, guard) = self.lock_existing(guild_id, reply_channel).await?;
        Ok(guard.snapshot())
    }

    /// Advance past a session that ended by itself. A queue that runs dry this way
    /// is retired.
    pub async fn on_session_ended(
        &self,
        guild_id: GuildId,
        session_id: SessionId,
    ) -> MusicResult<SessionAdvance> {
        let Some((queue, mut guard)) = self.lock_for_event(guild_id).await else {
            debug!("Session {} ended for guild {} with no queue", session_id, guild_id);
            return Ok(SessionAdvance::Stale);
        };

        let result = guard.on_session_ended(session_id).await;
        if result == Ok(SessionAdvance::Drained) {
            guard.retire();
        }
        self.prune(guild_id, &queue, &guard);
        result
    }

    /// Fail the queue if the errored session is still the live one
    pub async fn on_session_error(&self, guild_id: GuildId, session_id: SessionId, message: &str) -> bool {
        let Some((queue, mut guard)) = self.lock_for_event(guild_id).await else {
            debug!("Session {} failed for guild {} with no queue: {}", session_id, guild_id, message);
            return false;
        };

        let applied = guard.on_session_error(session_id, message).await;
        self.prune(guild_id, &queue, &guard);
        applied
    }

    /// Route a session event to the matching handler
    pub async fn handle_session_event(&self, event: SessionEvent) {
        let SessionEvent {
            guild_id,
            session_id,
            kind,
        } = event;

        match kind {
            SessionEventKind::Ended => {
                if let Err(e) = self.on_session_ended(guild_id, session_id).await {
                    warn!("Could not advance queue for guild {}: {}", guild_id, e);
                }
            }
            SessionEventKind::Errored(message) => {
                self.on_session_error(guild_id, session_id, &message).await;
            }
        }
    }

    async fn pump_session_events(registry: Weak<Self>, mut receiver: SessionEventReceiver) {
        while let Some(event) = receiver.next().await {
            let Some(registry) = registry.upgrade() else {
                break;
            };
            // Per-guild ordering comes from the queue mutex; other guilds must not wait.
            tokio::spawn(async move { registry.handle_session_event(event).await });
        }
        debug!("Session event pump finished");
    }

    async fn lock_existing(
        &self,
        guild_id: GuildId,
        reply_channel: ChannelId,
    ) -> MusicResult<(SharedQueue, OwnedMutexGuard<GuildQueue>)> {
        let (queue, mut guard) = self
            .lock_for_event(guild_id)
            .await
            .ok_or(MusicError::EmptyQueue)?;
        guard.set_reply_channel(reply_channel);
        Ok((queue, guard))
    }

    async fn lock_for_event(&self, guild_id: GuildId) -> Option<(SharedQueue, OwnedMutexGuard<GuildQueue>)> {
        let queue = self.get(guild_id)?;
        let guard = Arc::clone(&queue).lock_owned().await;
        if guard.is_retired() {
            return None;
        }
        Some((queue, guard))
    }

    fn prune(&self, guild_id: GuildId, queue: &SharedQueue, guard: &GuildQueue) {
        if guard.is_retired() {
            self.remove_if_current(guild_id, queue);
        }
    }

    /// Remove the entry only if it still points at `queue`; a replacement may already
    /// have been created.
    fn remove_if_current(&self, guild_id: GuildId, queue: &SharedQueue) {
        if self
            .queues
            .remove_if(&guild_id, |_, current| Arc::ptr_eq(current, queue))
            .is_some()
        {
            info!("Removed queue for guild {}", guild_id);
        }
    }
}
