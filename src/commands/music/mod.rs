pub(crate) mod pause;
pub(crate) mod play;
pub(crate) mod queue;
pub(crate) mod resume;
pub(crate) mod skip;
pub(crate) mod stop;
pub(crate) mod volume;

pub mod audio_sources;
pub mod utils;

use serenity::all::{ChannelId, GuildId, UserId};
use tracing::{debug, warn};

use crate::{CommandResult, Context, Data, Error};
use utils::dispatcher::{CommandIntent, CommandKind};
use utils::embedded_messages;
use utils::music_manager::MusicError;

/// Every music slash command, in the order they are registered
pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        play::play(),
        skip::skip(),
        stop::stop(),
        queue::queue(),
        pause::pause(),
        resume::resume(),
        volume::volume(),
    ]
}

/// The voice channel the user currently sits in, according to the cache
fn user_voice_channel(ctx: Context<'_>, user_id: UserId) -> Option<ChannelId> {
    let guild = ctx.guild()?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

/// Turn the invocation into an intent, dispatch it and answer the invoker.
async fn run(ctx: Context<'_>, kind: CommandKind) -> CommandResult {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.send(embedded_messages::failure(&kind, &MusicError::NotInGuild))
            .await?;
        return Ok(());
    };

    let invoker_voice_channel = match kind {
        CommandKind::Play { .. } => user_voice_channel(ctx, ctx.author().id),
        _ => None,
    };

    // Resolution can outlast the interaction deadline.
    if matches!(kind, CommandKind::Play { .. }) && invoker_voice_channel.is_some() {
        ctx.defer().await?;
    }

    let intent = CommandIntent {
        kind: kind.clone(),
        guild_id,
        invoker_voice_channel,
        reply_channel: ctx.channel_id(),
    };

    match ctx.data().dispatcher.dispatch(intent).await {
        Ok(ack) => {
            debug!("{} succeeded in guild {}: {:?}", kind.name(), guild_id, ack);
            ctx.send(embedded_messages::acknowledgement(&ack)).await?;
        }
        Err(err) => {
            log_failure(&kind, guild_id, &err);
            ctx.send(embedded_messages::failure(&kind, &err)).await?;
        }
    }

    Ok(())
}

fn log_failure(kind: &CommandKind, guild_id: GuildId, err: &MusicError) {
    match err {
        MusicError::SessionError(_) | MusicError::InvalidTrack(_) => {
            warn!("{} failed in guild {}: {}", kind.name(), guild_id, err)
        }
        _ => debug!("{} rejected in guild {}: {}", kind.name(), guild_id, err),
    }
}
