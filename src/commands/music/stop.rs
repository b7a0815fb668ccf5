use super::*;

/// Stop the music, clear the queue and leave the voice channel
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    run(ctx, CommandKind::Stop).await
}
