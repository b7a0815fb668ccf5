use super::*;

/// Resume the paused song
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    run(ctx, CommandKind::Resume).await
}
