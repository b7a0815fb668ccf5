use super::*;

/// Pause the current song
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    run(ctx, CommandKind::Pause).await
}
