use super::*;

/// Skip the currently playing song
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    run(ctx, CommandKind::Skip).await
}
