use super::*;

/// Show the current music queue
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    run(ctx, CommandKind::Queue).await
}
