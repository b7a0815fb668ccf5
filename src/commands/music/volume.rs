use super::*;

/// Set the playback volume
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume percentage (1-100)"] percent: i64,
) -> CommandResult {
    run(ctx, CommandKind::Volume { percent }).await
}
